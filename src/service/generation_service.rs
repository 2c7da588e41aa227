//! Generation service: intake, scheduling, regeneration, approval, export.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::RwLockWriteGuard;

use super::batch::{BatchHandle, BatchOutcome};
use super::status::StatusReport;
use crate::domain::{
    ArchiveEntry, AssetRef, Card, CardState, EventBus, ExportMarker, GenerationEvent,
    GenerationIntake, GenerationRecord, GenerationRegistry, ProjectData, ProjectId,
    ProjectRegistry, RecordHandle, RequestId,
};
use crate::error::SpawnerError;
use crate::export::{Artifact, ArtifactBuilder, ExportCard, ZipArtifactBuilder, select_approved};
use crate::provider::{
    ImageData, ImageProvider, ProviderCredential, ProviderRequest, build_generation_prompt,
};
use crate::storage::RecordStore;

/// Detail recorded on cards found in flight at startup.
pub const INTERRUPTED_DETAIL: &str = "interrupted by service restart";

/// Engine-wide knobs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Provider calls in flight per batch (K).
    pub concurrency: usize,
    /// Style directive appended to every card prompt.
    pub style_prompt: String,
    /// Credential used when the caller and the request supply none.
    pub default_credential: Option<ProviderCredential>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            style_prompt: String::new(),
            default_credential: None,
        }
    }
}

/// Result of an accepted submission.
#[derive(Debug)]
pub struct Submission {
    /// New request identifier.
    pub request_id: RequestId,
    /// Cards as created, all `pending`.
    pub cards: Vec<Card>,
    /// Background batch generating the cards.
    pub batch: BatchHandle,
}

/// Result of an accepted sheet regeneration.
#[derive(Debug)]
pub struct SheetRegeneration {
    /// Regenerated request (same id as before).
    pub request_id: RequestId,
    /// Archive depth after the push.
    pub archive_len: usize,
    /// Cards as queued, all `regenerating`.
    pub cards: Vec<Card>,
    /// Background batch regenerating the cards.
    pub batch: BatchHandle,
}

/// What [`GenerationService::restore`] found on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Records loaded.
    pub records: usize,
    /// Projects loaded.
    pub projects: usize,
    /// Cards moved to `error` because their call was lost.
    pub interrupted: usize,
}

/// Everything a provider call needs, captured under the record lock.
#[derive(Debug)]
struct CardCall {
    request_id: RequestId,
    index: u32,
    target_version: u32,
    prompt: String,
    references: Vec<String>,
    request: ProviderRequest,
}

/// Orchestration layer for all generation operations.
///
/// Owns the registries, the record store, the provider and the event bus.
/// Every mutation follows the pattern: acquire the record's write lock →
/// apply to a clone → persist → commit → emit events. No lock is held
/// across a provider call.
#[derive(Debug, Clone)]
pub struct GenerationService {
    registry: Arc<GenerationRegistry>,
    projects: Arc<ProjectRegistry>,
    store: RecordStore,
    provider: Arc<dyn ImageProvider>,
    builder: Arc<dyn ArtifactBuilder>,
    event_bus: EventBus,
    settings: Arc<EngineSettings>,
}

impl GenerationService {
    /// Creates a service exporting ZIP artifacts.
    #[must_use]
    pub fn new(
        store: RecordStore,
        provider: Arc<dyn ImageProvider>,
        event_bus: EventBus,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry: Arc::new(GenerationRegistry::new()),
            projects: Arc::new(ProjectRegistry::new()),
            store,
            provider,
            builder: Arc::new(ZipArtifactBuilder),
            event_bus,
            settings: Arc::new(settings),
        }
    }

    /// Replaces the artifact builder.
    #[must_use]
    pub fn with_artifact_builder(mut self, builder: Arc<dyn ArtifactBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the record store.
    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Loads projects and sidecars from the store.
    ///
    /// Cards left in flight by a previous process are moved to `error`
    /// and persisted.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] if the store cannot be listed.
    pub async fn restore(&self) -> Result<RestoreSummary, SpawnerError> {
        let mut summary = RestoreSummary::default();
        for project in self.store.load_projects().await? {
            self.projects.insert(project).await;
            summary.projects += 1;
        }

        for record in self.store.load_records().await? {
            let request_id = record.id();
            let mut recovered = record.clone();
            let interrupted = recovered
                .cards_mut()
                .map(|card| card.abandon(INTERRUPTED_DETAIL))
                .filter(|abandoned| *abandoned)
                .count();
            let record = if interrupted == 0 {
                record
            } else {
                recovered.touch();
                match self.store.write_record(&recovered).await {
                    Ok(()) => {
                        summary.interrupted += interrupted;
                        tracing::warn!(%request_id, interrupted, "marked interrupted cards as failed");
                        recovered
                    }
                    Err(e) => {
                        tracing::error!(%request_id, error = %e, "failed to persist interrupted cards");
                        record
                    }
                }
            };
            if let Err(e) = self.registry.insert(record).await {
                tracing::warn!(%request_id, error = %e, "skipping duplicate sidecar");
                continue;
            }
            summary.records += 1;
        }

        tracing::info!(
            records = summary.records,
            projects = summary.projects,
            interrupted = summary.interrupted,
            "restored state from record store"
        );
        Ok(summary)
    }

    // ---- intake ----

    /// Validates a submission, creates its cards and dispatches them.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] for malformed intake,
    /// [`SpawnerError::ProjectNotFound`] for an unknown project and
    /// [`SpawnerError::Storage`] if the sidecar or the project cannot be
    /// written. Nothing is created in any of these cases.
    pub async fn submit(
        &self,
        intake: GenerationIntake,
        credential: Option<ProviderCredential>,
    ) -> Result<Submission, SpawnerError> {
        let project = match intake.project_id {
            Some(project_id) => Some(self.projects.get(project_id).await?),
            None => None,
        };

        let mut existing = HashSet::new();
        for name in intake.reference_names() {
            if self.store.has_reference(&name).await {
                existing.insert(name);
            }
        }
        let mut request = intake.validate(|name| existing.contains(name))?;
        request.credential = credential;
        let mut record = GenerationRecord::new(request);
        record.touch();
        let request_id = record.id();
        let project_id = record.request.project_id;

        // The project stays locked until both files are written, so a
        // failed project write can still take the sidecar back.
        let mut project_guard = match &project {
            Some(project) => Some(project.write().await),
            None => None,
        };
        self.store.write_record(&record).await?;
        if let Some(guard) = project_guard.as_mut() {
            let mut next = (**guard).clone();
            next.current = Some(request_id);
            if let Err(e) = self.store.write_project(&next).await {
                if let Err(cleanup) = self.store.remove_record(request_id).await {
                    tracing::error!(%request_id, error = %cleanup, "failed to remove orphaned sidecar");
                }
                return Err(e);
            }
            **guard = next;
        }
        self.registry.insert(record.clone()).await?;
        drop(project_guard);

        let _ = self.event_bus.publish(GenerationEvent::GenerationSubmitted {
            request_id,
            project_id,
            card_count: record.cards().len(),
            timestamp: Utc::now(),
        });
        tracing::info!(%request_id, cards = record.cards().len(), "generation submitted");

        let indices: Vec<u32> = record.cards().iter().map(Card::index).collect();
        let credential = self.resolve_credential(None, &record);
        let batch = self.spawn_batch(request_id, indices, true, credential);

        Ok(Submission {
            request_id,
            cards: record.cards().to_vec(),
            batch,
        })
    }

    // ---- regeneration ----

    /// Regenerates one card, optionally with a replacement prompt.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::RequestNotFound`] or
    /// [`SpawnerError::CardNotFound`] for unknown targets,
    /// [`SpawnerError::InvalidState`] unless the card is `ready` or `error`,
    /// and [`SpawnerError::Storage`] if the sidecar cannot be written.
    pub async fn regenerate_card(
        &self,
        request_id: RequestId,
        index: u32,
        prompt: Option<String>,
        credential: Option<ProviderCredential>,
    ) -> Result<(Card, BatchHandle), SpawnerError> {
        let handle = self.registry.get(request_id).await?;
        let (card, credential) = self
            .mutate_record(&handle, |record| {
                let credential = self.resolve_credential(credential, record);
                let card = record.card_mut(index)?;
                card.begin_regeneration(prompt)?;
                Ok((card.clone(), credential))
            })
            .await?;

        self.publish_card(request_id, &card);
        tracing::info!(%request_id, index, version = card.version(), "card regeneration queued");

        let batch = self.spawn_batch(request_id, vec![index], false, credential);
        Ok((card, batch))
    }

    /// Archives a project's current generation and regenerates every card.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::ProjectNotFound`] or
    /// [`SpawnerError::NoCurrentGeneration`] for unknown targets,
    /// [`SpawnerError::InvalidState`] while any card is still in flight and
    /// [`SpawnerError::Storage`] if the project or sidecar cannot be
    /// written.
    pub async fn regenerate_sheet(
        &self,
        project_id: ProjectId,
        credential: Option<ProviderCredential>,
    ) -> Result<SheetRegeneration, SpawnerError> {
        let project = self.projects.get(project_id).await?;
        let request_id = project
            .read()
            .await
            .current
            .ok_or(SpawnerError::NoCurrentGeneration(project_id))?;
        let handle = self.registry.get(request_id).await?;

        // Lock order: record, then project.
        let mut record = handle.write().await;
        let mut project_guard = project.write().await;
        if project_guard.current != Some(request_id) {
            return Err(SpawnerError::InvalidState(format!(
                "current generation of project {project_id} changed"
            )));
        }
        if let Some(card) = record.cards().iter().find(|c| c.state().is_active()) {
            return Err(SpawnerError::InvalidState(format!(
                "cannot regenerate sheet while card {} is {}",
                card.index(),
                card.state().as_str()
            )));
        }

        let mut next = record.clone();
        for card in next.cards_mut() {
            card.begin_regeneration(None)?;
        }
        next.touch();
        let credential = self.resolve_credential(credential, &next);

        // Record first: a failed sidecar write leaves the archive untouched.
        self.store.write_record(&next).await?;
        let mut next_project = project_guard.clone();
        next_project.push_archive(ArchiveEntry::capture(&record));
        if let Err(e) = self.store.write_project(&next_project).await {
            if let Err(revert) = self.store.write_record(&record).await {
                tracing::error!(%request_id, error = %revert, "failed to restore sidecar");
            }
            return Err(e);
        }
        let archive_len = next_project.archive().len();
        *project_guard = next_project;
        drop(project_guard);
        *record = next;
        let cards = record.cards().to_vec();
        drop(record);

        let _ = self.event_bus.publish(GenerationEvent::SheetArchived {
            request_id,
            project_id,
            archive_len,
            timestamp: Utc::now(),
        });
        tracing::info!(%request_id, %project_id, archive_len, "sheet archived");

        for card in &cards {
            self.publish_card(request_id, card);
        }
        let indices: Vec<u32> = cards.iter().map(Card::index).collect();
        let batch = self.spawn_batch(request_id, indices, false, credential);

        Ok(SheetRegeneration {
            request_id,
            archive_len,
            cards,
            batch,
        })
    }

    // ---- approval ----

    /// Approves a `ready` card. Approving twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::InvalidState`] unless the card is `ready`,
    /// not-found errors for unknown targets and [`SpawnerError::Storage`]
    /// if the sidecar cannot be written.
    pub async fn approve(&self, request_id: RequestId, index: u32) -> Result<Card, SpawnerError> {
        let handle = self.registry.get(request_id).await?;
        let mut record = handle.write().await;
        let mut next = record.clone();
        let card = next.card_mut(index)?;
        if !card.approve()? {
            return Ok(card.clone());
        }
        let card = card.clone();
        self.persist(&mut record, next).await?;
        drop(record);

        let _ = self.event_bus.publish(GenerationEvent::CardApproved {
            request_id,
            index,
            version: card.version(),
            timestamp: Utc::now(),
        });
        tracing::info!(%request_id, index, version = card.version(), "card approved");
        Ok(card)
    }

    // ---- status ----

    /// Builds one consistent snapshot of every generation.
    pub async fn status(&self) -> StatusReport {
        let handles = self.registry.handles().await;
        let mut guards = Vec::with_capacity(handles.len());
        for (_, handle) in &handles {
            guards.push(handle.read().await);
        }
        StatusReport::from_records(guards.iter().map(|g| &**g))
    }

    /// Returns a copy of one record.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::RequestNotFound`] for an unknown id.
    pub async fn get_record(&self, request_id: RequestId) -> Result<GenerationRecord, SpawnerError> {
        let handle = self.registry.get(request_id).await?;
        let record = handle.read().await.clone();
        Ok(record)
    }

    /// Reads the current image of a card.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for unknown targets or a card without an
    /// image.
    pub async fn card_image(
        &self,
        request_id: RequestId,
        index: u32,
    ) -> Result<(Vec<u8>, &'static str), SpawnerError> {
        let handle = self.registry.get(request_id).await?;
        let asset = {
            let record = handle.read().await;
            record.card(index)?.asset().cloned().ok_or_else(|| {
                SpawnerError::AssetNotFound(format!("card {index} of {request_id} has no image"))
            })?
        };
        self.store.read_asset(&asset).await
    }

    /// Reads any stored asset by relative path.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] for a malformed path and
    /// [`SpawnerError::AssetNotFound`] if nothing is stored there.
    pub async fn read_asset(&self, path: &str) -> Result<(Vec<u8>, &'static str), SpawnerError> {
        let asset = AssetRef::parse(path)?;
        self.store.read_asset(&asset).await
    }

    // ---- export ----

    /// Assembles approved cards into an artifact and records the export.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Precondition`] if no card is approved,
    /// [`SpawnerError::RequestNotFound`] for an unknown id and
    /// [`SpawnerError::Storage`] on store failures.
    pub async fn export(&self, request_id: RequestId) -> Result<Artifact, SpawnerError> {
        let handle = self.registry.get(request_id).await?;
        let (request, cards) = {
            let record = handle.read().await;
            let mut cards = Vec::new();
            for (card, asset) in select_approved(&record)? {
                let (bytes, _) = self.store.read_asset(asset).await?;
                cards.push(ExportCard {
                    index: card.index(),
                    version: card.version(),
                    prompt: card.prompt().to_string(),
                    asset: asset.clone(),
                    bytes,
                });
            }
            (record.request.clone(), cards)
        };

        let bytes = self.builder.build(&request, &cards)?;
        let file_name = format!("{request_id}.{}", self.builder.extension());
        let asset = self.store.write_export(&file_name, &bytes).await?;
        let card_indices: Vec<u32> = cards.iter().map(|c| c.index).collect();

        if let Some(project_id) = request.project_id {
            let project = self.projects.get(project_id).await?;
            let mut guard = project.write().await;
            let mut next = guard.clone();
            next.export = Some(ExportMarker {
                request_id,
                card_indices: card_indices.clone(),
                file_name: file_name.clone(),
                exported_at: Utc::now(),
            });
            self.store.write_project(&next).await?;
            *guard = next;
        }

        let _ = self.event_bus.publish(GenerationEvent::ArtifactExported {
            request_id,
            card_indices: card_indices.clone(),
            file_name: file_name.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(%request_id, cards = ?card_indices, %asset, "artifact exported");

        Ok(Artifact {
            request_id,
            file_name,
            content_type: self.builder.content_type(),
            card_indices,
            asset,
            bytes,
        })
    }

    // ---- projects & references ----

    /// Creates an empty project.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] for a blank name and
    /// [`SpawnerError::Storage`] if it cannot be written.
    pub async fn create_project(&self, name: &str) -> Result<ProjectData, SpawnerError> {
        let project = ProjectData::new(name)?;
        self.store.write_project(&project).await?;
        self.projects.insert(project.clone()).await;
        tracing::info!(project_id = %project.project_id, name = %project.name, "project created");
        Ok(project)
    }

    /// Returns a copy of a project.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::ProjectNotFound`] for an unknown id.
    pub async fn get_project(&self, project_id: ProjectId) -> Result<ProjectData, SpawnerError> {
        let project = self.projects.get(project_id).await?;
        let data = project.read().await.clone();
        Ok(data)
    }

    /// Returns up to `limit` archive entries starting at `offset` (newest
    /// first) and the archive depth.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::ProjectNotFound`] for an unknown id.
    pub async fn archive(
        &self,
        project_id: ProjectId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ArchiveEntry>, usize), SpawnerError> {
        let project = self.projects.get(project_id).await?;
        let guard = project.read().await;
        let archive = guard.archive();
        let page = archive.iter().skip(offset).take(limit).cloned().collect();
        Ok((page, archive.len()))
    }

    /// Returns one archive entry (0 = newest).
    ///
    /// # Errors
    ///
    /// Returns not-found errors for an unknown project or position.
    pub async fn archive_entry(
        &self,
        project_id: ProjectId,
        position: usize,
    ) -> Result<ArchiveEntry, SpawnerError> {
        let project = self.projects.get(project_id).await?;
        let guard = project.read().await;
        guard.archive_entry(position).cloned()
    }

    /// Stores an uploaded reference image and returns its name.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] for empty or non-image uploads.
    pub async fn store_reference(&self, bytes: &[u8], mime_type: &str) -> Result<String, SpawnerError> {
        let name = self.store.put_reference(bytes, mime_type).await?;
        tracing::info!(%name, size = bytes.len(), "reference stored");
        Ok(name)
    }

    // ---- private helpers ----

    /// Explicit credential, else the request's submit-time one, else the
    /// configured default.
    fn resolve_credential(
        &self,
        explicit: Option<ProviderCredential>,
        record: &GenerationRecord,
    ) -> Option<ProviderCredential> {
        explicit
            .or_else(|| record.request.credential.clone())
            .or_else(|| self.settings.default_credential.clone())
    }

    /// Writes `next` to the store, then commits it under the held lock.
    async fn persist(
        &self,
        guard: &mut RwLockWriteGuard<'_, GenerationRecord>,
        mut next: GenerationRecord,
    ) -> Result<(), SpawnerError> {
        next.touch();
        self.store.write_record(&next).await?;
        **guard = next;
        Ok(())
    }

    /// Read-clone-modify-persist-commit under the record's write lock.
    async fn mutate_record<T, F>(&self, handle: &RecordHandle, apply: F) -> Result<T, SpawnerError>
    where
        F: FnOnce(&mut GenerationRecord) -> Result<T, SpawnerError>,
    {
        let mut guard = handle.write().await;
        let mut next = guard.clone();
        let out = apply(&mut next)?;
        self.persist(&mut guard, next).await?;
        Ok(out)
    }

    fn publish_card(&self, request_id: RequestId, card: &Card) {
        let _ = self.event_bus.publish(GenerationEvent::CardStateChanged {
            request_id,
            index: card.index(),
            state: card.state(),
            version: card.version(),
            error: card.error().map(str::to_string),
            timestamp: Utc::now(),
        });
    }

    /// Runs `indices` through the provider, at most K at a time.
    fn spawn_batch(
        &self,
        request_id: RequestId,
        indices: Vec<u32>,
        initial: bool,
        credential: Option<ProviderCredential>,
    ) -> BatchHandle {
        let service = self.clone();
        let limit = self.settings.concurrency.max(1);
        let task = tokio::spawn(async move {
            let results: Vec<bool> = futures_util::stream::iter(indices)
                .map(|index| {
                    let service = service.clone();
                    let credential = credential.clone();
                    async move { service.run_card(request_id, index, initial, credential).await }
                })
                .buffer_unordered(limit)
                .collect()
                .await;
            let ready = results.iter().filter(|ok| **ok).count();
            BatchOutcome {
                ready,
                failed: results.len().saturating_sub(ready),
            }
        });
        BatchHandle::new(request_id, task)
    }

    /// Drives one card through one provider call. Returns `true` if the
    /// card ended `ready`.
    async fn run_card(
        &self,
        request_id: RequestId,
        index: u32,
        initial: bool,
        credential: Option<ProviderCredential>,
    ) -> bool {
        let handle = match self.registry.get(request_id).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(%request_id, index, error = %e, "generation vanished before dispatch");
                return false;
            }
        };

        let call = if initial {
            self.mutate_record(&handle, |record| {
                let card = record.card_mut(index)?;
                card.begin_generation()?;
                let card = card.clone();
                self.card_call(record, index, credential).map(|call| (call, Some(card)))
            })
            .await
        } else {
            let record = handle.read().await;
            self.card_call(&record, index, credential).map(|call| (call, None))
        };
        let call = match call {
            Ok((call, started)) => {
                if let Some(card) = started {
                    self.publish_card(request_id, &card);
                }
                call
            }
            Err(e) => {
                tracing::error!(%request_id, index, error = %e, "failed to start card");
                return false;
            }
        };

        let outcome = self.call_provider(&call).await;
        let result = self
            .mutate_record(&handle, move |record| {
                let card = record.card_mut(index)?;
                match outcome {
                    Ok((asset, text)) => card.complete(asset, text)?,
                    Err(detail) => card.fail(detail)?,
                }
                Ok(card.clone())
            })
            .await;

        match result {
            Ok(card) => {
                self.publish_card(request_id, &card);
                if card.state() == CardState::Ready {
                    tracing::info!(%request_id, index, version = card.version(), "card ready");
                    true
                } else {
                    false
                }
            }
            Err(e) => {
                tracing::error!(%request_id, index, error = %e, "failed to record card result");
                false
            }
        }
    }

    fn card_call(
        &self,
        record: &GenerationRecord,
        index: u32,
        credential: Option<ProviderCredential>,
    ) -> Result<CardCall, SpawnerError> {
        let card = record.card(index)?;
        let mut references = record.request.references.clone();
        if let Some(own) = card.reference() {
            references.push(own.to_string());
        }
        Ok(CardCall {
            request_id: record.id(),
            index,
            target_version: card.target_version(),
            prompt: card.prompt().to_string(),
            references,
            request: ProviderRequest {
                prompt: build_generation_prompt(
                    index,
                    card.prompt(),
                    card.kind(),
                    &self.settings.style_prompt,
                ),
                aspect_ratio: record.request.aspect_ratio,
                resolution: record.request.resolution,
                credential,
                references: Vec::new(),
            },
        })
    }

    /// Calls the provider and stores the image. `Err` carries the detail
    /// recorded on the card.
    async fn call_provider(&self, call: &CardCall) -> Result<(AssetRef, Vec<String>), String> {
        let mut request = call.request.clone();
        for name in &call.references {
            let (bytes, mime_type) = self
                .store
                .read_reference(name)
                .await
                .map_err(|e| e.to_string())?;
            request.references.push(ImageData {
                bytes,
                mime_type: mime_type.to_string(),
            });
        }

        let output = self.provider.generate(&request).await.map_err(|e| {
            tracing::warn!(
                request_id = %call.request_id,
                index = call.index,
                version = call.target_version,
                prompt = %call.prompt,
                error = %e,
                "provider call failed"
            );
            SpawnerError::from(e).to_string()
        })?;

        let asset = self
            .store
            .put(
                call.request_id,
                call.index,
                call.target_version,
                &output.image.bytes,
                &output.image.mime_type,
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok((asset, output.text))
    }
}
