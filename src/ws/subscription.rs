//! Per-connection event filter.
//!
//! A client follows generations directly by request id, everything through
//! the `"*"` wildcard, or whole projects. A project subscription follows
//! the project's current generation plus every generation later submitted
//! into it, so card events (which carry no project id) still get through.

use std::collections::{HashMap, HashSet};

use crate::domain::{GenerationEvent, ProjectId, RequestId};

/// Parsed subscribe/unsubscribe targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topics {
    /// The `"*"` wildcard was given.
    pub all: bool,
    /// Generations named directly.
    pub requests: Vec<RequestId>,
    /// Projects named.
    pub projects: Vec<ProjectId>,
}

impl Topics {
    /// Parses client-supplied ids. Unparseable ids are ignored.
    #[must_use]
    pub fn parse(request_ids: &[String], project_ids: &[String]) -> Self {
        let mut topics = Self::default();
        for raw in request_ids {
            if raw == "*" {
                topics.all = true;
            } else if let Ok(uuid) = raw.parse::<uuid::Uuid>() {
                topics.requests.push(RequestId::from_uuid(uuid));
            }
        }
        topics.projects = project_ids
            .iter()
            .filter_map(|raw| raw.parse::<uuid::Uuid>().ok())
            .map(ProjectId::from_uuid)
            .collect();
        topics
    }
}

/// Event filter of a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    all: bool,
    requests: HashSet<RequestId>,
    projects: HashSet<ProjectId>,
    /// Generations admitted through a project subscription.
    followed: HashMap<RequestId, ProjectId>,
}

impl SubscriptionManager {
    /// Creates a filter that admits nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the given topics.
    pub fn subscribe(&mut self, topics: &Topics) {
        self.all |= topics.all;
        self.requests.extend(topics.requests.iter().copied());
        self.projects.extend(topics.projects.iter().copied());
    }

    /// Removes the given topics. Dropping a project also drops the
    /// generations followed through it.
    pub fn unsubscribe(&mut self, topics: &Topics) {
        if topics.all {
            self.all = false;
        }
        for id in &topics.requests {
            self.requests.remove(id);
        }
        for id in &topics.projects {
            self.projects.remove(id);
        }
        let projects = &self.projects;
        self.followed.retain(|_, project_id| projects.contains(project_id));
    }

    /// Follows `request_id` on behalf of a subscribed project.
    pub fn follow(&mut self, project_id: ProjectId, request_id: RequestId) {
        if self.projects.contains(&project_id) {
            self.followed.insert(request_id, project_id);
        }
    }

    /// Returns `true` if the event should be forwarded. A submission into
    /// a subscribed project starts following that generation.
    pub fn admit(&mut self, event: &GenerationEvent) -> bool {
        let request_id = event.request_id();
        if let GenerationEvent::GenerationSubmitted {
            project_id: Some(project_id),
            ..
        } = event
        {
            self.follow(*project_id, request_id);
        }
        self.all
            || self.requests.contains(&request_id)
            || self.followed.contains_key(&request_id)
            || event
                .project_id()
                .is_some_and(|project_id| self.projects.contains(&project_id))
    }

    /// Number of generations subscribed by id.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Number of subscribed projects.
    #[must_use]
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub const fn is_subscribed_all(&self) -> bool {
        self.all
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::CardState;

    fn card_event(request_id: RequestId) -> GenerationEvent {
        GenerationEvent::CardStateChanged {
            request_id,
            index: 0,
            state: CardState::Ready,
            version: 1,
            error: None,
            timestamp: Utc::now(),
        }
    }

    fn submitted(request_id: RequestId, project_id: Option<ProjectId>) -> GenerationEvent {
        GenerationEvent::GenerationSubmitted {
            request_id,
            project_id,
            card_count: 1,
            timestamp: Utc::now(),
        }
    }

    fn projects(ids: &[ProjectId]) -> Topics {
        Topics {
            projects: ids.to_vec(),
            ..Topics::default()
        }
    }

    #[test]
    fn parse_splits_wildcard_requests_and_projects() {
        let request = RequestId::new();
        let project = ProjectId::new();
        let topics = Topics::parse(
            &["*".to_string(), request.to_string(), "nope".to_string()],
            &[project.to_string(), "*".to_string()],
        );
        assert!(topics.all);
        assert_eq!(topics.requests, vec![request]);
        assert_eq!(topics.projects, vec![project]);
    }

    #[test]
    fn empty_filter_admits_nothing() {
        let mut mgr = SubscriptionManager::new();
        assert!(!mgr.admit(&card_event(RequestId::new())));
        assert!(!mgr.admit(&submitted(RequestId::new(), Some(ProjectId::new()))));
    }

    #[test]
    fn request_and_wildcard_subscriptions() {
        let mut mgr = SubscriptionManager::new();
        let id = RequestId::new();
        mgr.subscribe(&Topics {
            requests: vec![id],
            ..Topics::default()
        });
        assert!(mgr.admit(&card_event(id)));
        assert!(!mgr.admit(&card_event(RequestId::new())));
        assert_eq!(mgr.request_count(), 1);

        mgr.subscribe(&Topics {
            all: true,
            ..Topics::default()
        });
        assert!(mgr.admit(&card_event(RequestId::new())));

        mgr.unsubscribe(&Topics {
            all: true,
            requests: vec![id],
            projects: vec![],
        });
        assert!(!mgr.is_subscribed_all());
        assert!(!mgr.admit(&card_event(id)));
    }

    #[test]
    fn project_subscription_follows_submitted_generations() {
        let mut mgr = SubscriptionManager::new();
        let project = ProjectId::new();
        let elsewhere = ProjectId::new();
        mgr.subscribe(&projects(&[project]));

        let ours = RequestId::new();
        let theirs = RequestId::new();
        assert!(!mgr.admit(&card_event(ours)));
        assert!(mgr.admit(&submitted(ours, Some(project))));
        assert!(mgr.admit(&card_event(ours)));

        assert!(!mgr.admit(&submitted(theirs, Some(elsewhere))));
        assert!(!mgr.admit(&card_event(theirs)));
        assert!(!mgr.admit(&submitted(RequestId::new(), None)));
    }

    #[test]
    fn follow_needs_a_subscribed_project() {
        let mut mgr = SubscriptionManager::new();
        let project = ProjectId::new();
        let current = RequestId::new();
        mgr.follow(project, current);
        assert!(!mgr.admit(&card_event(current)));

        mgr.subscribe(&projects(&[project]));
        mgr.follow(project, current);
        assert!(mgr.admit(&card_event(current)));
        assert!(mgr.admit(&GenerationEvent::SheetArchived {
            request_id: RequestId::new(),
            project_id: project,
            archive_len: 1,
            timestamp: Utc::now(),
        }));
    }

    #[test]
    fn unsubscribing_a_project_drops_its_generations() {
        let mut mgr = SubscriptionManager::new();
        let kept = ProjectId::new();
        let dropped = ProjectId::new();
        mgr.subscribe(&projects(&[kept, dropped]));
        let kept_request = RequestId::new();
        let dropped_request = RequestId::new();
        mgr.follow(kept, kept_request);
        mgr.follow(dropped, dropped_request);

        mgr.unsubscribe(&projects(&[dropped]));
        assert_eq!(mgr.project_count(), 1);
        assert!(mgr.admit(&card_event(kept_request)));
        assert!(!mgr.admit(&card_event(dropped_request)));
    }
}
