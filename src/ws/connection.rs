//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::{SubscriptionManager, Topics};
use crate::api::dto::{GenerationDto, StatusResponse};
use crate::domain::{GenerationEvent, RequestId};
use crate::service::{GenerationService, GenerationSummary};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<GenerationEvent>,
    service: Arc<GenerationService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();
    tracing::debug!("ws connection opened");

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs, &service).await;
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if !subs.admit(&event) {
                            continue;
                        }
                        let Ok(payload) = serde_json::to_value(&event) else {
                            continue;
                        };
                        let msg = WsMessage::server(WsMessageType::Event, payload);
                        let json = serde_json::to_string(&msg).unwrap_or_default();
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

fn ids_json<T: ToString>(ids: &[T]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

/// Handles a text message from the client, returning an optional JSON response.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    service: &GenerationService,
) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error(String::new(), 400, "malformed JSON")).ok();
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
    };

    let response = match command {
        WsCommand::Subscribe {
            request_ids,
            project_ids,
        } => {
            let topics = Topics::parse(&request_ids, &project_ids);
            subs.subscribe(&topics);
            for &project_id in &topics.projects {
                if let Ok(project) = service.get_project(project_id).await
                    && let Some(current) = project.current
                {
                    subs.follow(project_id, current);
                }
            }
            WsMessage::reply(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": ids_json(&topics.requests),
                    "projects": ids_json(&topics.projects),
                    "count": subs.request_count(),
                    "project_count": subs.project_count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::Unsubscribe {
            request_ids,
            project_ids,
        } => {
            let topics = Topics::parse(&request_ids, &project_ids);
            subs.unsubscribe(&topics);
            WsMessage::reply(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": ids_json(&topics.requests),
                    "projects": ids_json(&topics.projects),
                    "remaining_count": subs.request_count(),
                    "project_count": subs.project_count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::GetStatus { request_id: None } => {
            let status = StatusResponse::from(service.status().await);
            match serde_json::to_value(&status) {
                Ok(payload) => WsMessage::reply(msg.id, WsMessageType::Response, payload),
                Err(e) => WsMessage::error(msg.id, 500, &e.to_string()),
            }
        }
        WsCommand::GetStatus {
            request_id: Some(raw),
        } => {
            let Ok(uuid) = raw.parse::<uuid::Uuid>() else {
                return serde_json::to_string(&WsMessage::error(msg.id, 400, "invalid request id"))
                    .ok();
            };
            match service.get_record(RequestId::from_uuid(uuid)).await {
                Ok(record) => {
                    let dto = GenerationDto::from(GenerationSummary::from(&record));
                    match serde_json::to_value(&dto) {
                        Ok(payload) => WsMessage::reply(msg.id, WsMessageType::Response, payload),
                        Err(e) => WsMessage::error(msg.id, 500, &e.to_string()),
                    }
                }
                Err(e) => WsMessage::error(msg.id, e.status_code().as_u16(), &e.to_string()),
            }
        }
    };
    serde_json::to_string(&response).ok()
}
