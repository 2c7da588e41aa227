//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes generation events to clients
//! that subscribed to their request ids, and answers status snapshots.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
