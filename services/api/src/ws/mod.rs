//! WebSocket Session Management
//!
//! This module contains the core logic for relaying realtime voice sessions
//! between the browser client and the upstream conversation API:
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: Manages the session lifecycle, from backend connection and
//!   configuration through greeting, instruction seeding, frame relaying and teardown.

pub mod protocol;
pub mod session;

pub use session::{BackendConnector, ws_handler};
