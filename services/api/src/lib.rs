//! Lapidarium API Library Crate
//!
//! This library contains all the core logic for the gallery voice-guide web
//! service: the application state, the sculpture dataset store, the
//! enrichment engine, API handlers, WebSocket session logic, and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod dataset;
pub mod enrichment;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod router;
pub mod state;
pub mod ws;
