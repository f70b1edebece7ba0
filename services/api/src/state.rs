//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources: the dataset store, the prompt set, the upstream
//! connector and the configuration. The dataset is loaded once at startup and
//! shared read-only by the REST handlers and every session.

use crate::config::Config;
use crate::dataset::SculptureStore;
use crate::prompts::PromptSet;
use lapidarium_realtime::ClientConnector;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<SculptureStore>,
    pub prompts: Arc<PromptSet>,
    pub connector: Arc<dyn ClientConnector>,
    pub config: Arc<Config>,
}
