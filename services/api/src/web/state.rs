//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::quotes::QuoteBook;
use crate::config::Config;
use diary_core::ports::{AnalysisService, DatabaseService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    /// The single analysis client, built once and reused for every request.
    pub analysis_adapter: Arc<dyn AnalysisService>,
    pub quotes: Arc<QuoteBook>,
}
