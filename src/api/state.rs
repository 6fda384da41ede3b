//! Application state for the API server

use crate::{ChannelHarvester, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Task registry, governor and cache
    pub harvester: Arc<ChannelHarvester>,

    /// Configuration the server was started with
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(harvester: Arc<ChannelHarvester>, config: Arc<Config>) -> Self {
        Self { harvester, config }
    }
}
