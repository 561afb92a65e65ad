use std::sync::Arc;

use crate::alerts::ResolvedAlerts;
use crate::backend::Backend;
use crate::cache::DomainCache;
use crate::clock::SchoolClock;
use crate::config::Config;
use crate::error::ApiError;
use crate::notifications::RemoteFunctions;
use crate::scan::AllergyBoard;
use crate::session::Sessions;
use crate::settings::{self, SystemSettings};

/// Everything a request handler can reach. Cloned per request, all fields shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn Backend>,
    pub cache: Arc<DomainCache>,
    pub sessions: Arc<Sessions>,
    pub functions: Arc<dyn RemoteFunctions>,
    pub allergy_board: Arc<AllergyBoard>,
    pub resolved_alerts: Arc<ResolvedAlerts>,
}

impl AppState {
    pub fn new(
        config: Config,
        backend: Arc<dyn Backend>,
        functions: Arc<dyn RemoteFunctions>,
    ) -> Self {
        Self {
            sessions: Arc::new(Sessions::new(config.session_ttl)),
            config: Arc::new(config),
            cache: Arc::new(DomainCache::new(backend.clone())),
            backend,
            functions,
            allergy_board: Arc::new(AllergyBoard::new()),
            resolved_alerts: Arc::new(ResolvedAlerts::new()),
        }
    }

    pub async fn settings(&self) -> Result<SystemSettings, ApiError> {
        settings::load(self.backend.as_ref()).await
    }

    /// Clock built from the configured school hours and the stored thresholds.
    pub async fn clock(&self) -> Result<SchoolClock, ApiError> {
        let settings = self.settings().await?;
        Ok(SchoolClock::new(&self.config, &settings.alert_thresholds))
    }

    /// Whether sign-ups are also sent to the remote `auth-operations` function.
    pub fn forwards_auth(&self) -> bool {
        self.config.functions_url.is_some()
    }
}
