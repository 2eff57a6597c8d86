use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::geocoder::Geocoder;
use crate::mail::Mailer;
use crate::middleware::rate_limit::RateLimitState;

/// Everything a request handler needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limit: RateLimitState,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        geocoder: Arc<dyn Geocoder>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let rate_limit = RateLimitState::new(&config.api);
        Self {
            config: Arc::new(config),
            store,
            geocoder,
            mailer,
            rate_limit,
        }
    }
}
