use std::sync::Arc;

use regscope_query::Aggregator;
use regscope_sync::EcfrClient;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Used by `/diff` to fetch historical versions.
    pub ecfr: EcfrClient,
}

impl AppState {
    pub fn new(aggregator: Aggregator, ecfr: EcfrClient) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            ecfr,
        }
    }
}
