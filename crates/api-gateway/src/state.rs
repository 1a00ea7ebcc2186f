use crate::config::GatewayConfig;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// Shared by the forwarder and the health aggregator. Deadlines are set
    /// per call, so the client itself carries no timeout.
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none()) // Redirects go back to the caller
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }
}
