//! Backend liveness aggregation.
//!
//! Every call probes all backends afresh: one concurrent GET per backend, each
//! with its own deadline, joined before the report is built. Nothing is
//! cached and the result never influences routing.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;

use crate::error::error_chain;
use crate::metrics::HEALTH_PROBES_TOTAL;
use crate::router::BackendTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Up,
    Down,
}

impl ServiceState {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Up => "up",
            ServiceState::Down => "down",
        }
    }
}

/// Outcome of one probe. `checked_at` is when the answer (or the failure)
/// arrived; the aggregated report only carries its own `time`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub backend_name: String,
    pub state: ServiceState,
    pub checked_at: DateTime<Utc>,
}

/// Body of `GET /services/health`.
#[derive(Debug, Serialize)]
pub struct ServicesHealth {
    pub gateway: &'static str,
    pub services: BTreeMap<String, ServiceState>,
    pub time: DateTime<Utc>,
}

/// Why a probe classified its backend as down.
#[derive(Debug, thiserror::Error)]
pub enum ProbeFailure {
    #[error("health endpoint answered {0}")]
    Status(u16),

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Transport(String),
}

/// Probe every backend concurrently and wait for all of them to settle.
pub async fn aggregate_health(
    client: &reqwest::Client,
    backends: &[BackendTarget],
    timeout: Duration,
) -> ServicesHealth {
    let statuses = join_all(
        backends
            .iter()
            .map(|backend| probe(client, backend, timeout)),
    )
    .await;

    ServicesHealth {
        gateway: "ok",
        services: statuses
            .into_iter()
            .map(|status| (status.backend_name, status.state))
            .collect(),
        time: Utc::now(),
    }
}

/// Probe a single backend. Never fails: any problem means `Down`.
pub async fn probe(
    client: &reqwest::Client,
    backend: &BackendTarget,
    timeout: Duration,
) -> HealthStatus {
    let outcome = check(client, backend, timeout).await;
    let checked_at = Utc::now();
    let state = match outcome {
        Ok(()) => {
            tracing::debug!(service = %backend.name, %checked_at, "health probe ok");
            ServiceState::Up
        }
        Err(e) => {
            tracing::warn!(
                service = %backend.name,
                url = %backend.health_url(),
                reason = %e,
                %checked_at,
                "health probe failed"
            );
            ServiceState::Down
        }
    };
    HEALTH_PROBES_TOTAL
        .with_label_values(&[backend.name.as_str(), state.as_str()])
        .inc();

    HealthStatus {
        backend_name: backend.name.clone(),
        state,
        checked_at,
    }
}

async fn check(
    client: &reqwest::Client,
    backend: &BackendTarget,
    timeout: Duration,
) -> Result<(), ProbeFailure> {
    let response = client
        .get(backend.health_url())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ProbeFailure::Timeout(timeout)
            } else {
                ProbeFailure::Transport(error_chain(&e))
            }
        })?;

    if response.status() == reqwest::StatusCode::OK {
        Ok(())
    } else {
        Err(ProbeFailure::Status(response.status().as_u16()))
    }
}
