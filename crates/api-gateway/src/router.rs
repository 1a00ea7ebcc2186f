//! Prefix routing from request paths to backend services.
//!
//! The table is built once from configuration and only read afterwards, so it
//! is shared between workers behind an `Arc` without any locking.

use url::Url;

use crate::config::ConfigError;
use crate::error::GatewayError;

/// Health endpoint probed when a route does not name one.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// One downstream service the gateway can forward requests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    /// Service name, used as the key in `/services/health`
    pub name: String,
    /// Absolute `http`/`https` URL without a trailing slash
    pub base_url: String,
    /// Path of the liveness endpoint, starting with `/`
    pub health_path: String,
}

impl BackendTarget {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        health_path: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidRoute(
                "service name must not be empty".to_string(),
            ));
        }

        let parsed =
            Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "{base_url}: expected an absolute http(s) URL"
            )));
        }

        let health_path = match health_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) if p.starts_with('/') => p.to_string(),
            Some(p) => format!("/{p}"),
            None => DEFAULT_HEALTH_PATH.to_string(),
        };

        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            health_path,
        })
    }

    /// URL probed by the health aggregator.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }
}

#[derive(Debug)]
struct Route {
    prefix: String,
    backend: usize,
}

/// Immutable mapping of path prefix to backend, resolved by longest match.
#[derive(Debug)]
pub struct RouteTable {
    /// Sorted longest prefix first, so the first hit is the longest match.
    routes: Vec<Route>,
    backends: Vec<BackendTarget>,
}

impl RouteTable {
    /// Build the table from `(prefix, target)` pairs.
    ///
    /// Several prefixes may point at the same service as long as every
    /// mention of the service name carries the same target.
    pub fn new<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, BackendTarget)>,
    {
        let mut routes: Vec<Route> = Vec::new();
        let mut backends: Vec<BackendTarget> = Vec::new();

        for (prefix, target) in entries {
            let prefix = normalize_prefix(&prefix)?;
            if routes.iter().any(|r| r.prefix == prefix) {
                return Err(ConfigError::DuplicatePrefix(prefix));
            }

            let backend = match backends.iter().position(|b| b.name == target.name) {
                Some(idx) if backends[idx] == target => idx,
                Some(_) => return Err(ConfigError::ConflictingService(target.name)),
                None => {
                    backends.push(target);
                    backends.len() - 1
                }
            };
            routes.push(Route { prefix, backend });
        }

        if routes.is_empty() {
            return Err(ConfigError::NoRoutes);
        }

        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(Self { routes, backends })
    }

    /// Find the backend owning `path`.
    pub fn resolve(&self, path: &str) -> Result<&BackendTarget, GatewayError> {
        self.routes
            .iter()
            .find(|route| prefix_matches(&route.prefix, path))
            .map(|route| &self.backends[route.backend])
            .ok_or_else(|| GatewayError::RouteNotFound(path.to_string()))
    }

    /// Every distinct backend, in configuration order.
    pub fn backends(&self) -> &[BackendTarget] {
        &self.backends
    }

    /// `(prefix, backend)` pairs, longest prefix first.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &BackendTarget)> {
        self.routes
            .iter()
            .map(|route| (route.prefix.as_str(), &self.backends[route.backend]))
    }
}

fn normalize_prefix(prefix: &str) -> Result<String, ConfigError> {
    let prefix = prefix.trim();
    if !prefix.starts_with('/') {
        return Err(ConfigError::InvalidPrefix(prefix.to_string()));
    }
    let trimmed = prefix.trim_end_matches('/');
    Ok(if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    })
}

/// `/users` matches `/users` and `/users/...`, never `/usersx`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
