use std::env;
use std::time::Duration;

use crate::router::{BackendTarget, RouteTable};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8081";
const DEFAULT_PRODUCT_SERVICE_URL: &str = "http://localhost:8082";
const DEFAULT_FORWARD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug)]
pub struct GatewayConfig {
    /// Server port
    pub port: u16,
    /// Deployment name (development, staging, production, ...)
    pub environment: String,
    /// Prefix routes, fixed for the lifetime of the process
    pub routes: RouteTable,
    /// Deadline for one forwarded request, body included
    pub forward_timeout: Duration,
    /// Deadline for one health probe
    pub probe_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Optional: port
        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        // Optional: environment name
        let environment = var("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        // Optional: explicit route list, otherwise the user/product services
        let entries = match var("GATEWAY_ROUTES") {
            Some(routes) => parse_routes(&routes)?,
            None => default_routes(
                &var("USER_SERVICE_URL").unwrap_or_else(|| DEFAULT_USER_SERVICE_URL.to_string()),
                &var("PRODUCT_SERVICE_URL")
                    .unwrap_or_else(|| DEFAULT_PRODUCT_SERVICE_URL.to_string()),
            )?,
        };
        let routes = RouteTable::new(entries)?;

        // Optional: timeouts
        let forward_timeout = parse_timeout(
            "FORWARD_TIMEOUT_SECS",
            var("FORWARD_TIMEOUT_SECS"),
            DEFAULT_FORWARD_TIMEOUT_SECS,
        )?;
        let probe_timeout = parse_timeout(
            "PROBE_TIMEOUT_SECS",
            var("PROBE_TIMEOUT_SECS"),
            DEFAULT_PROBE_TIMEOUT_SECS,
        )?;

        Ok(Self {
            port,
            environment,
            routes,
            forward_timeout,
            probe_timeout,
        })
    }
}

/// The two services the gateway fronts when `GATEWAY_ROUTES` is unset.
pub fn default_routes(
    user_service_url: &str,
    product_service_url: &str,
) -> Result<Vec<(String, BackendTarget)>, ConfigError> {
    Ok(vec![
        (
            "/users".to_string(),
            BackendTarget::new("user-service", user_service_url, None)?,
        ),
        (
            "/products".to_string(),
            BackendTarget::new("product-service", product_service_url, None)?,
        ),
    ])
}

/// Parse `name,prefix,base_url[,health_path]` entries separated by `;`.
///
/// ```text
/// user-service,/users,http://users:8081;product-service,/products,http://products:8082,/healthz
/// ```
pub fn parse_routes(raw: &str) -> Result<Vec<(String, BackendTarget)>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let fields: Vec<&str> = entry.split(',').map(str::trim).collect();
            match fields.as_slice() {
                [name, prefix, base_url] => Ok((
                    prefix.to_string(),
                    BackendTarget::new(*name, base_url, None)?,
                )),
                [name, prefix, base_url, health_path] => Ok((
                    prefix.to_string(),
                    BackendTarget::new(*name, base_url, Some(*health_path))?,
                )),
                _ => Err(ConfigError::InvalidRoute(entry.to_string())),
            }
        })
        .collect()
}

fn parse_timeout(
    key: &'static str,
    raw: Option<String>,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    let secs = match raw {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => return Err(ConfigError::InvalidValue { key, value: raw }),
        },
        None => default_secs,
    };
    Ok(Duration::from_secs(secs))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid route entry: {0}")]
    InvalidRoute(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("route prefix must start with '/': {0:?}")]
    InvalidPrefix(String),

    #[error("route prefix configured twice: {0}")]
    DuplicatePrefix(String),

    #[error("service {0} is configured with different targets")]
    ConflictingService(String),

    #[error("no routes configured")]
    NoRoutes,
}
