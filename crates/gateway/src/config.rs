use std::time::Duration;

use crate::error::GatewayError;

/// Default number of concurrent task workers.
pub const DEFAULT_WORKER_COUNT: usize = 8;

/// Default deadline for a single task handler invocation.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for request/reply exchanges (poke, file registration).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway configuration.
///
/// All fields except the service name have defaults. Bus connection
/// parameters are not part of this struct: the bus is injected as a
/// [`taskgate_bus::Bus`] implementation and carries its own configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Service name registered with the gateway; inbound tasks arrive on
    /// `gw.<name>.task`.
    pub name: String,
    /// Number of concurrent task workers (default: 8).
    pub worker_count: usize,
    /// Deadline for a single task handler invocation (default: 60 s).
    pub task_timeout: Duration,
    /// Timeout for poke / file-registration request/reply calls
    /// (default: 5 s).
    pub request_timeout: Duration,
    /// Public base URL of the silo, required only for file uploads and
    /// downloads.
    pub silo_public_base_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            worker_count: DEFAULT_WORKER_COUNT,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            silo_public_base_url: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `GATEWAY_NAME`                 | (empty) |
    /// | `GATEWAY_WORKER_COUNT`         | `8`     |
    /// | `GATEWAY_TASK_TIMEOUT_SECS`    | `60`    |
    /// | `GATEWAY_REQUEST_TIMEOUT_SECS` | `5`     |
    /// | `SILO_PUBLIC_BASE_URL`         | unset   |
    pub fn from_env() -> Result<Self, GatewayError> {
        let defaults = Self::default();

        Ok(Self {
            name: std::env::var("GATEWAY_NAME").unwrap_or_default(),
            worker_count: env_parse("GATEWAY_WORKER_COUNT", defaults.worker_count)?,
            task_timeout: Duration::from_secs(env_parse(
                "GATEWAY_TASK_TIMEOUT_SECS",
                defaults.task_timeout.as_secs(),
            )?),
            request_timeout: Duration::from_secs(env_parse(
                "GATEWAY_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            silo_public_base_url: std::env::var("SILO_PUBLIC_BASE_URL").ok(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, GatewayError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| GatewayError::Config(format!("{var} must be a valid number: {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_match_the_protocol() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.worker_count, 8);
        assert_eq!(cfg.task_timeout, Duration::from_secs(60));
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert!(cfg.silo_public_base_url.is_none());
    }

    #[test]
    fn env_parse_rejects_garbage() {
        // Var name is unique to this test; tests run in parallel.
        std::env::set_var("TASKGATE_TEST_BAD_COUNT", "not-a-number");
        let res: Result<usize, _> = env_parse("TASKGATE_TEST_BAD_COUNT", 8);
        assert_matches!(res, Err(GatewayError::Config(_)));
        std::env::remove_var("TASKGATE_TEST_BAD_COUNT");
    }

    #[test]
    fn env_parse_falls_back_to_default() {
        let res: usize = env_parse("TASKGATE_TEST_UNSET_VAR", 8).unwrap();
        assert_eq!(res, 8);
    }
}
