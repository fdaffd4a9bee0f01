//! Gate configuration
//!
//! The same shape can be bound from JSON by a host (`serde`) or loaded from
//! environment variables by the standalone server (`from_env`).

use std::time::Duration;

use serde::Deserialize;

use crate::error::{GateError, GateResult};

pub const DEFAULT_HEALTH_ROUTE: &str = "/_publicApi";
pub const DEFAULT_LOGIN_ROUTE: &str = "/_login/local";
pub const DEFAULT_IDENTITY_LOOKUP_ROUTE: &str = "/_me";
pub const DEFAULT_REALM_LABEL: &str = "Use a valid user to authenticate";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
/// Upper bound for `requestTimeoutSecs` (one hour)
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Routes requested on the identity service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Routes {
    /// Called anonymously once at startup to check reachability.
    pub health: String,
    /// Accepts a `{"username", "password"}` JSON body and answers with a token.
    pub login: String,
    /// Resolves the identifier of the bearer of a token.
    pub identity_lookup: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            health: DEFAULT_HEALTH_ROUTE.to_string(),
            login: DEFAULT_LOGIN_ROUTE.to_string(),
            identity_lookup: DEFAULT_IDENTITY_LOOKUP_ROUTE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityServiceConfig {
    /// Scheme, host and port of the identity service. Only http(s) is supported.
    pub base_url: String,
    pub routes: Routes,
    /// Identifiers allowed through the gate. Empty means every authenticated identity.
    pub allowed_identities: Vec<String>,
    /// Deadline for one request's whole authorization chain.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    #[serde(rename = "identityService")]
    pub identity: IdentityServiceConfig,
    /// Shown in the basic auth challenge prompt
    pub realm_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: IdentityServiceConfig::default(),
            realm_label: DEFAULT_REALM_LABEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> GateResult<Self> {
        let base_url = std::env::var("IDENTITY_SERVICE_URL").map_err(|_| {
            GateError::Configuration("IDENTITY_SERVICE_URL must be set".to_string())
        })?;

        let request_timeout_secs = match non_empty_var("IDENTITY_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                GateError::Configuration(format!(
                    "IDENTITY_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })?),
            None => None,
        };

        let config = Self {
            identity: IdentityServiceConfig {
                base_url,
                routes: Routes {
                    health: std::env::var("IDENTITY_HEALTH_ROUTE").unwrap_or_default(),
                    login: std::env::var("IDENTITY_LOGIN_ROUTE").unwrap_or_default(),
                    identity_lookup: std::env::var("IDENTITY_LOOKUP_ROUTE").unwrap_or_default(),
                },
                allowed_identities: std::env::var("ALLOWED_IDENTITIES")
                    .map(|raw| parse_list(&raw))
                    .unwrap_or_default(),
                request_timeout_secs,
            },
            realm_label: std::env::var("REALM_LABEL").unwrap_or_default(),
        };

        Ok(config.with_defaults())
    }

    /// Fill every unset (empty) field with its default.
    pub fn with_defaults(mut self) -> Self {
        if self.realm_label.is_empty() {
            self.realm_label = DEFAULT_REALM_LABEL.to_string();
        }

        let routes = &mut self.identity.routes;
        if routes.health.is_empty() {
            routes.health = DEFAULT_HEALTH_ROUTE.to_string();
        }
        if routes.login.is_empty() {
            routes.login = DEFAULT_LOGIN_ROUTE.to_string();
        }
        if routes.identity_lookup.is_empty() {
            routes.identity_lookup = DEFAULT_IDENTITY_LOOKUP_ROUTE.to_string();
        }

        self
    }

    /// Reject configurations the gate can never serve with.
    ///
    /// Normalizes the base URL by trimming trailing slashes.
    pub fn validate(mut self) -> GateResult<Self> {
        let base_url = self.identity.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GateError::Configuration(
                "identity service base url is required".to_string(),
            ));
        }

        let parsed = url::Url::parse(&base_url).map_err(|e| {
            GateError::Configuration(format!("invalid identity service url '{}': {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GateError::Configuration(format!(
                "identity service url '{}' must use http or https",
                base_url
            )));
        }
        self.identity.base_url = base_url;

        let routes = &self.identity.routes;
        for (name, route) in [
            ("health", &routes.health),
            ("login", &routes.login),
            ("identityLookup", &routes.identity_lookup),
        ] {
            if !route.starts_with('/') {
                return Err(GateError::Configuration(format!(
                    "route '{}' must start with '/', got '{}'",
                    name, route
                )));
            }
        }

        match self.identity.request_timeout_secs {
            Some(0) => {
                return Err(GateError::Configuration(
                    "request timeout must be greater than zero".to_string(),
                ));
            }
            Some(secs) if secs > MAX_REQUEST_TIMEOUT_SECS => {
                return Err(GateError::Configuration(format!(
                    "request timeout must be at most {} seconds, got {}",
                    MAX_REQUEST_TIMEOUT_SECS, secs
                )));
            }
            _ => {}
        }

        Ok(self)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.identity.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Settings of the standalone server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Where authorized requests are forwarded
    pub upstream_url: String,
}

impl ServerConfig {
    pub fn from_env() -> GateResult<Self> {
        let upstream_url = non_empty_var("UPSTREAM_URL")
            .ok_or_else(|| GateError::Configuration("UPSTREAM_URL must be set".to_string()))?;

        Ok(Self {
            bind_address: non_empty_var("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_KEYS: [&str; 9] = [
        "IDENTITY_SERVICE_URL",
        "IDENTITY_HEALTH_ROUTE",
        "IDENTITY_LOGIN_ROUTE",
        "IDENTITY_LOOKUP_ROUTE",
        "ALLOWED_IDENTITIES",
        "REALM_LABEL",
        "IDENTITY_REQUEST_TIMEOUT_SECS",
        "UPSTREAM_URL",
        "BIND_ADDRESS",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn config_with_url(url: &str) -> Config {
        Config {
            identity: IdentityServiceConfig {
                base_url: url.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.identity.routes.health, "/_publicApi");
        assert_eq!(config.identity.routes.login, "/_login/local");
        assert_eq!(config.identity.routes.identity_lookup, "/_me");
        assert_eq!(config.realm_label, "Use a valid user to authenticate");
        assert!(config.identity.allowed_identities.is_empty());
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_deserialize_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "identityService": {
                    "baseUrl": "http://identity:7512",
                    "routes": { "login": "/_login/ldap" },
                    "allowedIdentities": ["admin"]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.identity.base_url, "http://identity:7512");
        assert_eq!(config.identity.routes.login, "/_login/ldap");
        assert_eq!(config.identity.routes.health, "/_publicApi");
        assert_eq!(config.identity.routes.identity_lookup, "/_me");
        assert_eq!(config.identity.allowed_identities, vec!["admin"]);
        assert_eq!(config.realm_label, DEFAULT_REALM_LABEL);
    }

    #[test]
    fn test_with_defaults_replaces_empty_strings() {
        let config: Config = serde_json::from_str(
            r#"{
                "identityService": {
                    "baseUrl": "http://identity:7512",
                    "routes": { "health": "", "login": "", "identityLookup": "" }
                },
                "realmLabel": ""
            }"#,
        )
        .unwrap();
        let config = config.with_defaults();

        assert_eq!(config.identity.routes, Routes::default());
        assert_eq!(config.realm_label, DEFAULT_REALM_LABEL);
    }

    #[test]
    fn test_custom_realm_is_kept() {
        let mut config = config_with_url("http://identity:7512");
        config.realm_label = "Staff only".to_string();
        assert_eq!(config.with_defaults().realm_label, "Staff only");
    }

    #[test]
    fn test_validate_trims_trailing_slash() {
        let config = config_with_url("https://identity.example.com:7512/")
            .validate()
            .unwrap();
        assert_eq!(config.identity.base_url, "https://identity.example.com:7512");
    }

    #[test]
    fn test_validate_rejects_missing_url() {
        let err = config_with_url("").validate().unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let err = config_with_url("ws://identity:7512").validate().unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_garbage_url() {
        let err = config_with_url("not a url").validate().unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_relative_route() {
        let mut config = config_with_url("http://identity:7512");
        config.identity.routes.login = "_login/local".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("login"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let mut config = config_with_url("http://identity:7512");
        config.identity.request_timeout_secs = Some(MAX_REQUEST_TIMEOUT_SECS);
        assert!(config.clone().validate().is_ok());

        for secs in [MAX_REQUEST_TIMEOUT_SECS + 1, u64::MAX] {
            config.identity.request_timeout_secs = Some(secs);
            let err = config.clone().validate().unwrap_err();
            assert!(matches!(err, GateError::Configuration(_)), "{secs} accepted");
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = config_with_url("http://identity:7512");
        config.identity.request_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_requires_url() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_all_fields() {
        clear_env();
        std::env::set_var("IDENTITY_SERVICE_URL", "http://identity:7512");
        std::env::set_var("IDENTITY_LOOKUP_ROUTE", "/_me/v1");
        std::env::set_var("ALLOWED_IDENTITIES", "admin, ops ,,");
        std::env::set_var("REALM_LABEL", "Staff only");
        std::env::set_var("IDENTITY_REQUEST_TIMEOUT_SECS", "5");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.identity.base_url, "http://identity:7512");
        assert_eq!(config.identity.routes.health, DEFAULT_HEALTH_ROUTE);
        assert_eq!(config.identity.routes.login, DEFAULT_LOGIN_ROUTE);
        assert_eq!(config.identity.routes.identity_lookup, "/_me/v1");
        assert_eq!(config.identity.allowed_identities, vec!["admin", "ops"]);
        assert_eq!(config.realm_label, "Staff only");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_timeout() {
        clear_env();
        std::env::set_var("IDENTITY_SERVICE_URL", "http://identity:7512");
        std::env::set_var("IDENTITY_REQUEST_TIMEOUT_SECS", "soon");

        let result = Config::from_env();
        clear_env();

        assert!(matches!(result, Err(GateError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        clear_env();
        assert!(ServerConfig::from_env().is_err());

        std::env::set_var("UPSTREAM_URL", "http://backend:3000/");
        let server = ServerConfig::from_env().unwrap();
        clear_env();

        assert_eq!(server.upstream_url, "http://backend:3000");
        assert_eq!(server.bind_address, DEFAULT_BIND_ADDRESS);
    }
}
