//! Configuration types and loading
//!
//! Precedence: environment > config file > defaults. The file is optional;
//! a Lambda deployment is normally configured through environment alone.
//! AWS signing credentials are never read from the file.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default config file looked up next to the binary's working directory
const DEFAULT_CONFIG_FILE: &str = "cognito-auth-bridge.toml";

/// Hosting environment the binary runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// AWS Lambda custom runtime behind API Gateway
    Lambda,
    /// Standalone HTTP server
    Http,
}

impl Platform {
    /// Parse a platform name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "lambda" => Some(Platform::Lambda),
            "http" => Some(Platform::Http),
            _ => None,
        }
    }
}

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Raw platform name; see `Config::platform`
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub tenant: TenantConfig,
    #[serde(default)]
    pub cognito: CognitoConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub handler: HandlerConfig,
}

/// User pool identifiers passed on every provider call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TenantConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub pool_id: String,
}

/// Cognito client settings
#[derive(Debug, Deserialize)]
pub struct CognitoConfig {
    /// Region; derived from the pool id prefix when unset
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override, e.g. a local emulator
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// HTTP platform settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Request handler behavior
#[derive(Debug, Deserialize)]
pub struct HandlerConfig {
    /// Reject requests that select no auth flow without calling the provider.
    /// When false the provider receives the request with no flow and is left
    /// to reject it.
    #[serde(default = "default_reject_missing_credentials")]
    pub reject_missing_credentials: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_connections() -> usize {
    1000
}

fn default_reject_missing_credentials() -> bool {
    true
}

impl Default for CognitoConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            reject_missing_credentials: default_reject_missing_credentials(),
        }
    }
}

impl Config {
    /// Load the optional TOML file, then overlay process environment.
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let contents = match path {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };
        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build configuration from file contents and an environment lookup.
    pub fn from_sources(
        contents: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> common::Result<Self> {
        let mut config: Config = match contents {
            Some(contents) => toml::from_str(contents)?,
            None => Config::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> common::Result<()> {
        let get = |key: &str| lookup(key).filter(|v: &String| !v.is_empty());

        if let Some(platform) = get("PLATFORM") {
            self.platform = Some(platform);
        }
        if let Some(client_id) = get("CLIENT_ID") {
            self.tenant.client_id = client_id;
        }
        if let Some(pool_id) = get("POOL_ID") {
            self.tenant.pool_id = pool_id;
        }
        if let Some(region) = get("AWS_REGION") {
            self.cognito.region = Some(region);
        }
        if let Some(endpoint) = get("COGNITO_ENDPOINT") {
            self.cognito.endpoint = Some(endpoint);
        }
        if let Some(addr) = get("LISTEN_ADDR") {
            self.http.listen_addr = addr.parse().map_err(|e| {
                common::Error::Config(format!("LISTEN_ADDR {addr:?} is not a socket address: {e}"))
            })?;
        }
        Ok(())
    }

    /// Selected hosting platform, `None` when unset or unrecognized.
    pub fn platform(&self) -> Option<Platform> {
        self.platform.as_deref().and_then(Platform::from_name)
    }

    /// Cognito region: explicit setting, else the prefix of the pool id.
    pub fn region(&self) -> Option<String> {
        self.cognito.region.clone().or_else(|| {
            cognito_auth::region_from_pool_id(&self.tenant.pool_id).map(str::to_string)
        })
    }

    /// Check the settings a running platform needs.
    pub fn validate(&self) -> common::Result<()> {
        if self.tenant.client_id.trim().is_empty() {
            return Err(common::Error::MissingSetting("CLIENT_ID"));
        }
        if self.tenant.pool_id.trim().is_empty() {
            return Err(common::Error::MissingSetting("POOL_ID"));
        }
        if self.region().is_none() {
            return Err(common::Error::MissingSetting("AWS_REGION"));
        }
        if let Some(endpoint) = &self.cognito.endpoint
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "cognito endpoint must start with http:// or https://, got: {endpoint}"
            )));
        }
        if self.cognito.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.http.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the config file from the CLI arg or CONFIG_PATH, falling back
    /// to the default file name when it exists.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        Self::resolve_path_with(cli_path, |key| std::env::var(key).ok(), |p| p.exists())
    }

    fn resolve_path_with(
        cli_path: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
        exists: impl Fn(&Path) -> bool,
    ) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Some(p) = lookup("CONFIG_PATH").filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        exists(&default).then_some(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn no_env() -> impl Fn(&str) -> Option<String> {
        env(&[])
    }

    fn valid_toml() -> &'static str {
        r#"
platform = "http"

[tenant]
client_id = "file-client"
pool_id = "eu-west-1_FilePool"

[cognito]
timeout_secs = 10

[http]
listen_addr = "127.0.0.1:9000"
max_connections = 50
"#
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = Config::from_sources(None, no_env()).unwrap();
        assert_eq!(config.platform(), None);
        assert!(config.tenant.client_id.is_empty());
        assert_eq!(config.cognito.timeout_secs, 30);
        assert_eq!(config.http.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.http.max_connections, 1000);
        assert!(config.handler.reject_missing_credentials);
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.platform(), Some(Platform::Http));
        assert_eq!(config.tenant.client_id, "file-client");
        assert_eq!(config.tenant.pool_id, "eu-west-1_FilePool");
        assert_eq!(config.cognito.timeout_secs, 10);
        assert_eq!(config.http.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.http.max_connections, 50);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/path/config.toml")));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = Config::from_sources(Some("not valid {{{{ toml"), no_env());
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config::from_sources(
            Some(valid_toml()),
            env(&[
                ("PLATFORM", "lambda"),
                ("CLIENT_ID", "env-client"),
                ("POOL_ID", "us-east-2_EnvPool"),
                ("AWS_REGION", "ap-south-1"),
                ("COGNITO_ENDPOINT", "http://localhost:9229"),
                ("LISTEN_ADDR", "127.0.0.1:7000"),
            ]),
        )
        .unwrap();

        assert_eq!(config.platform(), Some(Platform::Lambda));
        assert_eq!(config.tenant.client_id, "env-client");
        assert_eq!(config.tenant.pool_id, "us-east-2_EnvPool");
        assert_eq!(config.region().as_deref(), Some("ap-south-1"));
        assert_eq!(
            config.cognito.endpoint.as_deref(),
            Some("http://localhost:9229")
        );
        assert_eq!(config.http.listen_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config =
            Config::from_sources(Some(valid_toml()), env(&[("CLIENT_ID", "")])).unwrap();
        assert_eq!(config.tenant.client_id, "file-client");
    }

    #[test]
    fn test_invalid_listen_addr_rejected() {
        let result = Config::from_sources(None, env(&[("LISTEN_ADDR", "not-an-addr")]));
        assert!(matches!(result, Err(common::Error::Config(_))));
    }

    #[test]
    fn test_unknown_platform_is_none() {
        let config = Config::from_sources(None, env(&[("PLATFORM", "kubernetes")])).unwrap();
        assert_eq!(config.platform.as_deref(), Some("kubernetes"));
        assert_eq!(config.platform(), None);
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::from_name("lambda"), Some(Platform::Lambda));
        assert_eq!(Platform::from_name("http"), Some(Platform::Http));
        assert_eq!(Platform::from_name(""), None);
        assert_eq!(Platform::from_name("Lambda"), None);
    }

    #[test]
    fn test_region_derived_from_pool_id() {
        let config = Config::from_sources(
            None,
            env(&[("CLIENT_ID", "c"), ("POOL_ID", "us-west-2_abc123")]),
        )
        .unwrap();
        assert_eq!(config.region().as_deref(), Some("us-west-2"));
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_client_id_rejected() {
        let config = Config::from_sources(None, env(&[("POOL_ID", "us-west-2_abc")])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(common::Error::MissingSetting("CLIENT_ID"))
        ));
    }

    #[test]
    fn test_missing_pool_id_rejected() {
        let config = Config::from_sources(None, env(&[("CLIENT_ID", "c")])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(common::Error::MissingSetting("POOL_ID"))
        ));
    }

    #[test]
    fn test_unresolvable_region_rejected() {
        let config =
            Config::from_sources(None, env(&[("CLIENT_ID", "c"), ("POOL_ID", "nopool")]))
                .unwrap();
        assert!(matches!(
            config.validate(),
            Err(common::Error::MissingSetting("AWS_REGION"))
        ));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = Config::from_sources(
            None,
            env(&[
                ("CLIENT_ID", "c"),
                ("POOL_ID", "us-west-2_abc"),
                ("COGNITO_ENDPOINT", "localhost:9229"),
            ]),
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(common::Error::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = r#"
[tenant]
client_id = "c"
pool_id = "us-west-2_abc"

[cognito]
timeout_secs = 0
"#;
        let config = Config::from_sources(Some(toml), no_env()).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let toml = r#"
[tenant]
client_id = "c"
pool_id = "us-west-2_abc"

[http]
max_connections = 0
"#;
        let config = Config::from_sources(Some(toml), no_env()).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_connections"));
    }

    #[test]
    fn test_pass_through_mode_from_file() {
        let toml = r#"
[handler]
reject_missing_credentials = false
"#;
        let config = Config::from_sources(Some(toml), no_env()).unwrap();
        assert!(!config.handler.reject_missing_credentials);
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path_with(
            Some("/etc/bridge.toml"),
            env(&[("CONFIG_PATH", "/other.toml")]),
            |_| false,
        );
        assert_eq!(path, Some(PathBuf::from("/etc/bridge.toml")));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let path =
            Config::resolve_path_with(None, env(&[("CONFIG_PATH", "/env.toml")]), |_| false);
        assert_eq!(path, Some(PathBuf::from("/env.toml")));
    }

    #[test]
    fn test_resolve_path_default_only_when_present() {
        assert_eq!(Config::resolve_path_with(None, no_env(), |_| false), None);
        assert_eq!(
            Config::resolve_path_with(None, no_env(), |_| true),
            Some(PathBuf::from(DEFAULT_CONFIG_FILE))
        );
    }
}
