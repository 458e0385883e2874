use secrecy::Secret;
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub token: TokenSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,
    #[serde(default = "default_session_inactivity_hours")]
    pub session_inactivity_hours: i64,
}

fn default_session_inactivity_hours() -> i64 {
    24
}

#[derive(Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL of the REST collaborator (users, roles, permissions, ...).
    pub url: String,
    #[serde(default = "default_backend_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_backend_timeout_seconds() -> u64 {
    10
}

#[derive(Deserialize, Clone)]
pub struct TokenSettings {
    /// Symmetric HS256 key. Never leaves the server.
    pub signing_secret: Secret<String>,
    #[serde(default = "default_token_expiry_minutes")]
    pub expiry_minutes: i64,
}

fn default_token_expiry_minutes() -> i64 {
    120
}

#[derive(Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("cannot read current dir: {}", e)))?;

    // Run from the crate directory or from the workspace root.
    let configuration_directory = if base_path.ends_with("rbac-console") {
        base_path.join("config")
    } else {
        base_path.join("rbac-console").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
