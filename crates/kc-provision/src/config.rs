//! Provisioning configuration.
//!
//! Values are layered: built-in defaults, then a TOML file, then environment
//! variables (a `.env` file is honoured), then command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, ProvisionResult};
use crate::naming::normalize_email_domain;

/// Provisioning configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Keycloak server connection.
    pub server: ServerConfig,
    /// Admin credentials for the password grant.
    pub admin: AdminConfig,
    /// Realms operated on.
    pub realms: RealmConfig,
    /// SDK client settings.
    pub sdk_client: SdkClientConfig,
    /// User provisioning settings.
    pub users: UserConfig,
    /// API client settings.
    pub api_client: ApiClientConfig,
}

/// Keycloak server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server root URL, e.g. `https://keycloak.example.com`.
    pub url: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            insecure: false,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Admin credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Realm holding the admin account.
    pub realm: String,
    /// Client used for the password grant.
    pub client_id: String,
    /// Admin username.
    pub username: String,
    /// Admin password.
    pub password: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            realm: "master".to_string(),
            client_id: "admin-cli".to_string(),
            username: String::new(),
            password: None,
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Realm names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmConfig {
    /// Realm applications log in to.
    pub main: String,
    /// Realm that brokers logins into the main realm.
    pub broker: String,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            main: "codemie-prod".to_string(),
            broker: "master".to_string(),
        }
    }
}

/// Public SDK client definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkClientConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Application base URL used for root URL, redirect URI and web origin.
    pub base_url: Option<String>,
    /// Access token lifespan in seconds.
    pub access_token_lifespan: u32,
    /// Client scope that must be attached as a default scope.
    pub scope: String,
    /// Default client scopes set at creation.
    pub default_scopes: Vec<String>,
    /// Optional client scopes set at creation.
    pub optional_scopes: Vec<String>,
}

impl Default for SdkClientConfig {
    fn default() -> Self {
        Self {
            client_id: "codemie-sdk".to_string(),
            name: "CodeMie SDK".to_string(),
            description: "CodeMie SDK".to_string(),
            base_url: None,
            access_token_lifespan: 300,
            scope: "codemie".to_string(),
            default_scopes: ["web-origins", "role_list", "profile", "roles", "email"]
                .map(String::from)
                .to_vec(),
            optional_scopes: ["address", "phone", "offline_access", "microprofile-jwt"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// User provisioning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Default email domain appended to derived usernames.
    pub email_domain: String,
    /// Realm role granted in the main realm.
    pub role: String,
    /// Identity provider alias in the main realm that points at the broker realm.
    pub broker_alias: String,
    /// Identity provider alias in the broker realm for an upstream link, if any.
    pub upstream_alias: Option<String>,
    /// Pause between users of a batch, in milliseconds.
    pub pause_ms: u64,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            email_domain: "@domain.com".to_string(),
            role: "developer".to_string(),
            broker_alias: "broker".to_string(),
            upstream_alias: None,
            pause_ms: 500,
        }
    }
}

/// Confidential API client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiClientConfig {
    /// Prefix prepended to project names.
    pub prefix: String,
    /// Realm role granted to the service account.
    pub role: String,
    /// Domain of the service account email.
    pub email_domain: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            prefix: "api-".to_string(),
            role: "developer".to_string(),
            email_domain: "domain.com".to_string(),
        }
    }
}

impl ProvisionConfig {
    /// Loads the file layer, then applies environment overrides.
    ///
    /// An explicit `path` must exist; otherwise the default path is used when present.
    pub fn load(path: Option<&Path>) -> ProvisionResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: &Path) -> ProvisionResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML content.
    pub fn from_toml_str(content: &str) -> ProvisionResult<Self> {
        toml::from_str(content)
            .map_err(|e| ProvisionError::Config(format!("failed to parse config: {e}")))
    }

    /// Default configuration file path, `~/.keycloak/provision.toml`.
    pub fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".keycloak").join("provision.toml"))
    }

    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> ProvisionResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(v) = lookup(key).filter(|v| !v.is_empty()) {
                *target = v;
            }
        };

        set(&mut self.server.url, "KC_SERVER_URL");
        set(&mut self.admin.realm, "KC_ADMIN_REALM");
        set(&mut self.admin.client_id, "KC_ADMIN_CLIENT_ID");
        set(&mut self.admin.username, "KC_ADMIN_USERNAME");
        set(&mut self.realms.main, "KC_MAIN_REALM");
        set(&mut self.realms.broker, "KC_BROKER_REALM");
        set(&mut self.users.email_domain, "EMAIL_DOMAIN");

        if let Some(v) = lookup("KC_ADMIN_PASSWORD").filter(|v| !v.is_empty()) {
            self.admin.password = Some(v);
        }
        if let Some(v) = lookup("KC_BASE_URL").filter(|v| !v.is_empty()) {
            self.sdk_client.base_url = Some(v);
        }
        if let Some(v) = lookup("KC_INSECURE") {
            self.server.insecure = parse_bool("KC_INSECURE", &v)?;
        }
        if let Some(v) = lookup("KC_TOKEN_LIFESPAN") {
            self.sdk_client.access_token_lifespan = v.trim().parse().map_err(|_| {
                ProvisionError::Config(format!("KC_TOKEN_LIFESPAN is not a number: {v}"))
            })?;
        }

        Ok(())
    }

    /// Checks that everything needed to reach the server is present.
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.server.url.trim().is_empty() {
            return Err(ProvisionError::Config(
                "server URL is required (server.url or KC_SERVER_URL)".to_string(),
            ));
        }
        if self.admin.username.trim().is_empty() {
            return Err(ProvisionError::Config(
                "admin username is required (admin.username or KC_ADMIN_USERNAME)".to_string(),
            ));
        }
        if self.admin.password.as_deref().map_or(true, str::is_empty) {
            return Err(ProvisionError::Config(
                "admin password is required (admin.password or KC_ADMIN_PASSWORD)".to_string(),
            ));
        }
        if self.sdk_client.access_token_lifespan == 0 {
            return Err(ProvisionError::Config(
                "sdk_client.access_token_lifespan must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Server URL without a trailing slash.
    #[must_use]
    pub fn server_url(&self) -> &str {
        self.server.url.trim().trim_end_matches('/')
    }

    /// Application base URL, required by the client tools.
    pub fn base_url(&self) -> ProvisionResult<&str> {
        self.sdk_client
            .base_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ProvisionError::Config(
                    "application base URL is required (sdk_client.base_url or KC_BASE_URL)"
                        .to_string(),
                )
            })
    }

    /// Default email domain for derived usernames, always starting with `@`.
    #[must_use]
    pub fn email_domain(&self) -> String {
        normalize_email_domain(&self.users.email_domain)
    }
}

fn parse_bool(key: &str, value: &str) -> ProvisionResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ProvisionError::Config(format!(
            "{key} is not a boolean: {value}"
        ))),
    }
}
