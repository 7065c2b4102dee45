use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Hostnames (not full origins) that may call the API cross-origin
    pub allowed_origins: Vec<String>,
    /// Accept every origin. Never enabled by the production preset.
    pub local_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub v1_base_path: String,
    pub v2_base_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub username_claim: String,
    pub email_claim: String,
    pub name_claim: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base path for {name} must start with '/': {value:?}")]
    RelativeBasePath { name: &'static str, value: String },
    #[error("base paths for both API trees are identical: {0}")]
    DuplicateBasePath(String),
}

impl EdgeConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Preset for the environment first, specific env vars win
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("EDGE_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        if let Ok(v) = env::var("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("CORS_LOCAL_MODE") {
            self.cors.local_mode = v.parse().unwrap_or(self.cors.local_mode);
        }

        if let Ok(v) = env::var("API_V1_BASE_PATH") {
            self.api.v1_base_path = v;
        }
        if let Ok(v) = env::var("API_V2_BASE_PATH") {
            self.api.v2_base_path = v;
        }

        if let Ok(v) = env::var("AUTH_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_USERNAME_CLAIM") {
            self.auth.username_claim = v;
        }
        if let Ok(v) = env::var("AUTH_EMAIL_CLAIM") {
            self.auth.email_claim = v;
        }
        if let Ok(v) = env::var("AUTH_NAME_CLAIM") {
            self.auth.name_claim = v;
        }

        self
    }

    /// Reject configurations the version router cannot serve sensibly
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("v1", &self.api.v1_base_path),
            ("v2", &self.api.v2_base_path),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::RelativeBasePath {
                    name,
                    value: value.clone(),
                });
            }
        }

        if self.api.v1_base_path == self.api.v2_base_path {
            return Err(ConfigError::DuplicateBasePath(self.api.v1_base_path.clone()));
        }

        Ok(())
    }

    /// Allow-list normalised for host comparison
    pub fn allowed_hosts(&self) -> HashSet<String> {
        self.cors
            .allowed_origins
            .iter()
            .map(|host| host.trim().to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect()
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 8080 },
            cors: CorsConfig {
                allowed_origins: vec!["localhost".to_string(), "127.0.0.1".to_string()],
                local_mode: false,
            },
            api: ApiConfig::default(),
            auth: AuthConfig {
                jwt_secret: "development-secret".to_string(),
                ..AuthConfig::default()
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 8080 },
            cors: CorsConfig {
                allowed_origins: vec!["corporate.staging.example.org".to_string()],
                local_mode: false,
            },
            api: ApiConfig::default(),
            auth: AuthConfig::default(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 8080 },
            cors: CorsConfig {
                allowed_origins: vec!["corporate.example.org".to_string()],
                local_mode: false,
            },
            api: ApiConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            v1_base_path: "/v3".to_string(),
            v2_base_path: "/v4".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            username_claim: "username".to_string(),
            email_claim: "email".to_string(),
            name_claim: "name".to_string(),
        }
    }
}
