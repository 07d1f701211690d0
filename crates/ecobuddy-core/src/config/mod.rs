use crate::error::{EcoError, Result};
use crate::store::CompletionPolicy;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcoConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub challenges: ChallengeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: String,
    /// Custom path for the SQLite backend. Defaults to `~/.config/ecobuddy/ecobuddy.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            path: None,
        }
    }
}

/// Hosted row store + auth service (PostgREST / GoTrue style).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub url: String,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            anon_key: None,
            env_var: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalConfig {
    /// Key-value mirror for client-side state. Defaults to `~/.config/ecobuddy/local.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    /// Fixed seed for tip selection. Unset means a fresh seed per process.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay_ms(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Grant the completion reward even when the challenge was never joined.
    #[serde(default = "default_true")]
    pub reward_inactive: bool,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            reward_inactive: true,
        }
    }
}

impl ChallengeConfig {
    pub fn completion_policy(&self) -> CompletionPolicy {
        if self.reward_inactive {
            CompletionPolicy::RewardAlways
        } else {
            CompletionPolicy::RequireActive
        }
    }
}

/// Valid backend kinds.
pub const VALID_BACKENDS: &[&str] = &["sqlite", "rest"];

/// Upper bound for the simulated assistant delay.
pub const MAX_REPLY_DELAY_MS: u64 = 30_000;

// -- Defaults --

fn default_backend_kind() -> String {
    "sqlite".to_string()
}
fn default_remote_url() -> String {
    "http://localhost:54321".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_web_port() -> u16 {
    5173
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_reply_delay_ms() -> u64 {
    1500
}
fn default_true() -> bool {
    true
}

impl EcoConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/ecobuddy/config.toml (global)
    /// 2. .ecobuddy/config.toml (project)
    /// 3. .ecobuddy/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".ecobuddy").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".ecobuddy").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| EcoError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| EcoError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            backend: BackendConfig::default(),
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            web: WebConfig::default(),
            chat: ChatConfig::default(),
            challenges: ChallengeConfig::default(),
        }
    }

    /// Lenient validation: fixes values in place and returns the warnings it logged.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_BACKENDS.contains(&self.backend.kind.as_str()) {
            warnings.push(format!(
                "unknown backend '{}', valid: {}, using {}",
                self.backend.kind,
                VALID_BACKENDS.join(", "),
                default_backend_kind()
            ));
            self.backend.kind = default_backend_kind();
        }

        if self.backend.kind == "rest" && self.remote.url.trim().is_empty() {
            warnings.push("backend.kind = rest but remote.url is empty".to_string());
        }

        if self.remote.timeout_secs == 0 {
            warnings.push("remote.timeout_secs = 0, setting to 1".to_string());
            self.remote.timeout_secs = 1;
        }

        if self.chat.reply_delay_ms > MAX_REPLY_DELAY_MS {
            warnings.push(format!(
                "chat.reply_delay_ms = {} exceeds {MAX_REPLY_DELAY_MS}, clamping",
                self.chat.reply_delay_ms
            ));
            self.chat.reply_delay_ms = MAX_REPLY_DELAY_MS;
        }

        if self.web.port == 0 {
            warnings.push(format!(
                "web.port = 0, setting to {}",
                default_web_port()
            ));
            self.web.port = default_web_port();
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Write this config as `.ecobuddy/config.toml` under `dir`, creating the directory.
    pub fn write_project(&self, dir: &Path) -> Result<PathBuf> {
        let config_dir = dir.join(".ecobuddy");
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| EcoError::Config(format!("failed to create config dir: {e}")))?;
        let path = config_dir.join("config.toml");
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| EcoError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(&path, toml_str)
            .map_err(|e| EcoError::Config(format!("failed to write config: {e}")))?;
        Ok(path)
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// `~/.config/ecobuddy`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ecobuddy"))
}

/// Resolve the anon key for the hosted backend.
///
/// Priority: explicit config value → custom env var → `ECOBUDDY_ANON_KEY`.
pub fn resolve_anon_key(config: &RemoteConfig) -> Result<String> {
    if let Some(ref key) = config.anon_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }

    if let Some(ref var) = config.env_var {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                return Ok(key);
            }
        }
    }

    std::env::var("ECOBUDDY_ANON_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            EcoError::Config(
                "rest backend requires remote.anon_key, remote.env_var or ECOBUDDY_ANON_KEY"
                    .to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EcoConfig::default_config();
        assert_eq!(config.backend.kind, "sqlite");
        assert_eq!(config.web.port, 5173);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.chat.reply_delay_ms, 1500);
        assert!(config.chat.seed.is_none());
        assert!(config.challenges.reward_inactive);
    }

    #[test]
    fn test_load_config_no_files() {
        let dir = std::env::temp_dir().join(format!("ecobuddy-cfg-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = EcoConfig::load(Some(&dir));
        assert!(config.is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[backend]
kind = "rest"

[chat]
seed = 7
"#;
        let config: EcoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.kind, "rest");
        assert_eq!(config.chat.seed, Some(7));
        assert_eq!(config.chat.reply_delay_ms, 1500);
        assert_eq!(config.remote.url, "http://localhost:54321");
        assert_eq!(config.web.port, 5173);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = EcoConfig::default_config();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: EcoConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.backend.kind, config.backend.kind);
        assert_eq!(parsed.web.port, config.web.port);
    }

    #[test]
    fn test_validate_default_config_no_warnings() {
        let mut config = EcoConfig::default_config();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_unknown_backend() {
        let mut config = EcoConfig::default_config();
        config.backend.kind = "mongo".to_string();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mongo"));
        assert_eq!(config.backend.kind, default_backend_kind());
        // a second pass has nothing left to fix
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_load_resets_unknown_backend() {
        let tmp = std::env::temp_dir().join(format!("ecobuddy-mongo-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(tmp.join(".ecobuddy")).unwrap();
        std::fs::write(
            tmp.join(".ecobuddy").join("config.toml"),
            "[backend]\nkind = \"mongo\"\n",
        )
        .unwrap();

        let config = EcoConfig::load(Some(&tmp)).unwrap();
        assert_eq!(config.backend.kind, "sqlite");
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut config = EcoConfig::default_config();
        config.chat.reply_delay_ms = 120_000;
        config.remote.timeout_secs = 0;
        config.web.port = 0;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert_eq!(config.chat.reply_delay_ms, MAX_REPLY_DELAY_MS);
        assert_eq!(config.remote.timeout_secs, 1);
        assert_eq!(config.web.port, 5173);
    }

    #[test]
    fn test_completion_policy_from_config() {
        let mut challenges = ChallengeConfig::default();
        assert_eq!(challenges.completion_policy(), CompletionPolicy::RewardAlways);
        challenges.reward_inactive = false;
        assert_eq!(
            challenges.completion_policy(),
            CompletionPolicy::RequireActive
        );
    }

    #[test]
    fn test_resolve_anon_key_explicit() {
        let config = RemoteConfig {
            anon_key: Some("anon-123".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_anon_key(&config).unwrap(), "anon-123");
    }

    #[test]
    fn test_write_project_then_load() {
        let dir = std::env::temp_dir().join(format!("ecobuddy-init-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = EcoConfig::default_config();
        config.web.port = 8088;
        let path = config.write_project(&dir).unwrap();
        assert!(path.ends_with(".ecobuddy/config.toml"));

        let loaded = EcoConfig::load(Some(&dir)).unwrap();
        assert_eq!(loaded.web.port, 8088);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
