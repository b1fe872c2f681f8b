//! CLI configuration.
//!
//! Reads/writes TOML at `~/.config/realtyfeed/cli.toml`. The file holds the
//! bearer token, so it is written with `0600` permissions.

use std::path::{Path, PathBuf};

use realtyfeed_composer::ComposeConfig;
use realtyfeed_feed_sync::ToggleFailurePolicy;
use realtyfeed_protocol::Author;
use serde::{Deserialize, Serialize};

const DEFAULT_API_URL: &str = "https://api.realtyfeed.com/api/v1";

/// Signed-in user, used as the author of new posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Media limits and compression targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSection {
    pub compress: bool,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub max_video_mb: u64,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            compress: true,
            max_dimension: 1920,
            jpeg_quality: 80,
            max_video_mb: 20,
        }
    }
}

/// On toggle failure: `"rollback"` or `"keep"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleFailure {
    #[default]
    Rollback,
    Keep,
}

/// On-disk format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    api_url: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    toggle_failure: ToggleFailure,
    #[serde(default)]
    profile: Profile,
    #[serde(default)]
    media: MediaSection,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_url: String,
    pub token: String,
    pub toggle_failure: ToggleFailure,
    pub profile: Profile,
    pub media: MediaSection,
    file_path: PathBuf,
}

impl CliConfig {
    /// Loads the config from the platform location, writing a default file
    /// on first run, then applies environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_file_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads the config at `path`, creating it with defaults when missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::with_defaults(path.to_path_buf());

        if !path.exists() {
            config.save()?;
            tracing::info!(path = %path.display(), "default configuration written");
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                if !file.api_url.is_empty() {
                    config.api_url = file.api_url;
                }
                config.token = file.token;
                config.toggle_failure = file.toggle_failure;
                config.profile = file.profile;
                config.media = file.media;
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse configuration, using defaults"
                );
            }
        }
        Ok(config)
    }

    fn with_defaults(file_path: PathBuf) -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            token: String::new(),
            toggle_failure: ToggleFailure::default(),
            profile: Profile::default(),
            media: MediaSection::default(),
            file_path,
        }
    }

    /// `REALTYFEED_TOKEN` and `REALTYFEED_API_URL` win over the file.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("REALTYFEED_TOKEN").filter(|v| !v.is_empty()) {
            self.token = token;
        }
        if let Some(url) = var("REALTYFEED_API_URL").filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = ConfigFile {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
            toggle_failure: self.toggle_failure,
            profile: self.profile.clone(),
            media: self.media.clone(),
        };

        std::fs::write(&self.file_path, toml::to_string_pretty(&file)?)?;
        set_permissions_0600(&self.file_path);

        tracing::debug!("configuration saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn author(&self) -> anyhow::Result<Author> {
        if self.profile.id.is_empty() {
            anyhow::bail!(
                "profile.id is not set in {}; it is needed to author posts",
                self.file_path.display()
            );
        }
        Ok(Author {
            id: self.profile.id.clone(),
            name: self.profile.name.clone(),
            avatar_url: None,
        })
    }

    pub fn toggle_policy(&self) -> ToggleFailurePolicy {
        match self.toggle_failure {
            ToggleFailure::Rollback => ToggleFailurePolicy::Rollback,
            ToggleFailure::Keep => ToggleFailurePolicy::KeepOptimistic,
        }
    }

    pub fn compose_config(&self) -> ComposeConfig {
        let mut config = ComposeConfig::default();
        config.compression.enabled = self.media.compress;
        config.compression.max_dimension = self.media.max_dimension;
        config.compression.jpeg_quality = self.media.jpeg_quality.clamp(1, 100);
        config.policy.max_video_bytes = Some(self.media.max_video_mb.saturating_mul(1024 * 1024));
        config
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn config_file_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("realtyfeed").join("cli.toml"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| anyhow::anyhow!("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
