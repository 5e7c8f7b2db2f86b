use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/app_config.toml";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";
const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_DOWNLOADS_DIR: &str = "downloads";
const DEFAULT_STAGGER_MS: u64 = 400;
const DEFAULT_USER_STORE: &str = "data/users.json";
const DEFAULT_ADMIN_USERNAME: &str = "admin";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    /// `None` leaves calls unbounded.
    pub request_timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct DownloadsConfig {
    pub dir: PathBuf,
    pub stagger: Duration,
}

#[derive(Clone, Debug)]
pub struct UsersConfig {
    pub store_path: PathBuf,
    pub admin_username: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub downloads: DownloadsConfig,
    pub users: UsersConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            env::var("APP_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Reads `path` (if present) with `TRYON__*` environment overrides on top.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("TRYON")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to read configuration {:?}", path))?;

        let file_config: FileConfig = settings
            .try_deserialize()
            .with_context(|| format!("failed to parse configuration {:?}", path))?;

        Ok(Self {
            gemini: file_config.gemini.unwrap_or_default().into_domain(),
            downloads: file_config.downloads.unwrap_or_default().into_domain(),
            users: file_config.users.unwrap_or_default().into_domain(),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    gemini: Option<FileGeminiConfig>,
    #[serde(default)]
    downloads: Option<FileDownloadsConfig>,
    #[serde(default)]
    users: Option<FileUsersConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct FileGeminiConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    request_timeout_seconds: Option<u64>,
}

impl FileGeminiConfig {
    fn into_domain(self) -> GeminiConfig {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env::var("GEMINI_API_KEY").ok());

        GeminiConfig {
            api_key,
            model: self
                .model
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            request_timeout: self
                .request_timeout_seconds
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileDownloadsConfig {
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    stagger_ms: Option<u64>,
}

impl FileDownloadsConfig {
    fn into_domain(self) -> DownloadsConfig {
        let dir = if let Some(dir) = self.dir {
            PathBuf::from(dir)
        } else if let Ok(dir) = env::var("DOWNLOADS_DIR") {
            PathBuf::from(dir)
        } else {
            PathBuf::from(DEFAULT_DOWNLOADS_DIR)
        };

        DownloadsConfig {
            dir,
            stagger: Duration::from_millis(self.stagger_ms.unwrap_or(DEFAULT_STAGGER_MS)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileUsersConfig {
    #[serde(default)]
    store_path: Option<String>,
    #[serde(default)]
    admin_username: Option<String>,
}

impl FileUsersConfig {
    fn into_domain(self) -> UsersConfig {
        UsersConfig {
            store_path: self
                .store_path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_USER_STORE)),
            admin_username: self
                .admin_username
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
        }
    }
}
