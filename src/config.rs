use anyhow::{anyhow, bail, Context};
use homedir::my_home;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    scrape::{FetchOptions, USER_AGENT_DEFAULT},
    snapshot::{types, ExtractOptions, RetryPolicy},
    storage::{BackendLocal, StorageManager},
};

const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_API_BASE: &str = "https://sarahgiggar.com";
const DEFAULT_API_TIMEOUT_SECS: u64 = 20;
/// How long the popup waits for the content side before asking for a refresh
const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 2500;

/// Base directory for config and session: `$WCAP_BASE_PATH` or
/// `~/.local/share/wcap`.
pub fn base_path() -> anyhow::Result<String> {
    if let Ok(path) = std::env::var("WCAP_BASE_PATH") {
        return Ok(path);
    }
    let home = my_home()
        .map_err(|err| anyhow!("could not determine home directory: {err:?}"))?
        .context("home directory path is empty")?;
    Ok(format!("{}/.local/share/wcap", home.to_string_lossy()))
}

/// Which quick-add route the admin API is reached on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// `/api/admin/wardrobe-library/quick-add`
    #[default]
    Library,
    /// `/api/wardrobe/quick-add`, kept for older deployments
    Legacy,
}

impl Endpoint {
    pub fn quick_add_path(&self) -> &'static str {
        match self {
            Endpoint::Library => "/api/admin/wardrobe-library/quick-add",
            Endpoint::Legacy => "/api/wardrobe/quick-add",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default)]
    pub endpoint: Endpoint,
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            endpoint: Endpoint::default(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_api_timeout_secs() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_delay_step_ms")]
    pub delay_step_ms: u64,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    #[serde(default = "default_min_image_px")]
    pub min_image_px: u32,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// HTTP attempts per page or image fetch
    #[serde(default = "default_page_fetch_attempts")]
    pub page_fetch_attempts: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            delay_step_ms: default_delay_step_ms(),
            message_timeout_ms: default_message_timeout_ms(),
            max_images: default_max_images(),
            min_image_px: default_min_image_px(),
            default_currency: default_currency(),
            page_fetch_attempts: default_page_fetch_attempts(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_base_delay_ms() -> u64 {
    RetryPolicy::default().base_delay.as_millis() as u64
}

fn default_delay_step_ms() -> u64 {
    RetryPolicy::default().step.as_millis() as u64
}

fn default_message_timeout_ms() -> u64 {
    DEFAULT_MESSAGE_TIMEOUT_MS
}

fn default_max_images() -> usize {
    types::MAX_IMAGES
}

fn default_min_image_px() -> u32 {
    types::MIN_IMAGE_PX
}

fn default_currency() -> String {
    types::DEFAULT_CURRENCY.to_string()
}

fn default_page_fetch_attempts() -> u32 {
    FetchOptions::default().attempts
}

fn default_user_agent() -> String {
    USER_AGENT_DEFAULT.to_string()
}

impl ExtractionConfig {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_images: self.max_images,
            min_image_px: self.min_image_px,
            default_currency: self.default_currency.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            step: Duration::from_millis(self.delay_step_ms),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            user_agent: self.user_agent.clone(),
            attempts: self.page_fetch_attempts,
            ..Default::default()
        }
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if url::Url::parse(&self.api.base_url).is_err() {
            bail!("api.base_url is not a valid URL: {:?}", self.api.base_url);
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than 0");
        }

        let ex = &self.extraction;
        if ex.max_attempts == 0 {
            bail!("extraction.max_attempts must be greater than 0");
        }
        if ex.max_images == 0 {
            bail!("extraction.max_images must be greater than 0");
        }
        if ex.page_fetch_attempts == 0 {
            bail!("extraction.page_fetch_attempts must be greater than 0");
        }
        if ex.message_timeout_ms == 0 {
            bail!("extraction.message_timeout_ms must be greater than 0");
        }
        if ex.default_currency.trim().is_empty() {
            bail!("extraction.default_currency must not be empty");
        }

        Ok(())
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(&base_path()?)
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = BackendLocal::new(base_path)
            .with_context(|| format!("creating {base_path}"))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store
                .write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())
                .context("writing default config")?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE)?)
            .context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        if let Ok(api_base) = std::env::var("WCAP_API_BASE") {
            config.api.base_url = api_base;
            config.validate()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store
            .write(CONFIG_FILE, config_str.as_bytes())
            .context("writing config")?;
        Ok(())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}
