use super::{ConfigError, StatePaths};
use crate::shared::ChatId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
pub const DEFAULT_CURRENCY: &str = "RUB";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub state_root: PathBuf,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub staff: StaffConfig,
    #[serde(default)]
    pub business: BusinessConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_telegram_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StaffConfig {
    #[serde(default)]
    pub owner_chat_id: Option<ChatId>,
    #[serde(default)]
    pub group_chat_id: Option<ChatId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkHours {
    pub start: u32,
    pub end: u32,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self { start: 9, end: 17 }
    }
}

impl WorkHours {
    pub fn hours(self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    pub fn contains(self, hour: u32) -> bool {
        (self.start..=self.end).contains(&hour)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub work_hours: WorkHours,
    #[serde(default = "default_date_page_days")]
    pub date_page_days: u32,
    #[serde(default = "default_max_date_pages")]
    pub max_date_pages: u32,
    #[serde(default = "default_orders_per_page")]
    pub orders_per_page: u32,
    #[serde(default = "default_media_limit")]
    pub max_photos: usize,
    #[serde(default = "default_media_limit")]
    pub max_videos: usize,
    /// Phone shown on the contact screen for customers who prefer to call.
    #[serde(default)]
    pub contact_phone: Option<String>,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            work_hours: WorkHours::default(),
            date_page_days: default_date_page_days(),
            max_date_pages: default_max_date_pages(),
            orders_per_page: default_orders_per_page(),
            max_photos: default_media_limit(),
            max_videos: default_media_limit(),
            contact_phone: None,
        }
    }
}

impl BusinessConfig {
    pub fn tz(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            ConfigError::Settings(format!(
                "`business.timezone` `{}` is not a known IANA timezone",
                self.timezone
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub shop_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub return_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: String::new(),
            shop_id: String::new(),
            secret_key: String::new(),
            currency: default_currency(),
            return_url: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_date_page_days() -> u32 {
    7
}

fn default_max_date_pages() -> u32 {
    52
}

fn default_orders_per_page() -> u32 {
    10
}

fn default_media_limit() -> usize {
    30
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Minimal settings rooted at `state_root`, used by local runs and tests.
    pub fn with_state_root(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
            telegram: TelegramConfig::default(),
            staff: StaffConfig::default(),
            business: BusinessConfig::default(),
            payments: PaymentsConfig::default(),
        }
    }

    pub fn paths(&self) -> StatePaths {
        StatePaths::new(&self.state_root)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.state_root.is_absolute() {
            return Err(ConfigError::Settings(
                "`state_root` must be an absolute path".to_string(),
            ));
        }

        self.business.tz()?;
        let hours = self.business.work_hours;
        if hours.start >= hours.end || hours.end > 23 {
            return Err(ConfigError::Settings(format!(
                "`business.work_hours` must satisfy start < end <= 23, got {}..{}",
                hours.start, hours.end
            )));
        }
        for (field, value) in [
            ("business.date_page_days", self.business.date_page_days as usize),
            ("business.max_date_pages", self.business.max_date_pages as usize),
            ("business.orders_per_page", self.business.orders_per_page as usize),
            ("business.max_photos", self.business.max_photos),
            ("business.max_videos", self.business.max_videos),
        ] {
            if value == 0 {
                return Err(ConfigError::Settings(format!("`{field}` must be positive")));
            }
        }

        if self.telegram.api_base.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`telegram.api_base` must be non-empty".to_string(),
            ));
        }
        if self.telegram.poll_timeout_secs == 0 || self.telegram.request_timeout_secs == 0 {
            return Err(ConfigError::Settings(
                "telegram timeouts must be positive".to_string(),
            ));
        }

        if self.payments.enabled {
            for (field, value) in [
                ("payments.api_base", &self.payments.api_base),
                ("payments.shop_id", &self.payments.shop_id),
                ("payments.secret_key", &self.payments.secret_key),
                ("payments.currency", &self.payments.currency),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::Settings(format!(
                        "`{field}` is required when payments are enabled"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Checks the settings needed to talk to the chat platform.
    pub fn require_telegram_token(&self) -> Result<&str, ConfigError> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() {
            return Err(ConfigError::Settings(
                "`telegram.bot_token` is required to run the bot".to_string(),
            ));
        }
        Ok(token)
    }
}
