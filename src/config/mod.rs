pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_global_settings, load_settings};
pub use paths::{
    default_global_config_path, StatePaths, GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use settings::{
    BusinessConfig, PaymentsConfig, Settings, StaffConfig, TelegramConfig, WorkHours,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ChatId;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn minimal_settings_fill_business_defaults() {
        let settings: Settings = serde_yaml::from_str(
            r#"
state_root: /tmp/haulbot
"#,
        )
        .expect("parse settings");

        assert_eq!(settings.business.timezone, "Europe/Moscow");
        assert_eq!(settings.business.work_hours, WorkHours { start: 9, end: 17 });
        assert_eq!(settings.business.date_page_days, 7);
        assert_eq!(settings.business.max_date_pages, 52);
        assert_eq!(settings.business.orders_per_page, 10);
        assert_eq!(settings.business.max_photos, 30);
        assert_eq!(settings.business.max_videos, 30);
        assert_eq!(settings.payments.currency, "RUB");
        assert!(!settings.payments.enabled);
        settings.validate().expect("defaults validate");
    }

    #[test]
    fn staff_chat_ids_parse_as_numbers() {
        let settings: Settings = serde_yaml::from_str(
            r#"
state_root: /tmp/haulbot
staff:
  owner_chat_id: 1001
  group_chat_id: -100200300
"#,
        )
        .expect("parse settings");
        assert_eq!(settings.staff.owner_chat_id, Some(ChatId::new(1001)));
        assert_eq!(settings.staff.group_chat_id, Some(ChatId::new(-100200300)));
    }

    #[test]
    fn validation_rejects_relative_state_root() {
        let settings = Settings::with_state_root("relative/state");
        let err = settings.validate().expect_err("relative root must fail");
        match err {
            ConfigError::Settings(message) => assert!(message.contains("state_root")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_rejects_unknown_timezone_and_inverted_hours() {
        let mut settings = Settings::with_state_root("/tmp/haulbot");
        settings.business.timezone = "Mars/Olympus".to_string();
        let err = settings.validate().expect_err("timezone must fail");
        assert!(err.to_string().contains("Mars/Olympus"));

        let mut settings = Settings::with_state_root("/tmp/haulbot");
        settings.business.work_hours = WorkHours { start: 18, end: 9 };
        let err = settings.validate().expect_err("hours must fail");
        assert!(err.to_string().contains("work_hours"));
    }

    #[test]
    fn enabled_payments_require_credentials() {
        let settings: Settings = serde_yaml::from_str(
            r#"
state_root: /tmp/haulbot
payments:
  enabled: true
  api_base: https://payments.example.test/v3
  shop_id: "123"
"#,
        )
        .expect("parse settings");
        let err = settings.validate().expect_err("missing secret must fail");
        assert!(err.to_string().contains("payments.secret_key"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_yaml::from_str::<Settings>(
            r#"
state_root: /tmp/haulbot
business:
  timezone: Europe/Moscow
  weekend_surcharge: 10
"#,
        )
        .expect_err("unknown field must fail");
        assert!(err.to_string().contains("weekend_surcharge"));
    }

    #[test]
    fn telegram_token_is_required_to_run() {
        let settings = Settings::with_state_root("/tmp/haulbot");
        assert!(settings.require_telegram_token().is_err());

        let mut settings = settings;
        settings.telegram.bot_token = "123:abc".to_string();
        assert_eq!(settings.require_telegram_token().expect("token"), "123:abc");
    }

    #[test]
    fn state_paths_bootstrap_creates_layout() {
        let temp = tempdir().expect("temp dir");
        let paths = StatePaths::new(temp.path().join("state"));
        paths.bootstrap().expect("bootstrap");
        assert!(paths.sessions_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
        assert_eq!(
            paths.orders_db_path(),
            temp.path().join("state/orders.sqlite3")
        );
    }

    #[test]
    fn load_global_settings_reads_haulbot_config_yaml() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let temp = tempdir().expect("temp dir");
        fs::create_dir_all(temp.path().join(".haulbot")).expect("create config dir");
        let config_path = temp.path().join(".haulbot/config.yaml");
        fs::write(
            &config_path,
            format!(
                "state_root: {}\nstaff:\n  owner_chat_id: 7\n",
                temp.path().join("state").display()
            ),
        )
        .expect("write config");

        let old_home = std::env::var_os("HOME");
        std::env::set_var("HOME", temp.path());
        let loaded = load_global_settings();
        if let Some(value) = old_home {
            std::env::set_var("HOME", value);
        } else {
            std::env::remove_var("HOME");
        }

        let settings = loaded.expect("load settings");
        assert_eq!(settings.staff.owner_chat_id, Some(ChatId::new(7)));
    }
}
