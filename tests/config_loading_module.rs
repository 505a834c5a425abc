use haulbot::config::{load_settings, ConfigError, Settings};
use std::fs;
use tempfile::tempdir;

#[test]
fn load_settings_reads_and_validates_yaml() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("config.yaml");
    fs::write(
        &path,
        format!(
            r#"
state_root: {}
telegram:
  bot_token: "123:abc"
business:
  timezone: Asia/Yekaterinburg
  work_hours:
    start: 8
    end: 20
  contact_phone: "+79990000000"
"#,
            temp.path().join("state").display()
        ),
    )
    .expect("write config");

    let settings = load_settings(&path).expect("load");
    assert_eq!(settings.business.timezone, "Asia/Yekaterinburg");
    assert_eq!(settings.business.work_hours.hours().count(), 13);
    assert_eq!(settings.business.contact_phone.as_deref(), Some("+79990000000"));
    assert_eq!(settings.require_telegram_token().expect("token"), "123:abc");
}

#[test]
fn invalid_files_report_their_path() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("config.yaml");
    fs::write(&path, "state_root: [unclosed").expect("write config");
    match load_settings(&path).expect_err("bad yaml") {
        ConfigError::Parse { path: reported, .. } => {
            assert!(reported.ends_with("config.yaml"))
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let missing = temp.path().join("missing.yaml");
    assert!(matches!(
        load_settings(&missing),
        Err(ConfigError::Read { .. })
    ));
}

#[test]
fn zero_page_sizes_fail_validation() {
    let temp = tempdir().expect("tempdir");
    let mut settings = Settings::with_state_root(temp.path());
    settings.business.orders_per_page = 0;
    assert!(settings.validate().is_err());
}
