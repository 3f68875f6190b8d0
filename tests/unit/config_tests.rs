use stakemate::GlobalConfig;

const TAIL: &str = r#"
[twilio]
account_sid = "ACtest"
from_number = "+15550000000"
"#;

/// Minimal valid config with optional extra top-level lines inserted
/// before the `[twilio]` table.
fn toml_with(extra: &str) -> String {
    format!(
        "app_url = \"https://stake.test\"\nadmin_phone = \"+15550000001\"\n{extra}\n{TAIL}"
    )
}

#[test]
fn minimal_config_gets_defaults() {
    let config = GlobalConfig::from_toml_str(&toml_with("")).expect("valid config");
    assert_eq!(config.http_port, 3000);
    assert_eq!(config.default_timezone, "America/Los_Angeles");
    assert_eq!(config.schedule.check_in_hour, 20);
    assert_eq!(config.schedule.first_reminder_offset_hours, 2);
    assert_eq!(config.schedule.second_reminder_hour, 9);
    assert_eq!(config.schedule.timeout_hour, 12);
    assert_eq!(config.undo_window_minutes, 5);
    assert_eq!(config.code_expiry_minutes, 10);
    assert_eq!(config.max_signups_per_hour, 3);
    assert!(config.whitelisted_phones.is_empty());
}

#[test]
fn secrets_never_come_from_toml() {
    let toml = format!("{}\n[stripe]\nsecret_key = \"sk_live_leaked\"\n", toml_with(""));
    // serde(skip) drops the field rather than reading it.
    let config = GlobalConfig::from_toml_str(&toml).expect("valid config");
    assert!(config.stripe.secret_key.is_empty());
    assert!(config.twilio.auth_token.is_empty());
}

#[test]
fn empty_app_url_is_rejected() {
    let toml = toml_with("").replace("https://stake.test", "");
    assert!(GlobalConfig::from_toml_str(&toml).is_err());
}

#[test]
fn out_of_range_hours_are_rejected() {
    let toml = format!("{}\n[schedule]\ncheck_in_hour = 24\n", toml_with(""));
    assert!(GlobalConfig::from_toml_str(&toml).is_err());
}

#[test]
fn bad_timezone_is_rejected() {
    let toml = toml_with("default_timezone = \"Mars/Olympus\"");
    assert!(GlobalConfig::from_toml_str(&toml).is_err());
}

#[test]
fn whitelist_and_admin_checks() {
    let toml = toml_with("whitelisted_phones = [\"+15559990000\"]");
    let config = GlobalConfig::from_toml_str(&toml).expect("valid config");
    assert!(config.is_whitelisted("+15559990000"));
    assert!(!config.is_whitelisted("+15550000001"));
    assert!(config.is_admin("+15550000001"));
    assert!(!config.is_admin("+15559990000"));
}
