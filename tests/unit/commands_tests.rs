use stakemate::parse::commands::{recognize, Command};

#[test]
fn commands_are_case_insensitive() {
    assert_eq!(recognize("start"), Some(Command::Start));
    assert_eq!(recognize("START"), Some(Command::Start));
    assert_eq!(recognize("  Status "), Some(Command::Status));
}

#[test]
fn reset_synonyms() {
    assert_eq!(recognize("RESET"), Some(Command::Reset));
    assert_eq!(recognize("cancel"), Some(Command::Reset));
    assert_eq!(recognize("nevermind"), Some(Command::Reset));
}

#[test]
fn help_synonyms() {
    assert_eq!(recognize("HELP"), Some(Command::Help));
    assert_eq!(recognize("how"), Some(Command::Help));
    assert_eq!(recognize("info"), Some(Command::Help));
}

#[test]
fn free_text_is_not_a_command() {
    assert_eq!(recognize("I want to start"), None);
    assert_eq!(recognize("yes"), None);
    assert_eq!(recognize(""), None);
}

#[test]
fn judge_and_admin_commands() {
    assert_eq!(recognize("MENU"), Some(Command::Menu));
    assert_eq!(recognize("undo"), Some(Command::Undo));
    assert_eq!(recognize("Admin"), Some(Command::Admin));
    assert_eq!(recognize("HISTORY"), Some(Command::History));
}
