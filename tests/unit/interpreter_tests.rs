use chrono::NaiveDate;
use stakemate::interpreter::{Interpreter, RuleInterpreter, SlotType, SlotValue};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 23).expect("valid date")
}

#[test]
fn amounts_embedded_in_chatter() {
    let interp = RuleInterpreter;
    assert_eq!(
        interp.interpret("let's say $25", SlotType::Amount, today()),
        Some(SlotValue::Amount(25))
    );
    assert_eq!(
        interp.interpret("how about 40 bucks", SlotType::Amount, today()),
        Some(SlotValue::Amount(40))
    );
    assert_eq!(
        interp.interpret("twenty bucks sounds right", SlotType::Amount, today()),
        Some(SlotValue::Amount(20))
    );
}

#[test]
fn amount_declines_without_a_shape() {
    let interp = RuleInterpreter;
    assert_eq!(interp.interpret("a lot", SlotType::Amount, today()), None);
    assert_eq!(
        interp.interpret("twenty", SlotType::Amount, today()),
        None,
        "bare number words without a money cue stay ambiguous"
    );
}

#[test]
fn durations_embedded_in_chatter() {
    let interp = RuleInterpreter;
    assert_eq!(
        interp.interpret("make it three weeks", SlotType::DurationDays, today()),
        Some(SlotValue::DurationDays(21))
    );
    assert_eq!(
        interp.interpret("let's do a month", SlotType::DurationDays, today()),
        Some(SlotValue::DurationDays(30))
    );
    assert_eq!(
        interp.interpret("forever", SlotType::DurationDays, today()),
        None
    );
}

#[test]
fn dates_embedded_in_chatter() {
    let interp = RuleInterpreter;
    assert_eq!(
        interp.interpret("how about next friday", SlotType::Date, today()),
        Some(SlotValue::Date(
            NaiveDate::from_ymd_opt(2026, 8, 28).expect("valid date")
        ))
    );
    assert_eq!(
        interp.interpret("by Sep 15 works", SlotType::Date, today()),
        Some(SlotValue::Date(
            NaiveDate::from_ymd_opt(2026, 9, 15).expect("valid date")
        ))
    );
    assert_eq!(
        interp.interpret("tomorrow", SlotType::Date, today()),
        Some(SlotValue::Date(
            NaiveDate::from_ymd_opt(2026, 8, 24).expect("valid date")
        ))
    );
}

#[test]
fn verdicts_embedded_in_chatter() {
    let interp = RuleInterpreter;
    assert_eq!(
        interp.interpret("yep they did", SlotType::YesNo, today()),
        Some(SlotValue::YesNo(true))
    );
    assert_eq!(
        interp.interpret("she totally did it", SlotType::YesNo, today()),
        Some(SlotValue::YesNo(true))
    );
    assert_eq!(
        interp.interpret("nah, they skipped it", SlotType::YesNo, today()),
        Some(SlotValue::YesNo(false))
    );
    assert_eq!(
        interp.interpret("nope, they didn't", SlotType::YesNo, today()),
        Some(SlotValue::YesNo(false)),
        "a negation next to a positive word still reads as a miss"
    );
    assert_eq!(interp.interpret("maybe?", SlotType::YesNo, today()), None);
}

#[test]
fn slots_do_not_cross_contaminate() {
    let interp = RuleInterpreter;
    // A date-shaped reply asked as an amount stays unparsed.
    assert_eq!(interp.interpret("next friday", SlotType::Amount, today()), None);
}
