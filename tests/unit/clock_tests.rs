use chrono::{TimeZone, Utc};
use stakemate::clock::{local_date, local_hour, zone_or};

#[test]
fn unknown_zone_falls_back() {
    let tz = zone_or("Not/AZone", chrono_tz::America::Los_Angeles);
    assert_eq!(tz, chrono_tz::America::Los_Angeles);
    let tz = zone_or("America/New_York", chrono_tz::America::Los_Angeles);
    assert_eq!(tz, chrono_tz::America::New_York);
}

#[test]
fn local_hour_respects_the_zone() {
    // 2026-03-02 04:00 UTC is 20:00 the previous evening in LA (PST).
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).single().expect("valid");
    assert_eq!(local_hour(now, chrono_tz::America::Los_Angeles), 20);
    assert_eq!(local_hour(now, chrono_tz::UTC), 4);
}

#[test]
fn local_date_crosses_midnight() {
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).single().expect("valid");
    let date = local_date(now, chrono_tz::America::Los_Angeles);
    assert_eq!(date.to_string(), "2026-03-01");
    assert_eq!(local_date(now, chrono_tz::UTC).to_string(), "2026-03-02");
}
