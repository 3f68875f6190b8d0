use stakemate::gateways::payment::{sign_webhook_payload, verify_webhook_signature};

const SECRET: &str = "whsec_test_secret";
const PAYLOAD: &[u8] = br#"{"type":"payment_intent.succeeded"}"#;

#[test]
fn valid_signature_is_accepted() {
    let now = 1_756_000_000;
    let header = sign_webhook_payload(SECRET, PAYLOAD, now);
    assert!(verify_webhook_signature(SECRET, &header, PAYLOAD, now));
}

#[test]
fn tampered_payload_is_rejected() {
    let now = 1_756_000_000;
    let header = sign_webhook_payload(SECRET, PAYLOAD, now);
    assert!(!verify_webhook_signature(
        SECRET,
        &header,
        br#"{"type":"payment_intent.succeeded","amount":1}"#,
        now
    ));
}

#[test]
fn wrong_secret_is_rejected() {
    let now = 1_756_000_000;
    let header = sign_webhook_payload(SECRET, PAYLOAD, now);
    assert!(!verify_webhook_signature("whsec_other", &header, PAYLOAD, now));
}

#[test]
fn stale_timestamps_are_rejected() {
    let signed_at = 1_756_000_000;
    let header = sign_webhook_payload(SECRET, PAYLOAD, signed_at);
    // Five minutes is the tolerance; six is too old.
    assert!(verify_webhook_signature(SECRET, &header, PAYLOAD, signed_at + 299));
    assert!(!verify_webhook_signature(SECRET, &header, PAYLOAD, signed_at + 360));
}

#[test]
fn malformed_headers_are_rejected() {
    let now = 1_756_000_000;
    assert!(!verify_webhook_signature(SECRET, "", PAYLOAD, now));
    assert!(!verify_webhook_signature(SECRET, "t=abc,v1=00", PAYLOAD, now));
    assert!(!verify_webhook_signature(SECRET, "v1=deadbeef", PAYLOAD, now));
}
