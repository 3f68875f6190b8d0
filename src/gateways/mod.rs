//! Outbound service gateways.
//!
//! SMS delivery and payment processing sit behind traits so handlers
//! and the scheduler stay testable without network access. Production
//! wiring uses Twilio and Stripe; the in-memory doubles live alongside
//! for the integration tests.

pub mod payment;
pub mod sms;

pub use payment::{FakePayments, PaymentGateway, PaymentIntent, StripeGateway};
pub use sms::{RecordingSms, SmsGateway, TwilioGateway};
