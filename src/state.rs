//! Shared application state.

use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::gateways::{PaymentGateway, SmsGateway};
use crate::interpreter::Interpreter;
use crate::persistence::commitment_repo::CommitmentRepo;
use crate::persistence::db::Database;
use crate::persistence::judge_repo::JudgeRepo;
use crate::persistence::log_repo::LogRepo;
use crate::persistence::menu_repo::MenuRepo;
use crate::persistence::payout_repo::PayoutRepo;
use crate::persistence::setup_repo::SetupRepo;
use crate::persistence::undo_repo::UndoRepo;
use crate::persistence::verify_repo::VerifyRepo;
use crate::util::expiring::ExpiringCounter;

/// Everything a handler or background task needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GlobalConfig>,
    /// SQLite connection pool.
    pub db: Arc<Database>,
    /// Outbound SMS delivery.
    pub sms: Arc<dyn SmsGateway>,
    /// Payment processor.
    pub payments: Arc<dyn PaymentGateway>,
    /// Loose-text fallback for setup replies.
    pub interpreter: Arc<dyn Interpreter>,
    /// Signup rate limiter keyed by client IP.
    pub signup_limiter: Arc<ExpiringCounter>,
}

impl AppState {
    /// Assemble state from its parts.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        db: Arc<Database>,
        sms: Arc<dyn SmsGateway>,
        payments: Arc<dyn PaymentGateway>,
        interpreter: Arc<dyn Interpreter>,
    ) -> Self {
        let signup_limiter = Arc::new(ExpiringCounter::new(60));
        Self {
            config,
            db,
            sms,
            payments,
            interpreter,
            signup_limiter,
        }
    }

    /// Commitment repository over the shared pool.
    #[must_use]
    pub fn commitments(&self) -> CommitmentRepo {
        CommitmentRepo::new(Arc::clone(&self.db))
    }

    /// Judge relationship repository.
    #[must_use]
    pub fn judges(&self) -> JudgeRepo {
        JudgeRepo::new(Arc::clone(&self.db))
    }

    /// Daily log repository.
    #[must_use]
    pub fn logs(&self) -> LogRepo {
        LogRepo::new(Arc::clone(&self.db))
    }

    /// Setup dialogue session repository.
    #[must_use]
    pub fn setups(&self) -> SetupRepo {
        SetupRepo::new(Arc::clone(&self.db))
    }

    /// Payout ledger repository.
    #[must_use]
    pub fn payouts(&self) -> PayoutRepo {
        PayoutRepo::new(Arc::clone(&self.db))
    }

    /// Undo window repository.
    #[must_use]
    pub fn undos(&self) -> UndoRepo {
        UndoRepo::new(Arc::clone(&self.db))
    }

    /// Judge menu session repository.
    #[must_use]
    pub fn menus(&self) -> MenuRepo {
        MenuRepo::new(Arc::clone(&self.db))
    }

    /// Dashboard verification code repository.
    #[must_use]
    pub fn verify_codes(&self) -> VerifyRepo {
        VerifyRepo::new(Arc::clone(&self.db))
    }
}
