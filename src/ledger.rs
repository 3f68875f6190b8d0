//! Stake arithmetic.
//!
//! All money decisions are pure functions over whole-dollar amounts;
//! cents exist only at the payment-processor boundary. Handlers and the
//! scheduler apply the results to the store, so every debit, refund, and
//! correction is decided in one place.

/// Per-failure penalty for a stake spread over `days`: the stake divided
/// evenly, rounded to the nearest dollar, never below one.
#[must_use]
pub fn penalty_for(stake: i64, days: i64) -> i64 {
    if days <= 0 {
        return stake.max(1);
    }
    let rounded = (stake + days / 2) / days;
    rounded.max(1)
}

/// What applying one failure does to the remaining stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Stake remaining after the debit, floored at zero.
    pub new_stake_remaining: i64,
    /// Amount actually forfeited, which is less than the penalty when
    /// the stake runs out.
    pub debited: i64,
    /// Whether the stake is exhausted and the commitment ends early.
    pub should_terminate: bool,
}

/// Debit one failure's penalty from the remaining stake.
#[must_use]
pub fn apply_failure(stake_remaining: i64, penalty: i64) -> FailureOutcome {
    let debited = penalty.min(stake_remaining).max(0);
    let new_stake_remaining = stake_remaining - debited;
    FailureOutcome {
        new_stake_remaining,
        debited,
        should_terminate: new_stake_remaining <= 0,
    }
}

/// How a finished commitment's stake is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundOutcome {
    /// Full stake intact: refund everything.
    Perfect,
    /// Some failures: refund what remains.
    Partial(i64),
    /// Stake exhausted: nothing to return.
    None,
}

/// Classify the refund owed when a commitment completes.
#[must_use]
pub fn classify_refund(original_stake: i64, stake_remaining: i64) -> RefundOutcome {
    if stake_remaining <= 0 {
        RefundOutcome::None
    } else if stake_remaining >= original_stake {
        RefundOutcome::Perfect
    } else {
        RefundOutcome::Partial(stake_remaining)
    }
}

/// Stake adjustment that reverses a verification.
///
/// Undoing a FAIL returns the debited amount; undoing a PASS moves no
/// money. The returned delta is applied to `stake_remaining`.
#[must_use]
pub fn undo_delta(was_fail: bool, debited: i64) -> i64 {
    if was_fail {
        debited
    } else {
        0
    }
}

/// Stake adjustment for an operator correction flipping a log's outcome.
///
/// Flipping FAIL to PASS restores the penalty; PASS to FAIL debits it.
/// A correction to the same outcome moves nothing.
#[must_use]
pub fn correction_delta(was_fail: bool, now_fail: bool, penalty: i64) -> i64 {
    match (was_fail, now_fail) {
        (true, false) => penalty,
        (false, true) => -penalty,
        _ => 0,
    }
}
