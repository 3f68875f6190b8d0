//! Commitment lifecycle transitions: finalization after payment,
//! termination, and refunds.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::clock;
use crate::gateways::sms::send_best_effort;
use crate::ledger::{self, RefundOutcome};
use crate::models::commitment::{Commitment, CommitmentType, RefundStatus};
use crate::models::daily_log::DailyLog;
use crate::models::judge::JudgeRecord;
use crate::state::AppState;
use crate::Result;

/// Why a commitment is being terminated, for the committer's summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Every penalty has been debited.
    StakeDepleted,
    /// The final day passed with all logs resolved.
    Elapsed,
    /// Deadline commitment verified as met.
    DeadlineMet,
    /// Deadline commitment verified as missed.
    DeadlineMissed,
}

/// Finalize a setup whose payment intent just succeeded.
///
/// Builds the commitment in `awaiting_judge`, creates the pending judge
/// relationship, deletes the dialogue session, and notifies both
/// parties. A redelivered webhook finds no session, or finds the
/// commitment already funded by this intent, and is a no-op.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure. Incomplete sessions
/// (no staked terms) are logged and dropped rather than surfaced, since
/// the webhook caller cannot do anything about them.
pub async fn finalize_paid_intent(state: &AppState, intent_id: &str) -> Result<()> {
    let Some(session) = state.setups().get_by_intent(intent_id).await? else {
        info!(intent_id, "no setup session for intent; webhook ignored");
        return Ok(());
    };

    // A retry can arrive after the commitment was created but before the
    // session was cleaned up. Finish the cleanup instead of funding twice.
    if state.commitments().get_by_intent(intent_id).await?.is_some() {
        info!(intent_id, "intent already finalized; clearing stale session");
        state.setups().delete(&session.phone).await?;
        return Ok(());
    }

    let (Some(commitment_text), Some(commitment_type), Some(stake), Some(judge_phone)) = (
        session.temp_commitment.clone(),
        session.temp_commitment_type,
        session.temp_stake_amount,
        session.temp_judge_phone.clone(),
    ) else {
        warn!(intent_id, phone = %session.phone, "paid session missing staged terms; dropping");
        state.setups().delete(&session.phone).await?;
        return Ok(());
    };

    let tz = clock::zone_or(
        &session.temp_timezone,
        state
            .config
            .default_timezone
            .parse()
            .unwrap_or(chrono_tz::America::Los_Angeles),
    );
    let today = clock::local_date(Utc::now(), tz);

    // Daily commitments start tomorrow so the first full day is judged;
    // deadline commitments run from today through the deadline.
    let (start_date, end_date, deadline_date, penalty) = match commitment_type {
        CommitmentType::Daily => {
            let duration = session.temp_duration_days.unwrap_or(1).max(1);
            let start = today + chrono::Days::new(1);
            let end = start + chrono::Days::new(duration.unsigned_abs().saturating_sub(1));
            (start, end, None, session.temp_penalty.unwrap_or(stake))
        }
        CommitmentType::Deadline => {
            let deadline = session.temp_deadline_date.unwrap_or(today);
            (today, deadline, Some(deadline), stake)
        }
    };

    let judge_name = session
        .temp_judge_name
        .clone()
        .unwrap_or_else(|| "your judge".to_owned());
    let commitment = Commitment::new(
        session.phone.clone(),
        session.temp_name.clone(),
        commitment_text.clone(),
        commitment_type,
        session.temp_timezone.clone(),
        start_date,
        end_date,
        deadline_date,
        stake,
        penalty,
        judge_phone.clone(),
        judge_name.clone(),
        intent_id.to_owned(),
    );
    let commitment = state.commitments().create(&commitment).await?;
    state
        .judges()
        .create(&JudgeRecord::new(judge_phone.clone(), commitment.id.clone()))
        .await?;
    state.setups().delete(&session.phone).await?;

    info!(commitment_id = %commitment.id, phone = %commitment.phone, "commitment funded");

    let committer_name = commitment.name.clone().unwrap_or_else(|| "A friend".to_owned());
    send_best_effort(
        state.sms.as_ref(),
        &commitment.phone,
        &format!(
            "Payment received! I've asked {judge_name} to be your judge. \
             Your commitment starts once they accept."
        ),
    )
    .await;
    let terms = match commitment_type {
        CommitmentType::Daily => format!(
            "You'd get a daily check-in text for {} days.",
            (end_date - start_date).num_days() + 1
        ),
        CommitmentType::Deadline => format!("You'd confirm once, on {end_date}."),
    };
    send_best_effort(
        state.sms.as_ref(),
        &judge_phone,
        &format!(
            "{committer_name} committed to \"{commitment_text}\" with ${stake} on the line \
             and named you as their judge. {terms} Reply YES to accept or NO to decline."
        ),
    )
    .await;

    Ok(())
}

/// Issue the refund a finished commitment is owed and record the result.
///
/// A gateway failure is recorded as `refund_status = failed` with the
/// error text and never propagated: the commitment stays completed and
/// the daily report surfaces the stuck refund for manual follow-up.
pub async fn issue_refund(state: &AppState, commitment: &Commitment) {
    let outcome = ledger::classify_refund(commitment.original_stake, commitment.stake_remaining);
    let amount = match outcome {
        RefundOutcome::Perfect => commitment.original_stake,
        RefundOutcome::Partial(amount) => amount,
        RefundOutcome::None => {
            if let Err(err) = state
                .commitments()
                .set_refund(&commitment.id, RefundStatus::NoRefund, 0, None)
                .await
            {
                error!(commitment_id = %commitment.id, %err, "failed to record no-refund");
            }
            return;
        }
    };

    let Some(intent_id) = commitment.payment_intent_id.as_deref() else {
        error!(commitment_id = %commitment.id, "refund owed but no payment intent on record");
        return;
    };

    let result = state.payments.refund(intent_id, amount).await;
    let (status, error_text) = match &result {
        Ok(()) => {
            info!(commitment_id = %commitment.id, amount, "stake refunded");
            (RefundStatus::Refunded, None)
        }
        Err(err) => {
            warn!(commitment_id = %commitment.id, %err, "refund failed; flagged for follow-up");
            (RefundStatus::Failed, Some(err.to_string()))
        }
    };
    if let Err(err) = state
        .commitments()
        .set_refund(&commitment.id, status, amount, error_text.as_deref())
        .await
    {
        error!(commitment_id = %commitment.id, %err, "failed to record refund outcome");
    }
}

/// Terminate a commitment: flip it to completed, settle the refund, and
/// send the committer a summary.
///
/// The status flip is conditional, so a judge reply racing the
/// scheduler's sweep settles exactly once. Returns whether this call
/// performed the termination.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn terminate(
    state: &AppState,
    commitment_id: &str,
    reason: TerminationReason,
) -> Result<bool> {
    if !state.commitments().complete(commitment_id).await? {
        return Ok(false);
    }
    let Some(commitment) = state.commitments().get_by_id(commitment_id).await? else {
        return Ok(false);
    };

    issue_refund(state, &commitment).await;

    let refund_note = match ledger::classify_refund(
        commitment.original_stake,
        commitment.stake_remaining,
    ) {
        RefundOutcome::Perfect => format!(
            "Your full ${} stake is on its way back to you.",
            commitment.original_stake
        ),
        RefundOutcome::Partial(amount) => format!("${amount} of your stake is on its way back."),
        RefundOutcome::None => "Your stake was fully forfeited.".to_owned(),
    };
    let lead = match reason {
        TerminationReason::StakeDepleted => "Your stake ran out, so your commitment has ended.",
        TerminationReason::Elapsed => "Your commitment has run its course. Nice work sticking with it!",
        TerminationReason::DeadlineMet => "Deadline met! Your commitment is complete.",
        TerminationReason::DeadlineMissed => "The deadline passed unmet, so your commitment has ended.",
    };
    send_best_effort(
        state.sms.as_ref(),
        &commitment.phone,
        &format!("{lead} {refund_note}"),
    )
    .await;

    info!(commitment_id, ?reason, "commitment terminated");
    Ok(true)
}

/// The status line sent to the committer when a log is dispatched.
#[must_use]
pub fn check_in_status(commitment: &Commitment, log: &DailyLog) -> String {
    match commitment.commitment_type {
        CommitmentType::Daily => {
            let day = (log.date - commitment.start_date).num_days() + 1;
            let total = (commitment.end_date - commitment.start_date).num_days() + 1;
            format!(
                "Day {day} of {total}: I've asked {} to verify \"{}\". ${} of your ${} stake \
                 is still standing.",
                commitment.judge_name,
                commitment.commitment_text,
                commitment.stake_remaining,
                commitment.original_stake
            )
        }
        CommitmentType::Deadline => format!(
            "Deadline day: I've asked {} to verify \"{}\". Your full ${} stake rides on it.",
            commitment.judge_name, commitment.commitment_text, commitment.stake_remaining
        ),
    }
}

/// The check-in question sent to a judge when a log is dispatched.
#[must_use]
pub fn check_in_question(commitment: &Commitment, log: &DailyLog) -> String {
    let who = commitment
        .name
        .clone()
        .unwrap_or_else(|| format!("The committer at {}", commitment.phone));
    match commitment.commitment_type {
        CommitmentType::Daily => format!(
            "Judge check-in for {}: did {who} do \"{}\" today? Reply YES or NO.",
            log.date, commitment.commitment_text
        ),
        CommitmentType::Deadline => format!(
            "Judge check-in: the deadline for {who}'s commitment \"{}\" is here. \
             Did they follow through? Reply YES or NO.",
            commitment.commitment_text
        ),
    }
}
