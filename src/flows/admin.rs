//! Operator corrections over SMS.
//!
//! `ADMIN` lists recent logs with index numbers; `ADMIN <n> PASS|FAIL`
//! overwrites a log's outcome and reconciles the stake.

use tracing::info;

use crate::flows::verification::{self, ResolvedBy};
use crate::gateways::sms::send_best_effort;
use crate::ledger;
use crate::models::commitment::CommitmentStatus;
use crate::models::daily_log::LogOutcome;
use crate::models::payout::Payout;
use crate::state::AppState;
use crate::Result;

const LISTING_LIMIT: i64 = 10;

/// Handle an operator message beginning with `ADMIN`. The router has
/// already verified the sender is the configured operator.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn handle(state: &AppState, text: &str) -> Result<String> {
    let upper = text.trim().to_uppercase();
    let rest = upper.trim_start_matches("ADMIN").trim();
    if rest.is_empty() {
        return listing(state).await;
    }

    let mut parts = rest.split_whitespace();
    let index: Option<usize> = parts.next().and_then(|s| s.parse().ok());
    let verdict = parts.next();
    match (index, verdict) {
        (Some(n), Some("PASS")) => correct(state, n, true).await,
        (Some(n), Some("FAIL")) => correct(state, n, false).await,
        _ => Ok("Usage: ADMIN to list, or ADMIN <n> PASS|FAIL to correct.".to_owned()),
    }
}

async fn listing(state: &AppState) -> Result<String> {
    let logs = state.logs().list_recent(LISTING_LIMIT).await?;
    if logs.is_empty() {
        return Ok("No check-ins recorded yet.".to_owned());
    }
    let mut lines = vec!["Recent check-ins:".to_owned()];
    for (i, log) in logs.iter().enumerate() {
        let who = match state.commitments().get_by_id(&log.commitment_id).await? {
            Some(c) => c.name.unwrap_or(c.phone),
            None => log.commitment_id.clone(),
        };
        let outcome = match log.outcome {
            LogOutcome::Pending => "pending",
            LogOutcome::Pass => "pass",
            LogOutcome::Fail => "fail",
        };
        lines.push(format!("{}. {} {} — {}", i + 1, log.date, who, outcome));
    }
    lines.push("Correct with: ADMIN <n> PASS|FAIL".to_owned());
    Ok(lines.join("\n"))
}

/// Overwrite log `n` (1-based, from the same listing order) and move
/// the stake by the difference between old and new outcome.
async fn correct(state: &AppState, n: usize, now_pass: bool) -> Result<String> {
    let logs = state.logs().list_recent(LISTING_LIMIT).await?;
    let Some(log) = n.checked_sub(1).and_then(|i| logs.get(i)) else {
        return Ok(format!("No entry {n}. Text ADMIN to list."));
    };
    let Some(commitment) = state.commitments().get_by_id(&log.commitment_id).await? else {
        return Ok("That commitment is no longer around.".to_owned());
    };

    // A still-pending log gets the normal resolution path, side effects
    // and all.
    if log.outcome == LogOutcome::Pending {
        let reply = verification::apply_outcome(
            state,
            &commitment,
            log,
            now_pass,
            ResolvedBy::Operator,
        )
        .await?;
        return Ok(reply.unwrap_or_else(|| "Recorded.".to_owned()));
    }

    if commitment.status != CommitmentStatus::Active {
        return Ok(
            "That commitment has been settled; its logs can no longer be corrected.".to_owned(),
        );
    }

    let was_fail = log.outcome == LogOutcome::Fail;
    let now_fail = !now_pass;
    if was_fail == now_fail {
        return Ok("That entry already has that outcome.".to_owned());
    }

    let new_outcome = if now_pass { LogOutcome::Pass } else { LogOutcome::Fail };
    state.logs().set_outcome(&log.id, new_outcome).await?;

    let delta = ledger::correction_delta(was_fail, now_fail, commitment.penalty_per_failure);
    if delta != 0 {
        state.commitments().adjust_stake(&commitment.id, delta).await?;
        state
            .payouts()
            .create(&Payout::new(
                commitment.id.clone(),
                commitment.judge_phone.clone(),
                -delta,
                format!("operator correction for {}", log.date),
            ))
            .await?;
    }

    info!(
        commitment_id = %commitment.id,
        log_id = %log.id,
        now_pass,
        delta,
        "operator correction applied"
    );

    let note = if delta > 0 {
        format!(
            "Good news: your {} check-in was corrected to a pass and ${delta} was restored.",
            log.date
        )
    } else {
        format!(
            "Your {} check-in was corrected to a miss and ${} was debited.",
            log.date,
            delta.abs()
        )
    };
    send_best_effort(state.sms.as_ref(), &commitment.phone, &note).await;

    Ok(format!(
        "Corrected entry {n} to {}. Stake adjusted by {delta:+}.",
        if now_pass { "PASS" } else { "FAIL" }
    ))
}
