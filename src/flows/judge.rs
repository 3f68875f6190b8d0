//! Judge conversations: consent to serve, and direct YES/NO
//! verification replies.

use tracing::info;

use chrono::Utc;

use crate::flows::lifecycle::issue_refund;
use crate::flows::menu;
use crate::flows::verification::{self, ResolvedBy};
use crate::gateways::sms::send_best_effort;
use crate::interpreter::{SlotType, SlotValue};
use crate::models::commitment::{Commitment, CommitmentStatus};
use crate::models::daily_log::{DailyLog, LogOutcome};
use crate::models::judge::ConsentStatus;
use crate::parse::commands;
use crate::parse::phone::parse_yes_no;
use crate::state::AppState;
use crate::Result;

/// Handle a YES/NO reply from a phone holding a pending consent
/// request. Returns the reply to send, or `None` when this handler does
/// not apply.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn handle_consent(
    state: &AppState,
    phone: &str,
    text: &str,
) -> Result<Option<String>> {
    let Some(accepted) = parse_yes_no(text) else {
        return Ok(None);
    };
    let pending = state
        .judges()
        .list_by_phone(phone, ConsentStatus::Pending)
        .await?;
    // Consent only binds while the commitment is still waiting.
    let mut target = None;
    for record in pending {
        if let Some(commitment) = state.commitments().get_by_id(&record.commitment_id).await? {
            if commitment.status == CommitmentStatus::AwaitingJudge {
                target = Some((record, commitment));
                break;
            }
        }
    }
    let Some((record, commitment)) = target else {
        return Ok(None);
    };

    let consent = if accepted {
        ConsentStatus::Accepted
    } else {
        ConsentStatus::Declined
    };
    if !state.judges().set_consent(&record.id, consent).await? {
        return Ok(Some("You've already answered that request.".to_owned()));
    }

    if accepted {
        state.commitments().activate(&commitment.id).await?;
        info!(commitment_id = %commitment.id, judge = %phone, "judge accepted");
        send_best_effort(
            state.sms.as_ref(),
            &commitment.phone,
            &format!(
                "{} accepted! Your commitment \"{}\" is live starting {}.",
                commitment.judge_name, commitment.commitment_text, commitment.start_date
            ),
        )
        .await;
        Ok(Some(format!(
            "Thanks for judging! I'll text you each evening to ask whether \
             \"{}\" was done.",
            commitment.commitment_text
        )))
    } else {
        state.commitments().mark_declined(&commitment.id).await?;
        info!(commitment_id = %commitment.id, judge = %phone, "judge declined");
        // The committer gets their full stake back and must restart
        // with a different judge.
        issue_refund(state, &commitment).await;
        send_best_effort(
            state.sms.as_ref(),
            &commitment.phone,
            &format!(
                "{} declined to judge. Your ${} stake is being refunded. \
                 Text START to try again with someone else.",
                commitment.judge_name, commitment.original_stake
            ),
        )
        .await;
        Ok(Some("No problem, I've let them know.".to_owned()))
    }
}

/// Active commitments this phone judges, with today's pending log when
/// one exists.
pub(crate) async fn verifiable_commitments(
    state: &AppState,
    phone: &str,
) -> Result<Vec<(Commitment, Option<DailyLog>)>> {
    let accepted = state
        .judges()
        .list_by_phone(phone, ConsentStatus::Accepted)
        .await?;
    let mut out = Vec::new();
    for record in accepted {
        let Some(commitment) = state.commitments().get_by_id(&record.commitment_id).await? else {
            continue;
        };
        if commitment.status != CommitmentStatus::Active {
            continue;
        }
        let pending = state
            .logs()
            .list_by_commitment(&commitment.id)
            .await?
            .into_iter()
            .find(|log| log.outcome == LogOutcome::Pending);
        out.push((commitment, pending));
    }
    Ok(out)
}

/// Handle a verification reply from an accepted judge.
///
/// Strict YES/NO is taken at face value; anything looser goes through
/// the interpreter scoped to a verdict, and a reply it can't read earns
/// a re-prompt instead of falling through. Applies when exactly one of
/// their commitments has a pending log; with several, the reply is
/// ambiguous and they are sent a menu instead.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn handle_verification(
    state: &AppState,
    phone: &str,
    text: &str,
) -> Result<Option<String>> {
    let candidates: Vec<_> = verifiable_commitments(state, phone)
        .await?
        .into_iter()
        .filter_map(|(c, log)| log.map(|l| (c, l)))
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }

    let passed = match parse_yes_no(text) {
        Some(passed) => passed,
        None => {
            // Commands and operator corrections outrank the verdict
            // fallback; they sit later in the dispatch chain.
            if commands::recognize(text).is_some() || text.to_uppercase().starts_with("ADMIN") {
                return Ok(None);
            }
            match state
                .interpreter
                .interpret(text, SlotType::YesNo, Utc::now().date_naive())
            {
                Some(SlotValue::YesNo(passed)) => passed,
                _ => {
                    return Ok(Some(
                        "I couldn't tell whether that's a pass or a miss. Reply YES or NO only."
                            .to_owned(),
                    ));
                }
            }
        }
    };

    if let [(commitment, log)] = candidates.as_slice() {
        verification::apply_outcome(state, commitment, log, passed, ResolvedBy::Judge(phone)).await
    } else {
        Ok(Some(menu::build_menu(state, phone).await?))
    }
}
