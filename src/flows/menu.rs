//! Judge MENU: a numbered list of verifiable commitments for judges
//! overseeing more than one committer.

use chrono::{Duration, Utc};

use crate::clock;
use crate::flows::judge::verifiable_commitments;
use crate::flows::verification::{self, ResolvedBy};
use crate::models::commitment::CommitmentType;
use crate::models::daily_log::DailyLog;
use crate::persistence::menu_repo::MenuChoice;
use crate::state::AppState;
use crate::Result;

/// Build and store a fresh menu for a judge, returning the message to
/// send. Supersedes any prior active menu.
///
/// Daily commitments appear when today's check-in is still pending;
/// deadline commitments are always offered so the judge can settle them
/// early.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn build_menu(state: &AppState, judge_phone: &str) -> Result<String> {
    let mut choices = Vec::new();
    for (commitment, pending_log) in verifiable_commitments(state, judge_phone).await? {
        let verifiable = pending_log.is_some()
            || commitment.commitment_type == CommitmentType::Deadline;
        if !verifiable {
            continue;
        }
        let label = commitment
            .name
            .clone()
            .unwrap_or_else(|| last_four(&commitment.phone));
        choices.push(MenuChoice {
            commitment_id: commitment.id.clone(),
            log_id: pending_log.map(|log| log.id),
            committer_phone: commitment.phone.clone(),
            label,
            commitment_text: commitment.commitment_text.clone(),
        });
    }

    if choices.is_empty() {
        return Ok("Nothing to verify right now. I'll text you when a check-in is due.".to_owned());
    }

    let expires_at = Utc::now() + Duration::minutes(state.config.menu_expiry_minutes);
    state
        .menus()
        .create(judge_phone, &choices, expires_at)
        .await?;

    if choices.len() == 1 {
        let choice = &choices[0];
        return Ok(format!(
            "{}: \"{}\"\nReply 1 if they did it, 2 if they didn't.",
            choice.label, choice.commitment_text
        ));
    }

    let mut lines = vec!["Who are you verifying?".to_owned()];
    for (i, choice) in choices.iter().enumerate() {
        let pass_num = 2 * i + 1;
        let fail_num = 2 * i + 2;
        lines.push(format!(
            "{}: \"{}\" — reply {pass_num} for done, {fail_num} for not done.",
            choice.label, choice.commitment_text
        ));
    }
    Ok(lines.join("\n"))
}

/// Handle a numbered reply against the judge's active menu. Returns the
/// reply to send, or `None` when there is no menu or the text is not a
/// number.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn handle_response(
    state: &AppState,
    judge_phone: &str,
    text: &str,
) -> Result<Option<String>> {
    let Ok(number) = text.trim().parse::<usize>() else {
        return Ok(None);
    };
    let Some(session) = state.menus().get_active(judge_phone).await? else {
        return Ok(None);
    };

    let (index, passed) = if session.choices.len() == 1 {
        match number {
            1 => (0, true),
            2 => (0, false),
            _ => return Ok(Some("Reply 1 for done or 2 for not done.".to_owned())),
        }
    } else {
        let max = session.choices.len() * 2;
        if number == 0 || number > max {
            return Ok(Some(format!("Pick a number between 1 and {max}.")));
        }
        // Odd numbers mark a pass, even numbers a fail.
        ((number - 1) / 2, number % 2 == 1)
    };

    // Menus are single-use; losing the deactivation race means another
    // reply already consumed this menu.
    if !state.menus().deactivate(&session.id).await? {
        return Ok(Some("That menu was already answered. Text MENU for a fresh one.".to_owned()));
    }

    let choice = &session.choices[index];
    let Some(commitment) = state.commitments().get_by_id(&choice.commitment_id).await? else {
        return Ok(Some("That commitment is no longer around.".to_owned()));
    };

    let log = match &choice.log_id {
        Some(log_id) => state.logs().get_by_id(log_id).await?,
        None => {
            // Early deadline verification: open today's log on demand.
            let tz = clock::zone_or(
                &commitment.timezone,
                state
                    .config
                    .default_timezone
                    .parse()
                    .unwrap_or(chrono_tz::America::Los_Angeles),
            );
            let today = clock::local_date(Utc::now(), tz);
            match state.logs().get_for_day(&commitment.id, today).await? {
                Some(existing) => Some(existing),
                None => Some(
                    state
                        .logs()
                        .create(&DailyLog::new(commitment.id.clone(), today))
                        .await?,
                ),
            }
        }
    };
    let Some(log) = log else {
        return Ok(Some("That check-in is no longer around.".to_owned()));
    };

    verification::apply_outcome(state, &commitment, &log, passed, ResolvedBy::Judge(judge_phone))
        .await
}

fn last_four(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits.iter().rev().take(4).rev().collect();
    format!("…{tail}")
}
