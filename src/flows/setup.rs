//! The setup dialogue: a linear SMS conversation that collects the
//! commitment terms and ends with a payment link.

use chrono::Utc;
use tracing::info;

use crate::clock;
use crate::interpreter::{SlotType, SlotValue};
use crate::models::commitment::CommitmentType;
use crate::models::setup::{SetupSession, SetupStep};
use crate::parse::slots::{
    self, DURATION_MAX, DURATION_MIN, STAKE_MAX, STAKE_MIN,
};
use crate::state::AppState;
use crate::Result;

const NAME_PROMPT: &str = "Hi! Let's put some money where your mouth is. What's your first name?";
const COMMITMENT_PROMPT: &str =
    "What are you committing to? Keep it concrete, like \"run every morning\".";
const TYPE_PROMPT: &str =
    "Is this:\n1. A daily habit\n2. A one-time deadline\nReply 1 or 2.";
const JUDGE_PROMPT: &str =
    "Who will verify you? Send their name and number, like: Sarah 555-123-4567";

/// Begin (or restart) setup for a phone. Returns the reply to send.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn start(state: &AppState, phone: &str) -> Result<String> {
    if let Some(open) = state.commitments().get_open_by_phone(phone).await? {
        if !state.config.is_whitelisted(phone) {
            return Ok(format!(
                "You already have a commitment going (\"{}\"). One at a time! Text STATUS for details.",
                open.commitment_text
            ));
        }
    }

    let session = SetupSession::start(phone.to_owned(), state.config.default_timezone.clone());
    state.setups().save(&session).await?;
    info!(phone, "setup started");
    Ok(NAME_PROMPT.to_owned())
}

/// Advance the dialogue with the committer's reply. Returns the next
/// prompt.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure, `AppError::Payment`
/// when the payment intent cannot be created.
#[allow(clippy::too_many_lines)] // One arm per dialogue step.
pub async fn handle_reply(
    state: &AppState,
    mut session: SetupSession,
    text: &str,
) -> Result<String> {
    let trimmed = text.trim();
    let tz = clock::zone_or(
        &session.temp_timezone,
        state
            .config
            .default_timezone
            .parse()
            .unwrap_or(chrono_tz::America::Los_Angeles),
    );
    let today = clock::local_date(Utc::now(), tz);

    let reply = match session.current_step {
        SetupStep::AwaitingName => {
            if trimmed.is_empty() || trimmed.len() > 100 {
                "Just your first name will do.".to_owned()
            } else {
                session.temp_name = Some(trimmed.to_owned());
                session.current_step = SetupStep::AwaitingCommitment;
                format!("Nice to meet you, {trimmed}! {COMMITMENT_PROMPT}")
            }
        }
        SetupStep::AwaitingCommitment => {
            if trimmed.is_empty() || trimmed.len() > 300 {
                "Give me a short, concrete commitment.".to_owned()
            } else {
                session.temp_commitment = Some(trimmed.to_owned());
                session.current_step = SetupStep::AwaitingCommitmentType;
                TYPE_PROMPT.to_owned()
            }
        }
        SetupStep::AwaitingCommitmentType => match slots::parse_commitment_type(trimmed) {
            Some(kind) => {
                session.temp_commitment_type = Some(kind);
                session.current_step = SetupStep::AwaitingStakeAmount;
                format!("How much are you putting on the line? (${STAKE_MIN}-${STAKE_MAX})")
            }
            None => TYPE_PROMPT.to_owned(),
        },
        SetupStep::AwaitingStakeAmount => {
            let amount = slots::parse_stake_amount(trimmed).or_else(|| {
                match state.interpreter.interpret(trimmed, SlotType::Amount, today) {
                    Some(SlotValue::Amount(a)) => Some(a),
                    _ => None,
                }
            });
            match amount {
                Some(a) if (STAKE_MIN..=STAKE_MAX).contains(&a) => {
                    session.temp_stake_amount = Some(a);
                    match session.temp_commitment_type {
                        Some(CommitmentType::Daily) => {
                            session.current_step = SetupStep::AwaitingDuration;
                            format!("${a} it is. How many days will this run? ({DURATION_MIN}-{DURATION_MAX})")
                        }
                        _ => {
                            session.current_step = SetupStep::AwaitingDeadlineDate;
                            format!(
                                "${a} it is. When's the deadline? (e.g. 9/15, Sep 15, or next Friday)"
                            )
                        }
                    }
                }
                Some(_) => format!("Stake must be between ${STAKE_MIN} and ${STAKE_MAX}."),
                None => "How many dollars? A plain number like 25 works.".to_owned(),
            }
        }
        SetupStep::AwaitingDuration => {
            let days = slots::parse_duration_days(trimmed).or_else(|| {
                match state
                    .interpreter
                    .interpret(trimmed, SlotType::DurationDays, today)
                {
                    Some(SlotValue::DurationDays(d)) => Some(d),
                    _ => None,
                }
            });
            match days {
                Some(d) if (DURATION_MIN..=DURATION_MAX).contains(&d) => {
                    let stake = session.temp_stake_amount.unwrap_or(STAKE_MIN);
                    let penalty = crate::ledger::penalty_for(stake, d);
                    session.temp_duration_days = Some(d);
                    session.temp_penalty = Some(penalty);
                    session.current_step = SetupStep::AwaitingJudgePhone;
                    format!(
                        "{d} days, ${penalty} on the line each day you miss. {JUDGE_PROMPT}"
                    )
                }
                Some(_) => {
                    format!("Pick between {DURATION_MIN} and {DURATION_MAX} days.")
                }
                None => "How many days? A plain number like 30 works.".to_owned(),
            }
        }
        SetupStep::AwaitingDeadlineDate => {
            let date = slots::parse_deadline_date(trimmed, today).or_else(|| {
                match state.interpreter.interpret(trimmed, SlotType::Date, today) {
                    Some(SlotValue::Date(d)) => Some(d),
                    _ => None,
                }
            });
            match date {
                Some(d) if (d - today).num_days() <= DURATION_MAX => {
                    session.temp_deadline_date = Some(d);
                    session.temp_penalty = session.temp_stake_amount;
                    session.current_step = SetupStep::AwaitingJudgePhone;
                    format!("Deadline set for {d}. {JUDGE_PROMPT}")
                }
                Some(_) => "Let's keep it within 90 days.".to_owned(),
                None => {
                    "When's the deadline? Try a date like 9/15, Sep 15, or next Friday.".to_owned()
                }
            }
        }
        SetupStep::AwaitingJudgePhone => {
            return judge_step(state, session, trimmed).await;
        }
        SetupStep::AwaitingPayment => {
            let link = payment_link(state, session.payment_intent_id.as_deref());
            format!("Almost there — your payment link is still open: {link}")
        }
    };

    state.setups().save(&session).await?;
    Ok(reply)
}

async fn judge_step(
    state: &AppState,
    mut session: SetupSession,
    text: &str,
) -> Result<String> {
    let Some((name, judge_phone)) = slots::parse_judge_contact(text) else {
        return Ok(JUDGE_PROMPT.to_owned());
    };
    if judge_phone == session.phone {
        return Ok("You can't be your own judge — that's the whole point. Who else?".to_owned());
    }
    if state.judges().is_engaged(&judge_phone).await? && !state.config.is_whitelisted(&judge_phone)
    {
        return Ok(format!(
            "{name} is already judging someone. Pick a different judge."
        ));
    }

    let stake = session.temp_stake_amount.unwrap_or(STAKE_MIN);
    let metadata = intent_metadata(&session, &name, &judge_phone);
    let intent = state.payments.create_intent(stake, &metadata).await?;

    session.temp_judge_name = Some(name.clone());
    session.temp_judge_phone = Some(judge_phone);
    session.payment_intent_id = Some(intent.id.clone());
    session.current_step = SetupStep::AwaitingPayment;
    state.setups().save(&session).await?;

    info!(phone = %session.phone, intent_id = %intent.id, "payment intent created");
    let link = payment_link(state, Some(&intent.id));
    Ok(format!(
        "Last step: put your ${stake} where your mouth is. Pay here: {link}\n\
         Once it clears, I'll ask {name} to be your judge."
    ))
}

/// Every staged term goes onto the intent, so the processor record
/// stands on its own if the session is ever lost.
fn intent_metadata(
    session: &SetupSession,
    judge_name: &str,
    judge_phone: &str,
) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("phone", session.phone.clone())];
    if let Some(name) = &session.temp_name {
        pairs.push(("name", name.clone()));
    }
    if let Some(text) = &session.temp_commitment {
        pairs.push(("commitment", text.clone()));
    }
    if let Some(kind) = session.temp_commitment_type {
        let label = match kind {
            CommitmentType::Daily => "daily",
            CommitmentType::Deadline => "deadline",
        };
        pairs.push(("commitment_type", label.to_owned()));
    }
    if let Some(stake) = session.temp_stake_amount {
        pairs.push(("stake_amount", stake.to_string()));
    }
    if let Some(days) = session.temp_duration_days {
        pairs.push(("duration_days", days.to_string()));
    }
    if let Some(date) = session.temp_deadline_date {
        pairs.push(("deadline_date", date.to_string()));
    }
    if let Some(penalty) = session.temp_penalty {
        pairs.push(("penalty", penalty.to_string()));
    }
    pairs.push(("judge_name", judge_name.to_owned()));
    pairs.push(("judge_phone", judge_phone.to_owned()));
    pairs.push(("timezone", session.temp_timezone.clone()));
    pairs
}

fn payment_link(state: &AppState, intent_id: Option<&str>) -> String {
    match intent_id {
        Some(id) => format!("{}/pay/{id}", state.config.app_url.trim_end_matches('/')),
        None => state.config.app_url.clone(),
    }
}
