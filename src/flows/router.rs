//! Inbound SMS dispatch.
//!
//! Every message runs through a fixed priority chain: judge consent,
//! menu responses, judge verification, operator commands, global
//! commands, then the setup dialogue. The first handler that claims the
//! message wins.

use tracing::{debug, info};

use crate::flows::{admin, judge, menu, setup, status, undo};
use crate::gateways::sms::send_best_effort;
use crate::parse::commands::{self, Command};
use crate::state::AppState;
use crate::Result;

/// Process one inbound message and send whatever reply it earns.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure; gateway errors from
/// replies are logged and swallowed.
pub async fn handle_inbound(state: &AppState, from: &str, body: &str) -> Result<()> {
    let text = body.trim();
    if text.is_empty() {
        return Ok(());
    }
    info!(from, "inbound sms");

    // A YES/NO from a phone holding a pending consent request is always
    // an answer to that request.
    if let Some(reply) = judge::handle_consent(state, from, text).await? {
        return reply_to(state, from, &reply).await;
    }

    // Numbered replies against an open menu.
    if let Some(reply) = menu::handle_response(state, from, text).await? {
        return reply_to(state, from, &reply).await;
    }

    // YES/NO verification from an accepted judge.
    if let Some(reply) = judge::handle_verification(state, from, text).await? {
        return reply_to(state, from, &reply).await;
    }

    // Operator corrections, including "ADMIN <n> PASS|FAIL".
    if state.config.is_admin(from) && text.to_uppercase().starts_with("ADMIN") {
        let reply = admin::handle(state, text).await?;
        return reply_to(state, from, &reply).await;
    }

    if let Some(command) = commands::recognize(text) {
        let reply = match command {
            Command::Start => setup::start(state, from).await?,
            Command::Reset => reset(state, from).await?,
            Command::Help => status::help(),
            Command::Status => status::status(state, from).await?,
            Command::History => status::history(state, from).await?,
            Command::Menu => menu::build_menu(state, from).await?,
            Command::Undo => undo::handle(state, from).await?,
            // Non-operators typing ADMIN get the generic hint.
            Command::Admin => status::help(),
        };
        return reply_to(state, from, &reply).await;
    }

    // Free text continues an open setup dialogue.
    if let Some(session) = state.setups().get(from).await? {
        let reply = setup::handle_reply(state, session, text).await?;
        return reply_to(state, from, &reply).await;
    }

    debug!(from, "unrecognized message");
    reply_to(
        state,
        from,
        "I didn't catch that. Text START to stake a commitment, or HELP for the rundown.",
    )
    .await
}

async fn reset(state: &AppState, phone: &str) -> Result<String> {
    // Once the stake is funded there's nothing to walk back over SMS.
    if state.commitments().get_open_by_phone(phone).await?.is_some()
        && !state.config.is_whitelisted(phone)
    {
        return Ok(
            "Your commitment is already funded and can't be reset. \
             Text STATUS to see where you stand."
                .to_owned(),
        );
    }
    if state.setups().get(phone).await?.is_some() {
        state.setups().delete(phone).await?;
        Ok("Setup abandoned. Text START whenever you're ready.".to_owned())
    } else {
        Ok("Nothing to reset.".to_owned())
    }
}

async fn reply_to(state: &AppState, to: &str, body: &str) -> Result<()> {
    send_best_effort(state.sms.as_ref(), to, body).await;
    Ok(())
}
