//! Payment-intent lookup backing the hosted payment page.

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::commitment::CommitmentType;
use crate::models::setup::SetupSession;
use crate::state::AppState;
use crate::AppError;

/// Staged commitment terms shown alongside the card element.
#[derive(Debug, Serialize)]
pub struct IntentTerms {
    /// Commitment text.
    pub commitment: Option<String>,
    /// Daily habit or one-time deadline.
    pub commitment_type: Option<CommitmentType>,
    /// Stake in whole dollars.
    pub stake_amount: Option<i64>,
    /// Duration in days (daily type).
    pub duration_days: Option<i64>,
    /// Deadline date (deadline type).
    pub deadline_date: Option<NaiveDate>,
    /// Per-failure penalty in whole dollars.
    pub penalty: Option<i64>,
    /// Judge's display name.
    pub judge_name: Option<String>,
}

impl IntentTerms {
    fn from_session(session: &SetupSession) -> Self {
        Self {
            commitment: session.temp_commitment.clone(),
            commitment_type: session.temp_commitment_type,
            stake_amount: session.temp_stake_amount,
            duration_days: session.temp_duration_days,
            deadline_date: session.temp_deadline_date,
            penalty: session.temp_penalty,
            judge_name: session.temp_judge_name.clone(),
        }
    }
}

/// What the payment page needs to mount the card element.
#[derive(Debug, Serialize)]
pub struct IntentView {
    /// Processor intent identifier.
    pub id: String,
    /// Client secret for the card element.
    pub client_secret: String,
    /// Processor status string.
    pub status: String,
    /// Staged terms from the setup session; absent once finalized.
    pub terms: Option<IntentTerms>,
}

/// Fetch an intent's client secret, status, and staged terms.
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown intents and
/// `AppError::Payment` on processor failure.
pub async fn get_intent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IntentView>, AppError> {
    let intent = state.payments.retrieve_intent(&id).await?;
    let terms = state
        .setups()
        .get_by_intent(&id)
        .await?
        .map(|session| IntentTerms::from_session(&session));
    Ok(Json(IntentView {
        id: intent.id,
        client_secret: intent.client_secret,
        status: intent.status,
        terms,
    }))
}
