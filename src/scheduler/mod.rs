//! The scheduling engine.
//!
//! A minutely tick drives everything time-based: dispatching check-in
//! questions at the committer-local evening hour, escalating unanswered
//! logs, defaulting them to FAIL at the timeout hour, sweeping elapsed
//! commitments, the operator's daily refund report, and expiry purges.
//!
//! Every action is guarded by a conditional update (log uniqueness,
//! `reminder_stage`, conditional status flips), so ticks are idempotent
//! and a restarted process never double-fires.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::clock;
use crate::flows::lifecycle::{self, TerminationReason};
use crate::flows::verification::{self, ResolvedBy};
use crate::gateways::sms::send_best_effort;
use crate::models::commitment::{Commitment, CommitmentType};
use crate::models::daily_log::DailyLog;
use crate::state::AppState;
use crate::{AppError, Result};

const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Local hour at which the operator's refund report goes out.
const REPORT_HOUR: u32 = 9;

/// Spawn the scheduling engine as a background task.
#[must_use]
pub fn spawn(state: AppState, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut scheduler = Scheduler::new(state);
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("scheduler shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = scheduler.tick(Utc::now()).await {
                        error!(%err, "scheduler tick failed");
                    }
                }
            }
        }
    })
}

/// The tick driver. Holds only what must persist between ticks; all
/// scheduling state lives in the database.
pub struct Scheduler {
    state: AppState,
    last_report: Option<NaiveDate>,
}

impl Scheduler {
    /// Build a scheduler over the shared state.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            last_report: None,
        }
    }

    /// Run one tick at `now`. Public so tests can drive time
    /// deterministically.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` when the commitment or log scans fail;
    /// per-item failures are logged and skipped.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<()> {
        for commitment in self.state.commitments().list_active().await? {
            if let Err(err) = self.dispatch_and_sweep(&commitment, now).await {
                error!(commitment_id = %commitment.id, %err, "dispatch failed");
            }
        }
        for log in self.state.logs().list_pending().await? {
            if let Err(err) = self.escalate(&log, now).await {
                error!(log_id = %log.id, %err, "escalation failed");
            }
        }
        self.daily_report(now).await;
        self.purge_expired(now).await;
        Ok(())
    }

    fn zone_for(&self, commitment: &Commitment) -> Tz {
        clock::zone_or(
            &commitment.timezone,
            self.state
                .config
                .default_timezone
                .parse()
                .unwrap_or(chrono_tz::America::Los_Angeles),
        )
    }

    /// Send the day's check-in when the local dispatch hour arrives, and
    /// settle commitments whose final day has passed.
    async fn dispatch_and_sweep(&self, commitment: &Commitment, now: DateTime<Utc>) -> Result<()> {
        let tz = self.zone_for(commitment);
        let today = clock::local_date(now, tz);
        let hour = clock::local_hour(now, tz);

        if today > commitment.end_date {
            let pending: Vec<_> = self
                .state
                .logs()
                .list_by_commitment(&commitment.id)
                .await?
                .into_iter()
                .filter(|log| log.outcome == crate::models::daily_log::LogOutcome::Pending)
                .collect();
            // Outstanding logs still owe the judge a verdict (or a
            // timeout); settlement waits for them.
            if pending.is_empty() {
                let reason = match commitment.commitment_type {
                    CommitmentType::Daily => TerminationReason::Elapsed,
                    CommitmentType::Deadline => TerminationReason::DeadlineMissed,
                };
                lifecycle::terminate(&self.state, &commitment.id, reason).await?;
            }
            return Ok(());
        }

        let due_today = match commitment.commitment_type {
            CommitmentType::Daily => today >= commitment.start_date,
            CommitmentType::Deadline => Some(today) == commitment.deadline_date,
        };
        if !due_today || hour != self.state.config.schedule.check_in_hour {
            return Ok(());
        }
        if self
            .state
            .logs()
            .get_for_day(&commitment.id, today)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let log = DailyLog::new(commitment.id.clone(), today);
        let log = match self.state.logs().create(&log).await {
            Ok(log) => log,
            // A concurrent tick already dispatched this day.
            Err(AppError::Conflict(_)) => return Ok(()),
            Err(err) => return Err(err),
        };
        info!(commitment_id = %commitment.id, date = %today, "check-in dispatched");
        send_best_effort(
            self.state.sms.as_ref(),
            &commitment.judge_phone,
            &lifecycle::check_in_question(commitment, &log),
        )
        .await;
        send_best_effort(
            self.state.sms.as_ref(),
            &commitment.phone,
            &lifecycle::check_in_status(commitment, &log),
        )
        .await;
        Ok(())
    }

    /// Remind the judge about an unanswered log, then default it to
    /// FAIL once the timeout hour passes on the following day.
    async fn escalate(&self, log: &DailyLog, now: DateTime<Utc>) -> Result<()> {
        let Some(commitment) = self.state.commitments().get_by_id(&log.commitment_id).await?
        else {
            return Ok(());
        };
        if commitment.status != crate::models::commitment::CommitmentStatus::Active {
            return Ok(());
        }
        let tz = self.zone_for(&commitment);
        let local_now = now.with_timezone(&tz).naive_local();
        let today = local_now.date();
        let hour = local_now.hour();
        let schedule = &self.state.config.schedule;

        // Timeout: the next local day, at the timeout hour.
        if today > log.date && hour >= schedule.timeout_hour {
            verification::apply_outcome(&self.state, &commitment, log, false, ResolvedBy::Timeout)
                .await?;
            return Ok(());
        }

        // Second reminder: the next local morning.
        if log.reminder_stage == 1 && today > log.date && hour >= schedule.second_reminder_hour {
            if self.state.logs().advance_reminder(&log.id, 1, 2).await? {
                send_best_effort(
                    self.state.sms.as_ref(),
                    &commitment.judge_phone,
                    &format!(
                        "Last call: did they do \"{}\" on {}? Reply YES or NO, or it counts \
                         as a miss at {}:00.",
                        commitment.commitment_text, log.date, schedule.timeout_hour
                    ),
                )
                .await;
            }
            return Ok(());
        }

        // First reminder: a couple of hours after dispatch, same evening.
        if log.reminder_stage == 0 {
            let Some(dispatch_time) = log
                .date
                .and_hms_opt(schedule.check_in_hour, 0, 0)
                .map(|t| t + chrono::Duration::hours(i64::from(schedule.first_reminder_offset_hours)))
            else {
                return Ok(());
            };
            if local_now >= dispatch_time && self.state.logs().advance_reminder(&log.id, 0, 1).await?
            {
                send_best_effort(
                    self.state.sms.as_ref(),
                    &commitment.judge_phone,
                    &format!(
                        "Still waiting on you: did they do \"{}\" today? Reply YES or NO.",
                        commitment.commitment_text
                    ),
                )
                .await;
            }
        }
        Ok(())
    }

    /// Once a day, tell the operator about refunds stuck in `failed`.
    async fn daily_report(&mut self, now: DateTime<Utc>) {
        let tz = self
            .state
            .config
            .default_timezone
            .parse()
            .unwrap_or(chrono_tz::America::Los_Angeles);
        let today = clock::local_date(now, tz);
        if clock::local_hour(now, tz) != REPORT_HOUR || self.last_report == Some(today) {
            return;
        }
        self.last_report = Some(today);

        let stuck = match self.state.commitments().list_unrefunded().await {
            Ok(stuck) => stuck,
            Err(err) => {
                error!(%err, "refund report scan failed");
                return;
            }
        };
        if stuck.is_empty() {
            return;
        }
        let mut lines = vec![format!("{} refund(s) need attention:", stuck.len())];
        for c in &stuck {
            lines.push(format!(
                "• {} owed ${} ({})",
                c.phone,
                c.stake_remaining,
                c.refund_error.as_deref().unwrap_or("never attempted")
            ));
        }
        send_best_effort(
            self.state.sms.as_ref(),
            &self.state.config.admin_phone,
            &lines.join("\n"),
        )
        .await;
    }

    /// Drop expired menus, verification codes, stale undo entries, and
    /// aged rate-limit buckets.
    async fn purge_expired(&self, now: DateTime<Utc>) {
        if let Err(err) = self.state.menus().purge_expired().await {
            error!(%err, "menu purge failed");
        }
        if let Err(err) = self.state.verify_codes().purge_expired().await {
            error!(%err, "verification code purge failed");
        }
        let cutoff = now - chrono::Duration::minutes(self.state.config.undo_window_minutes);
        if let Err(err) = self.state.undos().purge_older_than(cutoff).await {
            error!(%err, "undo purge failed");
        }
        self.state.signup_limiter.sweep(now);
    }
}
