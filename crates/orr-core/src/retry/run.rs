//! Retry loop: walk the schedule until an attempt succeeds, one fails
//! fatally, the schedule runs out, or the host cancels.

use chrono::Utc;
use serde_json::json;
use std::time::{Duration, Instant};

use super::classify::{error_kind, Classification};
use super::delay::wait;
use super::error::AttemptError;
use super::schedule::{AttemptSlot, Pause, Schedule, Step};
use super::session::{format_elapsed, AttemptOutcome, AttemptRecord, Cancelled, Outcome, RetrySession};
use crate::compose;
use crate::notify::{NotificationEvent, Notifier, Severity};
use crate::upstream::{AttemptExecutor, UpstreamReply, UpstreamRequest};

const TOAST_TIMEOUT: Duration = Duration::from_secs(10);

enum Attempted {
    Success(UpstreamReply),
    Retryable(AttemptError),
    Fatal(AttemptError),
}

/// Run one session to completion.
///
/// Returns `Err(Cancelled)` when the session's token fires at a pause or
/// during an attempt; the in-flight attempt is dropped and no final
/// notification is sent.
pub async fn run_session<E>(
    mut session: RetrySession,
    executor: &E,
    request: &UpstreamRequest,
    notifier: &Notifier,
) -> Result<Outcome, Cancelled>
where
    E: AttemptExecutor + ?Sized,
{
    let total = session.total_max_attempts;
    let mut last_error = None;

    for step in Schedule::new(&session.config) {
        let slot = match step {
            Step::Attempt(slot) => slot,
            Step::Pause(pause) => {
                pause_for(&session, pause, notifier).await?;
                continue;
            }
        };
        if session.is_cancelled() {
            return Err(cancelled(&session));
        }

        notifier
            .status(
                Severity::Info,
                format!("Attempt {}/{} in progress...", slot.index, total),
                false,
            )
            .await;

        let (record, attempted) = attempt(&session, executor, request, slot).await?;
        session.push(record);
        match attempted {
            Attempted::Success(reply) => return Ok(succeed(session, reply, notifier).await),
            Attempted::Fatal(error) => return Ok(abort(session, error, notifier).await),
            Attempted::Retryable(error) => {
                notifier
                    .toast(
                        Severity::Warning,
                        format!("Attempt {}/{} failed: {}", slot.index, total, error),
                    )
                    .await;
                last_error = Some(error);
            }
        }
    }

    let last_error =
        last_error.unwrap_or_else(|| AttemptError::Other("no attempts were scheduled".to_string()));
    Ok(exhaust(session, last_error, notifier).await)
}

/// Execute and classify one attempt.
async fn attempt<E>(
    session: &RetrySession,
    executor: &E,
    request: &UpstreamRequest,
    slot: AttemptSlot,
) -> Result<(AttemptRecord, Attempted), Cancelled>
where
    E: AttemptExecutor + ?Sized,
{
    let timestamp = Utc::now();
    let started = Instant::now();
    let result = tokio::select! {
        biased;
        _ = session.cancel.cancelled() => return Err(cancelled(session)),
        result = executor.execute(request) => result,
    };
    let elapsed = started.elapsed();
    let total = session.total_max_attempts;

    let (outcome, attempted) = match result {
        Ok(reply) => {
            tracing::info!(
                identity = %session.identity,
                attempt = slot.index,
                total,
                "{} - Attempt {}/{} ({}): SUCCESS",
                session.identity,
                slot.index,
                total,
                format_elapsed(session.elapsed())
            );
            (AttemptOutcome::Success, Attempted::Success(reply))
        }
        Err(error) => {
            let kind = error_kind(&error);
            tracing::info!(
                identity = %session.identity,
                attempt = slot.index,
                total,
                kind = ?kind,
                "{} - Attempt {}/{}: ERROR: {}",
                session.identity,
                slot.index,
                total,
                error
            );
            match kind.classification() {
                Classification::Retryable => (
                    AttemptOutcome::RetryableError(error.to_string()),
                    Attempted::Retryable(error),
                ),
                Classification::Fatal => (
                    AttemptOutcome::FatalError(error.to_string()),
                    Attempted::Fatal(error),
                ),
            }
        }
    };

    let record = AttemptRecord {
        index: slot.index,
        burst_index: slot.burst,
        cycle_index: slot.cycle,
        timestamp,
        outcome,
        elapsed,
    };
    Ok((record, attempted))
}

async fn pause_for(
    session: &RetrySession,
    pause: Pause,
    notifier: &Notifier,
) -> Result<(), Cancelled> {
    let cfg = &session.config;
    let done = session.records.len();
    let total = session.total_max_attempts;

    let delay = match pause {
        Pause::Attempt => {
            let delay = cfg.attempt_delay().sample();
            notifier
                .status(
                    Severity::Info,
                    format!(
                        "Attempt {}/{} failed - retrying in {:.0}s",
                        done,
                        total,
                        delay.as_secs_f64()
                    ),
                    false,
                )
                .await;
            delay
        }
        Pause::Burst { burst, .. } => {
            let delay = cfg.burst_pause().sample();
            let secs = delay.as_secs_f64();
            tracing::info!(
                "{} - Burst completed without success; waiting {:.1}s",
                session.identity,
                secs
            );
            notifier
                .toast(
                    Severity::Warning,
                    format!(
                        "Burst of {} attempts failed. Waiting {:.0} seconds before next burst",
                        cfg.attempts_per_burst, secs
                    ),
                )
                .await;
            notifier
                .status(
                    Severity::Warning,
                    format!(
                        "Burst {}/{} completed ({}/{} attempts). Waiting {:.0}s before next burst",
                        burst, cfg.bursts_before_long_pause, done, total, secs
                    ),
                    false,
                )
                .await;
            delay
        }
        Pause::Cycle { cycle } => {
            let delay = cfg.long_pause_duration();
            let secs = delay.as_secs_f64();
            tracing::info!(
                "{} - Cycle {} completed; waiting {:.0}s",
                session.identity,
                cycle,
                secs
            );
            notifier
                .toast(
                    Severity::Warning,
                    format!(
                        "Cycle {} of {} completed without success. Waiting {:.0} seconds before next cycle",
                        cycle, cfg.cycles, secs
                    ),
                )
                .await;
            notifier
                .status(
                    Severity::Warning,
                    format!(
                        "Cycle {}/{} completed ({}/{} attempts). Waiting {:.0}s before next cycle",
                        cycle, cfg.cycles, done, total, secs
                    ),
                    false,
                )
                .await;
            delay
        }
    };

    wait(delay, &session.cancel)
        .await
        .map_err(|_| cancelled(session))
}

async fn succeed(session: RetrySession, reply: UpstreamReply, notifier: &Notifier) -> Outcome {
    let attempts_used = session.records.len() as u32;
    let elapsed = session.elapsed();

    if attempts_used > 1 {
        notifier
            .emit(
                NotificationEvent::notification(
                    Severity::Success,
                    format!("Response received after {} attempt(s)", attempts_used),
                )
                .with_timeout(TOAST_TIMEOUT),
            )
            .await;
        if let Some(summary) = compose::retry_summary(attempts_used, true, None) {
            notifier
                .emit(
                    NotificationEvent::notification(Severity::Info, summary)
                        .with_title("OpenRouter Retry Summary")
                        .with_timeout(TOAST_TIMEOUT)
                        .with_meta(json!({
                            "retry_info": compose::success_annotation(attempts_used, elapsed)
                        })),
                )
                .await;
        }
    }
    notifier
        .status(
            Severity::Success,
            format!(
                "Response received from {} after {} ({} attempts)",
                session.identity.provider_name(),
                format_elapsed(elapsed),
                attempts_used
            ),
            true,
        )
        .await;

    Outcome::Success {
        reply,
        attempts_used,
        elapsed,
        records: session.records,
    }
}

async fn abort(session: RetrySession, error: AttemptError, notifier: &Notifier) -> Outcome {
    let attempts = session.records.len();
    let total = session.total_max_attempts;
    tracing::warn!(
        "{} - Attempt {}/{}: fatal error, giving up: {}",
        session.identity,
        attempts,
        total,
        error
    );
    let outcome = Outcome::FatalAbort {
        error: error.clone(),
        records: session.records,
    };
    report_failure(
        notifier,
        &outcome,
        error.message(),
        format!("Attempt {}/{}: {} - not retrying", attempts, total, error),
    )
    .await;
    outcome
}

async fn exhaust(session: RetrySession, last_error: AttemptError, notifier: &Notifier) -> Outcome {
    let attempts = session.records.len();
    let total = session.total_max_attempts;
    tracing::error!(
        "{} - Attempt {}/{} ({}): ERROR: {}",
        session.identity,
        attempts,
        total,
        format_elapsed(session.elapsed()),
        last_error
    );
    let code = last_error
        .status()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let toast = format!(
        "All {} attempts failed. Final error: {} - {}",
        attempts,
        code,
        last_error.message()
    );
    let status = format!("All {} attempts failed. Final error: {}", attempts, code);
    let outcome = Outcome::Exhausted {
        last_error,
        total_max_attempts: total,
        records: session.records,
    };
    report_failure(notifier, &outcome, toast, status).await;
    outcome
}

/// One error toast (with the failure body as meta) and a final status line.
async fn report_failure(notifier: &Notifier, outcome: &Outcome, toast: String, status: String) {
    let meta = compose::failure_body(outcome).unwrap_or_else(|| json!({}));
    notifier
        .emit(
            NotificationEvent::notification(Severity::Error, toast)
                .with_title("OpenRouter Error")
                .with_meta(meta),
        )
        .await;
    notifier.status(Severity::Error, status, true).await;
}

fn cancelled(session: &RetrySession) -> Cancelled {
    tracing::info!(
        "{} - cancelled after {}/{} attempts",
        session.identity,
        session.records.len(),
        session.total_max_attempts
    );
    Cancelled
}
