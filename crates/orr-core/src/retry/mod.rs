//! Retry engine.
//!
//! Failures are classified (`classify`), attempts are laid out in bursts and
//! cycles (`schedule`), waits are jittered and cancellable (`delay`), and
//! `run_session` drives one request through all of it.

mod classify;
mod delay;
mod error;
mod run;
mod schedule;
mod session;

pub use classify::{classify, classify_http_status, error_kind, Classification, ErrorKind};
pub use delay::{jittered, wait, DelayRange};
pub use error::AttemptError;
pub use run::run_session;
pub use schedule::{AttemptSlot, Pause, Schedule, Step};
pub use session::{
    format_elapsed, AttemptOutcome, AttemptRecord, Cancelled, Identity, Outcome, RetrySession,
};
