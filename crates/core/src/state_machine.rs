//! Resource lifecycle state machine and scheduler intent derivation.
//!
//! The lifecycle is:
//!
//! ```text
//! CREATING -> STARTING -> RUNNING -> STOPPING -> STOPPED -> STARTING ...
//! {any non-terminal} -> TERMINATING -> TERMINATED
//! {any non-terminal} -> ERROR
//! ```
//!
//! CREATING only moves forward, TERMINATED is absorbing, and ERROR re-enters
//! the lifecycle through whichever in-flight state the recorded retry intent
//! drives it back into.

use crate::error::CoreError;
use crate::status::{Intent, ResourceStatus};

use ResourceStatus::*;

/// Returns the set of valid target statuses reachable from `from`.
///
/// TERMINATED returns an empty slice: it is the absorbing soft-delete
/// marker and nothing may leave it.
pub fn valid_transitions(from: ResourceStatus) -> &'static [ResourceStatus] {
    match from {
        Creating => &[Starting, Terminating, Error],
        Starting => &[Running, Terminating, Error],
        Running => &[Stopping, Terminating, Error],
        Stopping => &[Stopped, Terminating, Error],
        Stopped => &[Starting, Terminating, Error],
        Terminating => &[Terminated, Error],
        Terminated => &[],
        // Retry re-entry: the listener handling the recorded retry intent
        // drives the row back into the matching in-flight state.
        Error => &[Starting, Stopping, Terminating, Error],
    }
}

/// Check whether a transition from `from` to `to` is valid.
pub fn can_transition(from: ResourceStatus, to: ResourceStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a transition, returning a descriptive error for invalid ones.
pub fn validate_transition(from: ResourceStatus, to: ResourceStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition(format!(
            "{} ({}) -> {} ({})",
            from.name(),
            from.id(),
            to.name(),
            to.id()
        )))
    }
}

/// Whether a status is terminal for scheduling purposes.
pub fn is_terminal(status: ResourceStatus) -> bool {
    status == Terminated
}

/// Statuses the scheduler considers "due": rows in these states have work
/// pending and are eligible for claiming (lease permitting). RUNNING and
/// STOPPED are steady states and are never claimed; TERMINATED is absorbing.
pub const DUE_STATUSES: [ResourceStatus; 5] = [Creating, Starting, Stopping, Terminating, Error];

/// Derive the intent to emit for a freshly claimed row.
///
/// - CREATING asks for the initial backend create.
/// - The in-flight states poll the backend until it reports readiness.
/// - ERROR re-emits the intent recorded when the failure happened; a row in
///   ERROR with no recorded intent cannot be retried meaningfully and yields
///   `None` (the scheduler logs it and leaves it leased).
/// - Steady and terminal states yield `None`.
pub fn intent_for(status: ResourceStatus, retry_intent: Option<Intent>) -> Option<Intent> {
    match status {
        Creating => Some(Intent::Create),
        Starting | Stopping | Terminating => Some(Intent::StatusCheck),
        Error => retry_intent,
        Running | Stopped | Terminated => None,
    }
}

/// The steady state an in-flight status is converging toward, if any.
///
/// Used by the status-check listener to decide when the backend's reported
/// status means "done".
pub fn target_of(status: ResourceStatus) -> Option<ResourceStatus> {
    match status {
        Starting => Some(Running),
        Stopping => Some(Stopped),
        Terminating => Some(Terminated),
        _ => None,
    }
}
