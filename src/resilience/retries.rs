//! Failure classification for the submission worker.
//!
//! The worker decides between "retry later" and "give up" from the error text
//! alone, so errors raised anywhere below it (transport, node, signer) are
//! classified the same way.

use std::fmt;

/// What the worker should do with a failed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connectivity or timeout problem; worth another attempt.
    Recoverable,
    /// Anything else; record the failure and stop.
    Terminal,
}

const RECOVERABLE_MARKERS: [&str; 2] = ["connection", "timeout"];

/// Classify a failure message. Case-insensitive substring match.
pub fn classify(message: &str) -> ErrorClass {
    let lowered = message.to_lowercase();
    if RECOVERABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        ErrorClass::Recoverable
    } else {
        ErrorClass::Terminal
    }
}

/// Classify any displayable error.
pub fn classify_error(error: &impl fmt::Display) -> ErrorClass {
    classify(&error.to_string())
}
