//! Message sanitization: arbitrary input is reduced to a restricted HTML
//! subset before it is stored or rendered. Tags outside the allow-list are
//! removed together with their content (not unwrapped), attributes are
//! filtered one by one, and the deny-list wins over the allow-list.

pub mod policy;
mod scanner;

pub use policy::Policy;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    /// Non-empty input reduced to nothing: the message was all disallowed
    /// markup and must not be sent.
    #[error("message contained only disallowed content and was removed")]
    RejectedMessage,
}

/// Sanitize with the fixed default policy.
pub fn sanitize(input: &str) -> String {
    sanitize_with(&Policy::default(), input)
}

/// Sanitize with an explicit policy. Pure; idempotent over its own output.
pub fn sanitize_with(policy: &Policy, input: &str) -> String {
    scanner::scan(policy, input)
}

/// Send-side entry point: sanitizes and rejects messages that sanitize to
/// nothing. Callers must surface the rejection and skip the network call.
pub fn sanitize_submission(input: &str) -> Result<String, SanitizeError> {
    let clean = sanitize(input);
    if !input.trim().is_empty() && clean.trim().is_empty() {
        return Err(SanitizeError::RejectedMessage);
    }
    Ok(clean)
}
