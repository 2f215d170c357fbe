//! Shared result type for the genetic operators.

use crate::validation::{validate, ValidationFailure};
use promptevo_core::{ExternalError, OffspringScore};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Why an operator fell back to deterministic text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// The generator replied with unusable text
    Validation(ValidationFailure),
    /// The generator call failed after retries
    External(ExternalError),
}

/// Offspring text produced by an operator. Operators never fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorOutput {
    /// Text for the new candidate
    pub text: String,
    /// Set when `text` is the deterministic fallback
    pub fallback: Option<FallbackReason>,
    /// Advisory performance/diversity score of `text`
    pub advisory: Option<OffspringScore>,
}

impl OperatorOutput {
    /// Whether the text is a fallback.
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Validate a generator reply, or fall back to `fallback_text`.
pub(crate) fn accept_or_fallback(
    operator: &str,
    reply: Result<String, ExternalError>,
    fallback_text: impl FnOnce() -> String,
) -> (String, Option<FallbackReason>) {
    let reason = match reply {
        Ok(raw) => match validate(&raw) {
            Ok(text) => return (text, None),
            Err(failure) => FallbackReason::Validation(failure),
        },
        Err(err) => FallbackReason::External(err),
    };

    match &reason {
        FallbackReason::Validation(failure) => warn!("{} output rejected ({}), using fallback", operator, failure),
        FallbackReason::External(err) => warn!("{} generator failed ({}), using fallback", operator, err),
    }
    (fallback_text(), Some(reason))
}
