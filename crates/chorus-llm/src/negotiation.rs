//! Capability negotiation for the reasoning setting
//!
//! Vendors signal "this model does not take that parameter" only through
//! error text, and the wording differs per vendor and changes over time.
//! The rules here recognise those rejections so a call can be retried once
//! without reasoning.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::LlmError;
use crate::types::GenerationSettings;

/// Request fields that carry the reasoning setting across vendors
const REASONING_PARAMS: &str =
    r"(?:reasoning_effort|reasoning|thinking_config|thinkingconfig|thinking_budget|thinkingbudget|budget_tokens|thinking)";

/// Phrasings vendors use to reject a request field
const REJECTION_PHRASES: &str = concat!(
    r"(?:unrecognized request argument|unrecognized (?:field|parameter|argument)",
    r"|unsupported (?:parameter|field|value)|unknown (?:field|parameter|name|argument)",
    r"|extra inputs are not permitted|extra_forbidden|does not support|not supported|not allowed",
    r"|invalid (?:field|parameter))"
);

fn rejection_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(&format!(r"(?is){REJECTION_PHRASES}.*\b{REASONING_PARAMS}\b")).expect("must be valid regex"),
            Regex::new(&format!(r"(?is)\b{REASONING_PARAMS}\b.*{REJECTION_PHRASES}")).expect("must be valid regex"),
        ]
    })
}

/// Whether vendor error text rejects a reasoning parameter
pub fn is_reasoning_rejection(message: &str) -> bool {
    rejection_patterns().iter().any(|re| re.is_match(message))
}

/// Whether a failed call should be retried once with reasoning turned off
///
/// Only vendor rejections (`ServerError`) of a reasoning parameter qualify,
/// and only when reasoning was actually requested.
pub fn should_retry_without_reasoning(settings: &GenerationSettings, error: &LlmError) -> bool {
    if !settings.reasoning_effort.is_enabled() {
        return false;
    }

    match error {
        LlmError::ServerError { message, .. } => is_reasoning_rejection(message),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReasoningEffort;

    fn high() -> GenerationSettings {
        GenerationSettings::default().with_reasoning_effort(ReasoningEffort::High)
    }

    fn server_error(message: &str) -> LlmError {
        LlmError::ServerError {
            status: Some(400),
            message: message.into(),
        }
    }

    #[test]
    fn recognises_vendor_rejections() {
        for message in [
            "Unrecognized request argument supplied: reasoning_effort",
            "Unsupported parameter: 'reasoning_effort' is not supported with this model.",
            "thinking: Extra inputs are not permitted",
            r#"Invalid JSON payload received. Unknown name "thinkingConfig" at 'generation_config': Cannot find field."#,
            r#"{"detail":[{"type":"extra_forbidden","loc":["body","reasoning_effort"],"msg":"Extra inputs are not permitted"}]}"#,
            "This model does not support the reasoning parameter",
            "budget_tokens: unknown field",
        ] {
            assert!(
                should_retry_without_reasoning(&high(), &server_error(message)),
                "{message}"
            );
        }
    }

    #[test]
    fn unrelated_server_errors_do_not_retry() {
        for message in [
            "Internal server error",
            "The model `gpt-9` does not exist",
            "Unsupported parameter: 'top_k'",
            "max_tokens is too large",
        ] {
            assert!(
                !should_retry_without_reasoning(&high(), &server_error(message)),
                "{message}"
            );
        }
    }

    #[test]
    fn other_error_kinds_never_retry() {
        let text = "Unrecognized request argument supplied: reasoning_effort";
        for error in [
            LlmError::Unauthorized { message: text.into() },
            LlmError::RateLimited {
                retry_after: None,
                message: text.into(),
            },
            LlmError::RequestFailed(text.into()),
            LlmError::DecodingFailed(text.into()),
        ] {
            assert!(!should_retry_without_reasoning(&high(), &error));
        }
    }

    #[test]
    fn no_retry_when_reasoning_was_off() {
        let error = server_error("Unrecognized request argument supplied: reasoning_effort");
        assert!(!should_retry_without_reasoning(&GenerationSettings::default(), &error));
    }
}
