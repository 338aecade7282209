//! Roast generation.
//!
//! One model call per expense, tone-specific system prompt, and a hard
//! guarantee: this module never errors and never returns an empty string, so
//! a persisted expense always carries a roast.

use crate::llm::{LlmClient, LlmError};
use crate::models::category::Category;

/// Substituted whenever the model fails or returns nothing.
pub const FALLBACK_ROAST: &str = "I have no words.";

/// Roast delivery style. Non-default tones are a premium feature; free-tier
/// requests are forced to Savage at the call site, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Savage,
    Playful,
    Supportive,
}

impl Tone {
    /// Lenient request parsing: unknown or missing tones are Savage.
    pub fn from_request(raw: Option<&str>) -> Tone {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("playful") => Tone::Playful,
            Some(s) if s.eq_ignore_ascii_case("supportive") => Tone::Supportive,
            _ => Tone::Savage,
        }
    }

    /// One-word descriptor for embedding in other prompts (receipt
    /// extraction asks for the roast inline).
    pub fn adjective(&self) -> &'static str {
        match self {
            Tone::Savage => "savage",
            Tone::Playful => "playful",
            Tone::Supportive => "supportive",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            Tone::Savage => {
                "You are a savage, judgmental financial assistant. Given one purchase, \
                 write a single short, brutal roast of the spender. No preamble, just the roast."
            }
            Tone::Playful => {
                "You are a playful, teasing financial assistant. Given one purchase, \
                 write a single short, lighthearted roast of the spender. No preamble, just the roast."
            }
            Tone::Supportive => {
                "You are a warm but honest financial assistant. Given one purchase, \
                 write a single short, gently teasing comment that still nudges the spender \
                 to do better. No preamble, just the comment."
            }
        }
    }
}

/// Generate a roast for one expense. Infallible by contract.
pub async fn generate(
    llm: &LlmClient,
    description: &str,
    amount_cents: i64,
    category: Category,
    tone: Tone,
) -> String {
    let user = format!(
        "Purchase: {} - ${}.{:02} ({})",
        description,
        amount_cents / 100,
        amount_cents % 100,
        category,
    );

    match llm.complete_text(tone.system_prompt(), &user).await {
        Ok(roast) => {
            let roast = roast.trim();
            if roast.is_empty() {
                FALLBACK_ROAST.to_string()
            } else {
                roast.to_string()
            }
        }
        Err(e) => {
            log_failure(&e);
            FALLBACK_ROAST.to_string()
        }
    }
}

fn log_failure(e: &LlmError) {
    tracing::warn!(error = %e, "roast generation failed, using fallback");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_unknown_tones_default_to_savage() {
        assert_eq!(Tone::from_request(None), Tone::Savage);
        assert_eq!(Tone::from_request(Some("")), Tone::Savage);
        assert_eq!(Tone::from_request(Some("sarcastic")), Tone::Savage);
    }

    #[test]
    fn test_known_tones_parse_case_insensitively() {
        assert_eq!(Tone::from_request(Some("playful")), Tone::Playful);
        assert_eq!(Tone::from_request(Some("Supportive")), Tone::Supportive);
        assert_eq!(Tone::from_request(Some(" SAVAGE ")), Tone::Savage);
    }

    #[test]
    fn test_each_tone_has_a_distinct_prompt() {
        let prompts = [
            Tone::Savage.system_prompt(),
            Tone::Playful.system_prompt(),
            Tone::Supportive.system_prompt(),
        ];
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert_ne!(prompts[0], prompts[2]);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_yields_fallback_not_error() {
        let llm = LlmClient::new("http://127.0.0.1:1", "", "test-model");
        let roast = generate(&llm, "Coffee", 650, Category::FoodAndDrink, Tone::Savage).await;
        assert_eq!(roast, FALLBACK_ROAST);
    }
}
