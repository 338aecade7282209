use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed expense category vocabulary.
///
/// Model output is coerced into this set; anything unrecognized becomes
/// [`Category::Other`]. The wire labels are the product's display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Drink")]
    FoodAndDrink,
    Shopping,
    Transport,
    Entertainment,
    Health,
    Subscriptions,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FoodAndDrink => "Food & Drink",
            Category::Shopping => "Shopping",
            Category::Transport => "Transport",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Subscriptions => "Subscriptions",
            Category::Other => "Other",
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Category::FoodAndDrink,
            Category::Shopping,
            Category::Transport,
            Category::Entertainment,
            Category::Health,
            Category::Subscriptions,
            Category::Other,
        ]
    }

    /// Coerce a free-form label into the vocabulary. Unrecognized input is
    /// `Other`, never an error.
    pub fn from_label(label: &str) -> Category {
        let label = label.trim();
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Category::Other)
    }

    /// Comma-separated vocabulary for constrained classification prompts.
    pub fn prompt_vocabulary() -> String {
        Category::all()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_exact_match() {
        assert_eq!(Category::from_label("Food & Drink"), Category::FoodAndDrink);
        assert_eq!(Category::from_label("Subscriptions"), Category::Subscriptions);
    }

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(Category::from_label("transport"), Category::Transport);
        assert_eq!(Category::from_label("  HEALTH "), Category::Health);
    }

    #[test]
    fn test_unrecognized_label_coerces_to_other() {
        assert_eq!(Category::from_label("Groceries"), Category::Other);
        assert_eq!(Category::from_label("Crypto Losses"), Category::Other);
        assert_eq!(Category::from_label(""), Category::Other);
    }

    #[test]
    fn test_serializes_with_display_label() {
        let json = serde_json::to_string(&Category::FoodAndDrink).unwrap();
        assert_eq!(json, "\"Food & Drink\"");
    }

    #[test]
    fn test_prompt_vocabulary_lists_every_category() {
        let vocab = Category::prompt_vocabulary();
        for category in Category::all() {
            assert!(vocab.contains(category.as_str()));
        }
    }
}
