//! Annual report and financial advice synthesis.
//!
//! Numeric facts are computed deterministically from the expense history and
//! are always returned. The model is only trusted with narrative fields, and
//! every narrative field carries its own fallback, so a misbehaving model can
//! never fail a report.

use serde::Serialize;
use serde_json::Value;

use crate::aggregate::{self, CategoryTotal};
use crate::llm::parse::{i64_field, str_field};
use crate::llm::{LlmClient, ModelJson};
use crate::models::expense::Expense;

/// Expenses required before an annual report can be generated.
pub const MIN_REPORT_EXPENSES: usize = 3;

const TOP_CATEGORY_COUNT: usize = 5;
const IMPROVEMENT_COUNT: usize = 3;

/// Heuristic savings estimate when the advice call fails: 15% of total spend.
const FALLBACK_SAVINGS_PCT: i64 = 15;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorstMonth {
    pub month: String,
    pub total_cents: i64,
}

/// Deterministic half of the annual report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFacts {
    pub total_cents: i64,
    pub top_categories: Vec<CategoryTotal>,
    pub worst_month: Option<WorstMonth>,
    pub average_monthly_cents: i64,
    pub projection_5yr_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualReport {
    #[serde(flatten)]
    pub facts: ReportFacts,
    pub roast: String,
    pub behavioral_analysis: String,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceBreakdown {
    pub category: String,
    pub total_cents: i64,
    pub insight: String,
    pub alternatives: String,
    pub potential_saving_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialAdvice {
    pub advice: String,
    pub top_category: Option<String>,
    pub savings_potential_cents: i64,
    pub breakdown: Vec<AdviceBreakdown>,
}

/// Compute the numeric facts of the annual report.
pub fn compute_facts(expenses: &[Expense]) -> ReportFacts {
    let total_cents: i64 = expenses.iter().map(|e| e.amount_cents).sum();

    let mut top_categories = aggregate::category_totals(expenses);
    top_categories.truncate(TOP_CATEGORY_COUNT);

    let months = aggregate::monthly_totals(expenses);
    let worst_month = months
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(month, total)| WorstMonth {
            month: month.clone(),
            total_cents: *total,
        });

    let distinct_months = months.len() as i64;
    let average_monthly_cents = if distinct_months > 0 {
        total_cents / distinct_months
    } else {
        0
    };

    ReportFacts {
        total_cents,
        top_categories,
        worst_month,
        average_monthly_cents,
        projection_5yr_cents: average_monthly_cents * 12 * 5,
    }
}

fn dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

fn facts_prompt(facts: &ReportFacts) -> String {
    let categories = facts
        .top_categories
        .iter()
        .map(|c| format!("{}: {}", c.category, dollars(c.total_cents)))
        .collect::<Vec<_>>()
        .join(", ");
    let worst = facts
        .worst_month
        .as_ref()
        .map(|w| format!("{} ({})", w.month, dollars(w.total_cents)))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "Total spend: {}. Top categories: {}. Worst month: {}. \
         Average monthly spend: {}. Projected 5-year spend at this rate: {}.",
        dollars(facts.total_cents),
        categories,
        worst,
        dollars(facts.average_monthly_cents),
        dollars(facts.projection_5yr_cents),
    )
}

fn fallback_analysis(facts: &ReportFacts) -> String {
    match facts.top_categories.first() {
        Some(top) => format!(
            "Most of your money went to {} ({}). At {} per month you are on track to spend {} over five years.",
            top.category,
            dollars(top.total_cents),
            dollars(facts.average_monthly_cents),
            dollars(facts.projection_5yr_cents),
        ),
        None => "Not enough spending history for a behavioral read.".to_string(),
    }
}

fn fallback_improvements() -> Vec<String> {
    vec![
        "Set a weekly spending cap for your top category.".to_string(),
        "Review your subscriptions and cancel one you forgot about.".to_string(),
        "Wait 24 hours before any purchase over $50.".to_string(),
    ]
}

/// Build the full annual report: deterministic facts plus one model call for
/// the narrative fields, each falling back individually.
pub async fn annual_report(llm: &LlmClient, expenses: &[Expense]) -> AnnualReport {
    let facts = compute_facts(expenses);

    let system = "You are a sassy financial analyst writing a year-in-review. \
        Respond with JSON: {\"roast\": string, \"behavioralAnalysis\": string, \
        \"improvements\": [string, string, string]}.";
    let narrative = match llm.complete_json(system, &facts_prompt(&facts)).await {
        Ok(raw) => ModelJson::from_completion(&raw).into_value(),
        Err(e) => {
            tracing::warn!(error = %e, "annual report narrative call failed");
            None
        }
    };

    let roast = narrative
        .as_ref()
        .and_then(|v| str_field(v, "roast"))
        .unwrap_or_else(|| "A year of spending so bold even I need a moment.".to_string());
    let behavioral_analysis = narrative
        .as_ref()
        .and_then(|v| str_field(v, "behavioralAnalysis"))
        .unwrap_or_else(|| fallback_analysis(&facts));
    let mut improvements: Vec<String> = narrative
        .as_ref()
        .and_then(|v| v.get("improvements"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .take(IMPROVEMENT_COUNT)
                .collect()
        })
        .unwrap_or_default();
    if improvements.len() < IMPROVEMENT_COUNT {
        improvements = fallback_improvements();
    }

    AnnualReport {
        facts,
        roast,
        behavioral_analysis,
        improvements,
    }
}

fn fallback_advice(totals: &[CategoryTotal], total_cents: i64) -> FinancialAdvice {
    FinancialAdvice {
        advice: "Trim your biggest category first; small recurring cuts beat one-off austerity."
            .to_string(),
        top_category: totals.first().map(|t| t.category.to_string()),
        savings_potential_cents: total_cents * FALLBACK_SAVINGS_PCT / 100,
        breakdown: Vec::new(),
    }
}

/// One uncached model call over the category/merchant summary. Parse failure
/// degrades to the 15% heuristic, never to an error.
pub async fn financial_advice(llm: &LlmClient, expenses: &[Expense]) -> FinancialAdvice {
    let totals = aggregate::category_totals(expenses);
    let total_cents: i64 = totals.iter().map(|t| t.total_cents).sum();
    let merchants = aggregate::merchant_samples(expenses);

    let summary = totals
        .iter()
        .map(|t| {
            let names = merchants
                .iter()
                .find(|(category, _)| *category == t.category)
                .map(|(_, names)| names.join(", "))
                .unwrap_or_default();
            format!("{}: {} (e.g. {})", t.category, dollars(t.total_cents), names)
        })
        .collect::<Vec<_>>()
        .join("; ");

    let system = "You are a pragmatic personal-finance advisor. Given spending by category, \
        respond with JSON: {\"advice\": string, \"topCategory\": string, \
        \"savingsPotentialCents\": integer, \"breakdown\": [{\"category\": string, \
        \"insight\": string, \"alternatives\": string, \"potentialSavingCents\": integer}]}.";

    let parsed = match llm.complete_json(system, &summary).await {
        Ok(raw) => ModelJson::from_completion(&raw).into_value(),
        Err(e) => {
            tracing::warn!(error = %e, "financial advice call failed");
            None
        }
    };

    let Some(value) = parsed else {
        return fallback_advice(&totals, total_cents);
    };

    let (Some(advice), Some(savings)) = (
        str_field(&value, "advice"),
        i64_field(&value, "savingsPotentialCents"),
    ) else {
        return fallback_advice(&totals, total_cents);
    };

    let breakdown = value
        .get("breakdown")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let category = str_field(item, "category")?;
                    let total = totals
                        .iter()
                        .find(|t| t.category.eq_ignore_ascii_case(&category))
                        .map(|t| t.total_cents)
                        .unwrap_or(0);
                    Some(AdviceBreakdown {
                        category,
                        total_cents: total,
                        insight: str_field(item, "insight").unwrap_or_default(),
                        alternatives: str_field(item, "alternatives").unwrap_or_default(),
                        potential_saving_cents: i64_field(item, "potentialSavingCents")
                            .unwrap_or(0),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    FinancialAdvice {
        advice,
        top_category: str_field(&value, "topCategory")
            .or_else(|| totals.first().map(|t| t.category.to_string())),
        savings_potential_cents: savings,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::Category;
    use crate::models::expense::Source;
    use chrono::{TimeZone, Utc};

    fn expense(cents: i64, year: i32, month: u32, category: Category) -> Expense {
        let date = Utc.with_ymd_and_hms(year, month, 10, 0, 0, 0).unwrap();
        Expense {
            id: 1,
            user_id: "u1".to_string(),
            amount_cents: cents,
            description: "m".to_string(),
            date,
            category,
            roast: "r".to_string(),
            source: Source::Manual,
            created_at: date,
        }
    }

    #[test]
    fn test_facts_average_and_projection() {
        let expenses = vec![
            expense(10_000, 2024, 1, Category::FoodAndDrink),
            expense(20_000, 2024, 2, Category::Shopping),
            expense(30_000, 2024, 3, Category::Shopping),
        ];

        let facts = compute_facts(&expenses);
        assert_eq!(facts.total_cents, 60_000);
        // Three distinct months.
        assert_eq!(facts.average_monthly_cents, 20_000);
        assert_eq!(facts.projection_5yr_cents, 20_000 * 60);
    }

    #[test]
    fn test_facts_worst_month_is_the_highest_total() {
        let expenses = vec![
            expense(1000, 2024, 1, Category::Other),
            expense(5000, 2024, 2, Category::Other),
            expense(4000, 2024, 2, Category::Other),
            expense(2000, 2024, 3, Category::Other),
        ];

        let facts = compute_facts(&expenses);
        let worst = facts.worst_month.unwrap();
        assert_eq!(worst.month, "2024-02");
        assert_eq!(worst.total_cents, 9000);
    }

    #[test]
    fn test_facts_top_categories_capped_at_five() {
        let expenses: Vec<Expense> = Category::all()
            .iter()
            .enumerate()
            .map(|(i, c)| expense(100 * (i as i64 + 1), 2024, 1, *c))
            .collect();

        let facts = compute_facts(&expenses);
        assert_eq!(facts.top_categories.len(), 5);
        // Highest total first.
        assert_eq!(facts.top_categories[0].total_cents, 700);
    }

    #[test]
    fn test_facts_on_empty_history_are_all_zero() {
        let facts = compute_facts(&[]);
        assert_eq!(facts.total_cents, 0);
        assert_eq!(facts.average_monthly_cents, 0);
        assert_eq!(facts.projection_5yr_cents, 0);
        assert!(facts.worst_month.is_none());
    }

    #[tokio::test]
    async fn test_report_facts_survive_a_dead_model() {
        let llm = LlmClient::new("http://127.0.0.1:1", "", "test-model");
        let expenses = vec![
            expense(1050, 2024, 1, Category::FoodAndDrink),
            expense(2999, 2024, 2, Category::Shopping),
            expense(100, 2024, 3, Category::Other),
        ];

        let report = annual_report(&llm, &expenses).await;
        assert_eq!(report.facts.total_cents, 4149);
        assert!(!report.roast.is_empty());
        assert!(!report.behavioral_analysis.is_empty());
        assert_eq!(report.improvements.len(), 3);
    }

    #[tokio::test]
    async fn test_advice_falls_back_to_fifteen_percent_heuristic() {
        let llm = LlmClient::new("http://127.0.0.1:1", "", "test-model");
        let expenses = vec![
            expense(10_000, 2024, 1, Category::FoodAndDrink),
            expense(10_000, 2024, 2, Category::Shopping),
        ];

        let advice = financial_advice(&llm, &expenses).await;
        assert_eq!(advice.savings_potential_cents, 3000);
        assert!(advice.top_category.is_some());
        assert!(advice.breakdown.is_empty());
    }
}
