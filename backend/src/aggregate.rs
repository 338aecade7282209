//! Read-side aggregation over a user's expenses.
//!
//! Pure functions over slices; the store fetches, these compute. All money
//! math is integer cents.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use crate::models::expense::Expense;

/// Roasts included in the monthly summary.
const RECENT_ROAST_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub monthly_total_cents: i64,
    pub recent_roasts: Vec<String>,
}

/// One month of the trailing-12 series. Months without expenses produce no
/// row; the chart shows gaps, not zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRow {
    /// "YYYY-MM"
    pub month: String,
    pub total_cents: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: &'static str,
    pub total_cents: i64,
}

/// Calendar-month key of a timestamp.
pub fn month_key(date: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// First instant of the month `now` falls in.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// First instant of the month `months` calendar months before `now`.
pub fn start_of_month_back(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total = now.year() * 12 + now.month() as i32 - 1 - months as i32;
    let (year, month) = (total.div_euclid(12), total.rem_euclid(12) as u32 + 1);
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Current-month total plus the five most recent roasts.
pub fn monthly_summary(expenses: &[Expense], now: DateTime<Utc>) -> MonthlySummary {
    let start = start_of_month(now);
    let mut this_month: Vec<&Expense> = expenses.iter().filter(|e| e.date >= start).collect();
    this_month.sort_by(|a, b| b.date.cmp(&a.date));

    MonthlySummary {
        monthly_total_cents: this_month.iter().map(|e| e.amount_cents).sum(),
        recent_roasts: this_month
            .iter()
            .take(RECENT_ROAST_COUNT)
            .map(|e| e.roast.clone())
            .collect(),
    }
}

/// Trailing-12-month series, ascending by month key, gaps kept.
pub fn monthly_series(expenses: &[Expense], now: DateTime<Utc>) -> Vec<MonthRow> {
    let start = start_of_month_back(now, 11);
    let mut months: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for expense in expenses.iter().filter(|e| e.date >= start) {
        let entry = months.entry(month_key(expense.date)).or_insert((0, 0));
        entry.0 += expense.amount_cents;
        entry.1 += 1;
    }

    months
        .into_iter()
        .map(|(month, (total_cents, count))| MonthRow {
            month,
            total_cents,
            count,
        })
        .collect()
}

/// Full-history totals per calendar month, ascending by month key. Feeds the
/// annual report's worst-month and distinct-month figures.
pub fn monthly_totals(expenses: &[Expense]) -> Vec<(String, i64)> {
    let mut months: BTreeMap<String, i64> = BTreeMap::new();
    for expense in expenses {
        *months.entry(month_key(expense.date)).or_insert(0) += expense.amount_cents;
    }
    months.into_iter().collect()
}

/// Full-history totals per category, descending by total, name-ascending on
/// ties.
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&'static str, i64> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.as_str()).or_insert(0) += expense.amount_cents;
    }

    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total_cents)| CategoryTotal {
            category,
            total_cents,
        })
        .collect();
    // BTreeMap iteration already gave name-ascending; stable sort keeps that
    // order within equal totals.
    out.sort_by(|a, b| b.total_cents.cmp(&a.total_cents));
    out
}

/// Up to three distinct merchant names per category, for the advice prompt.
pub fn merchant_samples(expenses: &[Expense]) -> Vec<(&'static str, Vec<String>)> {
    let mut samples: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    for expense in expenses {
        let merchants = samples.entry(expense.category.as_str()).or_default();
        if merchants.len() < 3 && !merchants.contains(&expense.description) {
            merchants.push(expense.description.clone());
        }
    }
    samples.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::Category;
    use crate::models::expense::Source;
    use chrono::Duration;

    fn expense(cents: i64, date: DateTime<Utc>, category: Category, roast: &str) -> Expense {
        Expense {
            id: 1,
            user_id: "u1".to_string(),
            amount_cents: cents,
            description: format!("merchant-{cents}"),
            date,
            category,
            roast: roast.to_string(),
            source: Source::Receipt,
            created_at: date,
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_start_of_month_back_crosses_year_boundary() {
        let now = at(2024, 2, 10);
        assert_eq!(start_of_month_back(now, 11), at(2023, 3, 1) - Duration::hours(12));
        assert_eq!(start_of_month_back(now, 0), at(2024, 2, 1) - Duration::hours(12));
    }

    #[test]
    fn test_monthly_summary_scopes_to_current_month() {
        let now = at(2024, 3, 20);
        let expenses = vec![
            expense(1050, at(2024, 3, 5), Category::FoodAndDrink, "r1"),
            expense(2999, at(2024, 3, 15), Category::Shopping, "r2"),
            expense(100, at(2024, 3, 18), Category::Other, "r3"),
            expense(99999, at(2024, 2, 28), Category::Shopping, "old"),
        ];

        let summary = monthly_summary(&expenses, now);
        assert_eq!(summary.monthly_total_cents, 4149);
        assert_eq!(summary.recent_roasts, vec!["r3", "r2", "r1"]);
    }

    #[test]
    fn test_monthly_summary_caps_roasts_at_five() {
        let now = at(2024, 3, 20);
        let expenses: Vec<Expense> = (1..=8)
            .map(|d| expense(100, at(2024, 3, d), Category::Other, &format!("r{d}")))
            .collect();

        let summary = monthly_summary(&expenses, now);
        assert_eq!(summary.recent_roasts.len(), 5);
        assert_eq!(summary.recent_roasts[0], "r8");
    }

    #[test]
    fn test_series_keeps_gaps_instead_of_zero_filling() {
        let now = at(2024, 6, 15);
        let expenses = vec![
            expense(500, at(2024, 6, 1), Category::Other, "r"),
            expense(300, at(2024, 3, 1), Category::Other, "r"),
        ];

        let series = monthly_series(&expenses, now);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].month, "2024-03");
        assert_eq!(series[1].month, "2024-06");
    }

    #[test]
    fn test_series_excludes_months_older_than_trailing_twelve() {
        let now = at(2024, 6, 15);
        let expenses = vec![
            expense(500, at(2024, 6, 1), Category::Other, "r"),
            // 2023-07 is exactly 11 months back, still in range.
            expense(300, at(2023, 7, 2), Category::Other, "r"),
            // 2023-06 fell off.
            expense(100, at(2023, 6, 30), Category::Other, "r"),
        ];

        let series = monthly_series(&expenses, now);
        let months: Vec<&str> = series.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["2023-07", "2024-06"]);
    }

    #[test]
    fn test_series_sums_and_counts_per_month() {
        let now = at(2024, 6, 15);
        let expenses = vec![
            expense(1050, at(2024, 5, 1), Category::Other, "r"),
            expense(2999, at(2024, 5, 20), Category::Other, "r"),
        ];

        let series = monthly_series(&expenses, now);
        assert_eq!(
            series,
            vec![MonthRow {
                month: "2024-05".to_string(),
                total_cents: 4049,
                count: 2,
            }]
        );
    }

    #[test]
    fn test_category_totals_sort_descending_then_by_name() {
        let now = at(2024, 3, 1);
        let expenses = vec![
            expense(500, now, Category::Shopping, "r"),
            expense(500, now, Category::Health, "r"),
            expense(900, now, Category::FoodAndDrink, "r"),
        ];

        let totals = category_totals(&expenses);
        assert_eq!(totals[0].category, "Food & Drink");
        // Equal totals: alphabetical.
        assert_eq!(totals[1].category, "Health");
        assert_eq!(totals[2].category, "Shopping");
    }

    #[test]
    fn test_merchant_samples_caps_at_three_distinct() {
        let now = at(2024, 3, 1);
        let mut expenses: Vec<Expense> = (1..=5)
            .map(|i| {
                let mut e = expense(100 * i, now, Category::FoodAndDrink, "r");
                e.description = format!("Cafe {i}");
                e
            })
            .collect();
        let mut dup = expenses[0].clone();
        dup.description = "Cafe 1".to_string();
        expenses.push(dup);

        let samples = merchant_samples(&expenses);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].1.len(), 3);
    }

    #[test]
    fn test_empty_history_produces_empty_aggregates() {
        let now = at(2024, 3, 1);
        assert_eq!(monthly_summary(&[], now).monthly_total_cents, 0);
        assert!(monthly_series(&[], now).is_empty());
        assert!(category_totals(&[]).is_empty());
    }
}
