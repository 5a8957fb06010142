use std::fmt::Write;
use std::str::FromStr;

use crate::models::expense::currency_symbol;
use crate::models::SpendingAnalytics;
use crate::services::analytics::{format_cents, SpendingSummary};

pub const SYSTEM_PROMPT: &str = "You are a financial insights assistant.";

/// Sections the model is asked to answer with, in order.
pub const INSIGHT_SECTIONS: [&str; 6] = [
    "Key Highlights",
    "Category Breakdown",
    "Behavior Patterns",
    "Savings Tips",
    "Prediction",
    "Alerts",
];

/// How the aggregated data is rendered into the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptStyle {
    /// Headline statistics only: total, top category, trend, peak day.
    #[default]
    Summary,
    /// Every bucket collection as JSON.
    Full,
}

impl FromStr for PromptStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "full" | "raw" => Ok(Self::Full),
            _ => Err(()),
        }
    }
}

/// Render `analytics` into the user prompt. Output depends only on the
/// inputs, so identical data always produces an identical prompt.
pub fn build_prompt(analytics: &SpendingAnalytics, style: PromptStyle, currency: &str) -> String {
    let data = match style {
        PromptStyle::Summary => summary_block(analytics, currency),
        PromptStyle::Full => full_block(analytics),
    };

    let mut prompt = String::from(
        "You are a financial insights AI. Give short bullet insights only. No long paragraphs.\n\n",
    );
    let _ = writeln!(prompt, "DATA:\n{}", data.trim_end());
    if analytics.is_empty() {
        prompt.push_str("No expenses have been recorded yet; keep the insights general.\n");
    }
    prompt.push_str(
        "\nReturn structured insights using exactly these sections, \
         each followed by one to three short bullet points:\n",
    );
    for section in INSIGHT_SECTIONS {
        let _ = writeln!(prompt, "{}", section);
    }
    prompt
}

fn summary_block(analytics: &SpendingAnalytics, currency: &str) -> String {
    let summary = SpendingSummary::from_analytics(analytics);
    let symbol = currency_symbol(currency);
    let money = |cents: i64| format!("{}{}", symbol, format_cents(cents));

    let mut out = String::new();
    let _ = writeln!(out, "Total spend: {}", money(summary.total_cents));
    match &summary.top_category {
        Some(top) => {
            let _ = writeln!(
                out,
                "Top category: {} ({})",
                top.category,
                money(top.total_cents)
            );
        }
        None => out.push_str("Top category: none\n"),
    }
    let _ = writeln!(out, "Spending trend: {}", summary.trend.as_str());
    match &summary.peak_day {
        Some(day) => {
            let _ = writeln!(
                out,
                "Highest spend day: {} ({})",
                day.date,
                money(day.total_cents)
            );
        }
        None => out.push_str("Highest spend day: none\n"),
    }
    let _ = writeln!(out, "Months recorded: {}", summary.months_recorded);
    out
}

fn full_block(analytics: &SpendingAnalytics) -> String {
    let json = serde_json::to_string_pretty(analytics).unwrap_or_else(|_| "{}".to_string());
    format!("Amounts are in cents.\n{}", json)
}
