//! Token-usage metering and cost estimation.
//!
//! Every successful completion records its token counts here. The meter is
//! an explicit, injectable object (construct once, wrap in `Arc`, share by
//! clone) so tests can substitute their own instance and concurrent runs
//! never cross-contaminate counters.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, warn};

/// USD per 1M tokens: `(model key, prompt rate, completion rate)`.
/// Matched by the longest key contained in the reported model name, so
/// dated variants like `gpt-4o-mini-2024-07-18` still price correctly.
const PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4-turbo", 10.00, 30.00),
    ("gpt-4", 30.00, 60.00),
    ("gpt-3.5-turbo", 0.50, 1.50),
    ("gemini-2.5-pro", 1.25, 10.00),
    ("gemini-2.5-flash", 0.10, 0.40),
    ("gemini-2.0-flash", 0.10, 0.40),
    ("gemini-1.5-flash", 0.075, 0.30),
    ("gemini-1.5-pro", 1.25, 5.00),
];

/// Accumulated usage for one model.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModelUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub call_count: u64,
}

impl ModelUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Priced usage for one model in a [`UsageReport`].
#[derive(Clone, Debug, Serialize)]
pub struct ModelCost {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub call_count: u64,
    pub prompt_cost: f64,
    pub completion_cost: f64,
    pub total_cost: f64,
}

/// Session-level usage snapshot with estimated cost.
#[derive(Clone, Debug, Serialize)]
pub struct UsageReport {
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
    /// USD, rounded to 4 decimals. Models without a price entry contribute
    /// tokens but no cost.
    pub total_cost: f64,
    pub models: BTreeMap<String, ModelCost>,
}

/// Thread-safe usage accumulator.
#[derive(Debug, Default)]
pub struct UsageMeter {
    inner: Mutex<BTreeMap<String, ModelUsage>>,
}

impl UsageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call's token counts for `model`.
    pub fn record(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) {
        let mut usage = self.inner.lock().expect("usage meter poisoned");
        let entry = usage.entry(model.to_string()).or_default();
        entry.prompt_tokens += prompt_tokens;
        entry.completion_tokens += completion_tokens;
        entry.call_count += 1;
        debug!("usage recorded: model={model} prompt={prompt_tokens} completion={completion_tokens}");
    }

    /// Clears all counters for a new session.
    pub fn reset(&self) {
        self.inner.lock().expect("usage meter poisoned").clear();
    }

    /// Builds a priced snapshot of the current counters.
    pub fn report(&self) -> UsageReport {
        let usage = self.inner.lock().expect("usage meter poisoned");

        let mut report = UsageReport {
            total_prompt_tokens: 0,
            total_completion_tokens: 0,
            total_tokens: 0,
            total_cost: 0.0,
            models: BTreeMap::new(),
        };

        for (model, counts) in usage.iter() {
            report.total_prompt_tokens += counts.prompt_tokens;
            report.total_completion_tokens += counts.completion_tokens;
            report.total_tokens += counts.total_tokens();

            let Some((_, prompt_rate, completion_rate)) = lookup_pricing(model) else {
                warn!("no pricing found for model: {model}");
                continue;
            };

            let prompt_cost = counts.prompt_tokens as f64 / 1_000_000.0 * prompt_rate;
            let completion_cost =
                counts.completion_tokens as f64 / 1_000_000.0 * completion_rate;
            let total_cost = prompt_cost + completion_cost;
            report.total_cost += total_cost;

            report.models.insert(
                model.clone(),
                ModelCost {
                    prompt_tokens: counts.prompt_tokens,
                    completion_tokens: counts.completion_tokens,
                    total_tokens: counts.total_tokens(),
                    call_count: counts.call_count,
                    prompt_cost: round4(prompt_cost),
                    completion_cost: round4(completion_cost),
                    total_cost: round4(total_cost),
                },
            );
        }

        report.total_cost = round4(report.total_cost);
        report
    }
}

/// Longest price key contained in the model name wins.
fn lookup_pricing(model: &str) -> Option<(&'static str, f64, f64)> {
    let model_lower = model.to_lowercase();
    PRICING
        .iter()
        .filter(|(key, _, _)| model_lower.contains(key))
        .max_by_key(|(key, _, _)| key.len())
        .map(|&(key, p, c)| (key, p, c))
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_per_model() {
        let meter = UsageMeter::new();
        meter.record("gpt-4o-mini", 1000, 500);
        meter.record("gpt-4o-mini", 2000, 1000);
        meter.record("gemini-2.5-flash", 100, 50);

        let report = meter.report();
        assert_eq!(report.total_prompt_tokens, 3100);
        assert_eq!(report.total_completion_tokens, 1550);
        assert_eq!(report.models["gpt-4o-mini"].call_count, 2);
        assert_eq!(report.models["gemini-2.5-flash"].call_count, 1);
    }

    #[test]
    fn longest_price_key_wins() {
        // "gpt-4o-mini-2024-07-18" contains both "gpt-4o" and "gpt-4o-mini";
        // the longer (cheaper) entry must match.
        let (key, prompt, _) = lookup_pricing("gpt-4o-mini-2024-07-18").unwrap();
        assert_eq!(key, "gpt-4o-mini");
        assert_eq!(prompt, 0.15);

        let (key, _, _) = lookup_pricing("gpt-4o-2024-08-06").unwrap();
        assert_eq!(key, "gpt-4o");
    }

    #[test]
    fn cost_math() {
        let meter = UsageMeter::new();
        meter.record("gpt-4o-mini", 1_000_000, 1_000_000);
        let report = meter.report();
        // 0.15 + 0.60 per million of each.
        assert!((report.total_cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_counts_tokens_without_cost() {
        let meter = UsageMeter::new();
        meter.record("some-local-model", 10, 10);
        let report = meter.report();
        assert_eq!(report.total_tokens, 20);
        assert_eq!(report.total_cost, 0.0);
        assert!(report.models.is_empty());
    }

    #[test]
    fn reset_clears_counters() {
        let meter = UsageMeter::new();
        meter.record("gpt-4o", 10, 10);
        meter.reset();
        assert_eq!(meter.report().total_tokens, 0);
    }
}
