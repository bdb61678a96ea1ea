//! End-of-run tallies: category breakdown and top earners.

use std::collections::HashMap;
use std::fmt;

use creatorlens_shared::{Category, ClassificationOutcome, EnrichedRecord};

/// One row of the category breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
    /// Share of successful classifications, 0-100.
    pub percentage: f64,
}

/// One row of the top-earners list.
#[derive(Debug, Clone, PartialEq)]
pub struct Earner {
    pub username: String,
    pub category: Category,
    pub earnings_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub classified: usize,
    pub errors: usize,
    /// Sorted by count descending, then category name.
    pub categories: Vec<CategoryCount>,
    /// Sorted by earnings descending, then username.
    pub top_earners: Vec<Earner>,
}

impl RunReport {
    /// Summarize a ResultSet. Only successful records contribute to the
    /// breakdown and the earner list; missing or non-finite earnings count
    /// as zero.
    pub fn build(records: &[EnrichedRecord], top_n: usize) -> Self {
        let mut counts: HashMap<Category, usize> = HashMap::new();
        let mut earners = Vec::new();

        for record in records {
            if let ClassificationOutcome::Classified(c) = &record.outcome {
                let category = c.classification.primary_classification;
                *counts.entry(category).or_default() += 1;
                earners.push(Earner {
                    username: c.username.clone(),
                    category,
                    earnings_usd: record
                        .financials
                        .earnings_usd
                        .filter(|v| v.is_finite())
                        .unwrap_or(0.0),
                });
            }
        }

        let classified = earners.len();
        let mut categories: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category,
                count,
                percentage: count as f64 * 100.0 / classified as f64,
            })
            .collect();
        categories.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.as_str().cmp(b.category.as_str()))
        });

        earners.sort_by(|a, b| {
            b.earnings_usd
                .total_cmp(&a.earnings_usd)
                .then_with(|| a.username.cmp(&b.username))
        });
        earners.truncate(top_n);

        Self {
            classified,
            errors: records.len() - classified,
            categories,
            top_earners: earners,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total classified: {}", self.classified)?;
        writeln!(f, "Errors: {}", self.errors)?;

        if self.categories.is_empty() {
            return Ok(());
        }

        writeln!(f, "\nClassification breakdown:")?;
        for row in &self.categories {
            writeln!(f, "  {}: {} ({:.1}%)", row.category, row.count, row.percentage)?;
        }

        writeln!(f, "\nTop {} earners:", self.top_earners.len())?;
        for (i, earner) in self.top_earners.iter().enumerate() {
            writeln!(
                f,
                "  {}. @{} ({}): ${} USD",
                i + 1,
                earner.username,
                earner.category,
                format_usd(earner.earnings_usd)
            )?;
        }
        Ok(())
    }
}

/// `1234567.891` -> `1,234,567.89`
fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}
