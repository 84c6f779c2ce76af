//! Spending insights - rule-based advice derived from comprehensive analytics.
//!
//! Each rule looks at one aspect of a [`ComprehensiveAnalytics`] result and
//! may emit a single [`Insight`]. Rules are independent; several or all may
//! fire for the same user. Insights are emitted in a fixed rule order.

use crate::{
    core::{
        analytics::{
            ComprehensiveAnalytics, TrendDirection, TrendStatistics, get_comprehensive_analytics,
        },
        repository::{ProductRepository, PurchaseRepository},
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

/// Months analysed for insights when the caller does not say otherwise.
pub const DEFAULT_INSIGHT_MONTHS: u32 = 6;

/// A category taking more than this share (percent) is called out.
pub const DOMINANT_CATEGORY_SHARE: f64 = 50.0;

/// A store taking more than this share (percent) is called out.
pub const FAVORITE_STORE_SHARE: f64 = 40.0;

/// Standard deviation, relative to the mean, above which spending is irregular.
pub const IRREGULAR_SPENDING_RATIO: f64 = 0.3;

/// Most recent months considered by the variance rule.
pub const VARIANCE_WINDOW_MONTHS: usize = 6;

/// Fewest monthly buckets the variance rule needs.
pub const VARIANCE_MIN_MONTHS: usize = 3;

/// Suggested budget as a fraction of average monthly spending.
pub const BUDGET_FACTOR: f64 = 0.9;

/// What an insight is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    /// Direction of spending over time
    Trend,
    /// Concentration in one category
    Category,
    /// Concentration at one store
    Store,
    /// Month-to-month volatility
    Variance,
    /// Budget suggestion
    Budget,
}

/// How an insight should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    /// Something the user should act on
    Warning,
    /// Good news
    Positive,
    /// Neutral observation
    Info,
    /// Concrete proposal
    Suggestion,
}

/// A single piece of advice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    /// Subject of the insight
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// Presentation level
    pub level: InsightLevel,
    /// Short headline
    pub title: String,
    /// Explanation with the user's numbers
    pub message: String,
    /// Suggested action
    pub recommendation: String,
}

/// Window the insights were derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightPeriod {
    /// Window length in calendar months
    pub months: u32,
    /// First instant included
    pub start_date: DateTime<Utc>,
    /// Last instant included
    pub end_date: DateTime<Utc>,
}

/// Insights together with the context they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingInsights {
    /// Advice, in rule order
    pub insights: Vec<Insight>,
    /// The analysed window
    pub analysis_period: InsightPeriod,
    /// Trend statistics the rules used
    pub summary_stats: TrendStatistics,
}

/// Population standard deviation and mean of `values`.
#[allow(clippy::cast_precision_loss)]
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn trend_insight(stats: &TrendStatistics, months: u32) -> Option<Insight> {
    match stats.trend_direction {
        TrendDirection::Increasing => Some(Insight {
            kind: InsightKind::Trend,
            level: InsightLevel::Warning,
            title: "Increasing Spending Trend".to_string(),
            message: format!(
                "Your spending has been increasing over the last {months} months. \
                 Average monthly spending is ${:.2}.",
                stats.avg_monthly_spending
            ),
            recommendation: "Consider reviewing your budget and identifying areas where you can reduce spending.".to_string(),
        }),
        TrendDirection::Decreasing => Some(Insight {
            kind: InsightKind::Trend,
            level: InsightLevel::Positive,
            title: "Decreasing Spending Trend".to_string(),
            message: format!(
                "Great job! Your spending has been decreasing over the last {months} months."
            ),
            recommendation: "Keep up the good work with your spending discipline.".to_string(),
        }),
        TrendDirection::Stable => None,
    }
}

fn category_insight(analytics: &ComprehensiveAnalytics) -> Option<Insight> {
    let top = analytics.category_analysis.category_analysis.first()?;
    (top.percentage > DOMINANT_CATEGORY_SHARE).then(|| Insight {
        kind: InsightKind::Category,
        level: InsightLevel::Info,
        title: "Dominant Spending Category".to_string(),
        message: format!(
            "You spend {:.1}% of your budget on {}.",
            top.percentage, top.category
        ),
        recommendation:
            "Consider diversifying your spending or finding ways to reduce costs in this category."
                .to_string(),
    })
}

fn store_insight(analytics: &ComprehensiveAnalytics) -> Option<Insight> {
    let top = analytics.store_analysis.store_analysis.first()?;
    (top.percentage > FAVORITE_STORE_SHARE).then(|| Insight {
        kind: InsightKind::Store,
        level: InsightLevel::Info,
        title: "Favorite Store".to_string(),
        message: format!(
            "You spend {:.1}% of your budget at {}.",
            top.percentage, top.store_name
        ),
        recommendation: "Compare prices with other stores to ensure you're getting the best deals."
            .to_string(),
    })
}

fn variance_insight(analytics: &ComprehensiveAnalytics) -> Option<Insight> {
    let buckets = &analytics.monthly_spending.monthly_spending;
    if buckets.len() < VARIANCE_MIN_MONTHS {
        return None;
    }

    // Buckets are most recent first
    let recent: Vec<f64> = buckets
        .iter()
        .take(VARIANCE_WINDOW_MONTHS)
        .map(|b| b.total_spending)
        .collect();
    let (mean, std_dev) = mean_and_std_dev(&recent);

    (std_dev > mean * IRREGULAR_SPENDING_RATIO).then(|| Insight {
        kind: InsightKind::Variance,
        level: InsightLevel::Warning,
        title: "Irregular Spending Pattern".to_string(),
        message: "Your monthly spending varies significantly. This might indicate irregular budgeting.".to_string(),
        recommendation: "Try to establish a more consistent monthly budget to better control your expenses.".to_string(),
    })
}

fn budget_insight(stats: &TrendStatistics) -> Option<Insight> {
    (stats.avg_monthly_spending > 0.0).then(|| Insight {
        kind: InsightKind::Budget,
        level: InsightLevel::Suggestion,
        title: "Budget Recommendation".to_string(),
        message: format!(
            "Based on your spending patterns, consider setting a monthly budget of ${:.2}.",
            stats.avg_monthly_spending * BUDGET_FACTOR
        ),
        recommendation: "This represents a 10% reduction from your current average spending."
            .to_string(),
    })
}

/// Applies every rule to `analytics`, in order.
#[must_use]
pub fn generate_insights(analytics: &ComprehensiveAnalytics) -> Vec<Insight> {
    let stats = &analytics.spending_trends.statistics;

    [
        trend_insight(stats, analytics.period.months),
        category_insight(analytics),
        store_insight(analytics),
        variance_insight(analytics),
        budget_insight(stats),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Generates insights and packages them with the analysed period.
#[must_use]
pub fn build_spending_insights(analytics: &ComprehensiveAnalytics) -> SpendingInsights {
    SpendingInsights {
        insights: generate_insights(analytics),
        analysis_period: InsightPeriod {
            months: analytics.period.months,
            start_date: analytics.period.start_date,
            end_date: analytics.period.end_date,
        },
        summary_stats: analytics.spending_trends.statistics.clone(),
    }
}

/// Insights for a user over the `period_months` calendar months ending at `now`.
///
/// # Errors
/// Returns an error if the window is out of range or the history cannot be loaded.
#[instrument(skip(store))]
pub async fn get_spending_insights<S>(
    store: &S,
    user_id: i64,
    period_months: u32,
    now: DateTime<Utc>,
) -> Result<SpendingInsights>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let analytics = get_comprehensive_analytics(store, user_id, period_months, now).await?;
    let report = build_spending_insights(&analytics);
    debug!("Generated {} insights", report.insights.len());
    Ok(report)
}
