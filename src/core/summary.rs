//! Dashboard summary and analytics export.
//!
//! The summary compares the current calendar month with the previous one and
//! reports lifetime totals. The export repackages a comprehensive analysis
//! either as-is (`json`) or as flat row arrays ready for CSV conversion.

use crate::{
    core::{
        analytics::{
            CategorySpending, ComprehensiveAnalytics, MonthlyBucket, StoreSpending, TrendPoint,
            category_spending,
        },
        period::{DateWindow, current_month_window, previous_month_window, round2},
        repository::{PricedPurchase, ProductRepository, PurchaseRepository, load_priced_purchases},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, str::FromStr};
use tracing::instrument;

/// Note attached to CSV exports.
pub const CSV_NOTE: &str = "Convert the data arrays to CSV format on the client side";

/// Lifetime totals for a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalStatistics {
    /// Number of purchases ever recorded
    pub total_purchases: u64,
    /// Sum of all purchase amounts
    pub total_spending: f64,
    /// Mean purchase amount
    pub avg_purchase_price: f64,
    /// Earliest purchase, if any
    pub first_purchase: Option<DateTime<Utc>>,
    /// Latest purchase, if any
    pub last_purchase: Option<DateTime<Utc>>,
}

/// Spending so far in the current calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentMonth {
    /// Number of purchases this month
    pub purchases: u64,
    /// Amount spent this month
    pub spending: f64,
    /// Category with the most spending this month. Products without a
    /// category are grouped under `"Uncategorized"`; `None` only when there
    /// were no purchases this month.
    pub top_category: Option<String>,
    /// Amount spent in [`CurrentMonth::top_category`]
    pub top_category_spending: f64,
}

/// Direction of the month-over-month change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTrend {
    /// Spending went up
    Up,
    /// Spending went down
    Down,
    /// No change
    Stable,
}

/// Current month compared with the whole previous month.
///
/// When the previous month had no spending, `change_amount` is the full
/// current spending and `trend` follows its sign, while `change_percentage`
/// stays at 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthComparison {
    /// Amount spent in the previous calendar month
    pub last_month_spending: f64,
    /// Current minus previous
    pub change_amount: f64,
    /// Change relative to the previous month, in percent; 0 when it had no spending
    pub change_percentage: f64,
    /// Sign of the change
    pub trend: ChangeTrend,
}

/// Dashboard summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    /// Lifetime totals
    pub total_statistics: TotalStatistics,
    /// Current month so far
    pub current_month: CurrentMonth,
    /// Current versus previous month
    pub month_comparison: MonthComparison,
}

fn total_in(purchases: &[PricedPurchase], window: &DateWindow) -> (f64, u64) {
    purchases
        .iter()
        .filter(|p| window.contains(p.purchase_date))
        .fold((0.0, 0), |(sum, count), p| (sum + p.amount, count + 1))
}

/// Builds the summary from a user's full purchase history.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(purchases: &[PricedPurchase], now: DateTime<Utc>) -> AnalyticsSummary {
    let total_spending: f64 = purchases.iter().map(|p| p.amount).sum();
    let total_purchases = purchases.len() as u64;
    let avg_purchase_price = if total_purchases > 0 {
        total_spending / total_purchases as f64
    } else {
        0.0
    };

    let current_window = current_month_window(now);
    let this_month: Vec<PricedPurchase> = purchases
        .iter()
        .filter(|p| current_window.contains(p.purchase_date))
        .cloned()
        .collect();
    let (current_spending, current_count) = total_in(&this_month, &DateWindow::unbounded());
    let top = category_spending(&this_month).category_analysis.into_iter().next();

    let (last_spending, _) = total_in(purchases, &previous_month_window(now));
    let change = current_spending - last_spending;
    let change_percentage = if last_spending > 0.0 {
        change / last_spending * 100.0
    } else {
        0.0
    };
    let change_amount = round2(change);
    let trend = if change_amount > 0.0 {
        ChangeTrend::Up
    } else if change_amount < 0.0 {
        ChangeTrend::Down
    } else {
        ChangeTrend::Stable
    };

    AnalyticsSummary {
        total_statistics: TotalStatistics {
            total_purchases,
            total_spending: round2(total_spending),
            avg_purchase_price: round2(avg_purchase_price),
            first_purchase: purchases.iter().map(|p| p.purchase_date).min(),
            last_purchase: purchases.iter().map(|p| p.purchase_date).max(),
        },
        current_month: CurrentMonth {
            purchases: current_count,
            spending: round2(current_spending),
            top_category_spending: top.as_ref().map_or(0.0, |c| c.total_spending),
            top_category: top.map(|c| c.category),
        },
        month_comparison: MonthComparison {
            last_month_spending: round2(last_spending),
            change_amount,
            change_percentage: round2(change_percentage),
            trend,
        },
    }
}

/// Dashboard summary for a user as of `now`.
///
/// # Errors
/// Returns an error if the purchase history cannot be loaded.
#[instrument(skip(store))]
pub async fn get_analytics_summary<S>(
    store: &S,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<AnalyticsSummary>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let purchases = load_priced_purchases(store, user_id, &DateWindow::unbounded()).await?;
    Ok(summarize(&purchases, now))
}

/// Output shape of an analytics export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// The comprehensive analysis as nested JSON
    #[default]
    Json,
    /// Flat row arrays, one per table
    Csv,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(Error::InvalidInput {
                message: "Supported formats: json, csv".to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

/// Metadata describing an export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportInfo {
    /// Requested format
    pub format: ExportFormat,
    /// When the export was produced
    pub generated_at: DateTime<Utc>,
    /// Owner of the exported data
    pub user_id: i64,
    /// Window length in calendar months
    pub period_months: u32,
    /// Usage hint for the consumer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Row arrays of a CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRows {
    /// Monthly buckets, most recent first
    pub monthly_spending: Vec<MonthlyBucket>,
    /// Category rows, largest first
    pub category_analysis: Vec<CategorySpending>,
    /// Store rows, largest first
    pub store_analysis: Vec<StoreSpending>,
    /// Trend points, oldest first
    pub spending_trends: Vec<TrendPoint>,
}

/// Exported payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExportData {
    /// Full nested analysis
    Json(Box<ComprehensiveAnalytics>),
    /// Flat rows
    Csv(CsvRows),
}

/// An export together with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsExport {
    /// Exported payload
    pub data: ExportData,
    /// Export metadata
    pub export_info: ExportInfo,
}

/// Packages `analytics` in the requested format.
#[must_use]
pub fn build_export(
    analytics: ComprehensiveAnalytics,
    format: ExportFormat,
    user_id: i64,
    generated_at: DateTime<Utc>,
) -> AnalyticsExport {
    let period_months = analytics.period.months;
    let (data, note) = match format {
        ExportFormat::Json => (ExportData::Json(Box::new(analytics)), None),
        ExportFormat::Csv => (
            ExportData::Csv(CsvRows {
                monthly_spending: analytics.monthly_spending.monthly_spending,
                category_analysis: analytics.category_analysis.category_analysis,
                store_analysis: analytics.store_analysis.store_analysis,
                spending_trends: analytics.spending_trends.trends_data,
            }),
            Some(CSV_NOTE.to_string()),
        ),
    };

    AnalyticsExport {
        data,
        export_info: ExportInfo {
            format,
            generated_at,
            user_id,
            period_months,
            note,
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{analytics::comprehensive_analytics, repository::SeaOrmRepository};
    use crate::test_utils::*;

    fn priced(id: i64, amount: f64, category: &str, date: DateTime<Utc>) -> PricedPurchase {
        PricedPurchase {
            purchase_id: id,
            product_id: id,
            amount,
            category: Some(category.to_string()),
            store_name: "Store".to_string(),
            purchase_date: date,
        }
    }

    #[test]
    fn test_summary_of_empty_history() {
        let summary = summarize(&[], ymd(2024, 3, 15));

        assert_eq!(summary.total_statistics.total_purchases, 0);
        assert_eq!(summary.total_statistics.avg_purchase_price, 0.0);
        assert!(summary.total_statistics.first_purchase.is_none());
        assert_eq!(summary.current_month.purchases, 0);
        assert!(summary.current_month.top_category.is_none());
        assert_eq!(summary.current_month.top_category_spending, 0.0);
        assert_eq!(summary.month_comparison.change_percentage, 0.0);
        assert_eq!(summary.month_comparison.trend, ChangeTrend::Stable);
    }

    #[test]
    fn test_summary_compares_with_previous_month() {
        let purchases = vec![
            priced(1, 100.0, "Food", ymd(2024, 2, 1)),
            priced(2, 100.0, "Food", ymd(2024, 2, 29)),
            priced(3, 150.0, "Travel", ymd(2024, 3, 2)),
            priced(4, 50.0, "Food", ymd(2024, 3, 10)),
            priced(5, 75.0, "Books", ymd(2023, 11, 5)),
        ];
        let summary = summarize(&purchases, ymd(2024, 3, 15));

        let totals = &summary.total_statistics;
        assert_eq!(totals.total_purchases, 5);
        assert_eq!(totals.total_spending, 475.0);
        assert_eq!(totals.avg_purchase_price, 95.0);
        assert_eq!(totals.first_purchase, Some(ymd(2023, 11, 5)));
        assert_eq!(totals.last_purchase, Some(ymd(2024, 3, 10)));

        let current = &summary.current_month;
        assert_eq!(current.purchases, 2);
        assert_eq!(current.spending, 200.0);
        assert_eq!(current.top_category.as_deref(), Some("Travel"));
        assert_eq!(current.top_category_spending, 150.0);

        let comparison = &summary.month_comparison;
        assert_eq!(comparison.last_month_spending, 200.0);
        assert_eq!(comparison.change_amount, 0.0);
        assert_eq!(comparison.change_percentage, 0.0);
        assert_eq!(comparison.trend, ChangeTrend::Stable);
    }

    #[test]
    fn test_summary_change_direction() {
        let now = ymd(2024, 3, 15);
        let down = summarize(
            &[
                priced(1, 200.0, "Food", ymd(2024, 2, 10)),
                priced(2, 50.0, "Food", ymd(2024, 3, 1)),
            ],
            now,
        );
        assert_eq!(down.month_comparison.change_amount, -150.0);
        assert_eq!(down.month_comparison.change_percentage, -75.0);
        assert_eq!(down.month_comparison.trend, ChangeTrend::Down);

        // Nothing last month: change is still reported, percentage is zero
        let up = summarize(&[priced(1, 80.0, "Food", ymd(2024, 3, 1))], now);
        assert_eq!(up.month_comparison.last_month_spending, 0.0);
        assert_eq!(up.month_comparison.change_amount, 80.0);
        assert_eq!(up.month_comparison.change_percentage, 0.0);
        assert_eq!(up.month_comparison.trend, ChangeTrend::Up);
    }

    #[test]
    fn test_summary_top_category_groups_uncategorized() {
        let mut loose = priced(1, 60.0, "unused", ymd(2024, 3, 2));
        loose.category = None;
        let summary = summarize(
            &[loose, priced(2, 20.0, "Food", ymd(2024, 3, 3))],
            ymd(2024, 3, 15),
        );

        let current = &summary.current_month;
        assert_eq!(current.top_category.as_deref(), Some("Uncategorized"));
        assert_eq!(current.top_category_spending, 60.0);
        assert_eq!(summary.month_comparison.trend, ChangeTrend::Up);
        assert_eq!(summary.month_comparison.change_percentage, 0.0);
    }

    #[test]
    fn test_summary_ignores_future_purchases_in_current_month() {
        let summary = summarize(
            &[priced(1, 10.0, "Food", ymd(2024, 3, 20))],
            ymd(2024, 3, 15),
        );
        assert_eq!(summary.current_month.purchases, 0);
        assert_eq!(summary.total_statistics.total_purchases, 1);
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" Json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_build_export_json_and_csv() {
        let now = ymd(2024, 6, 15);
        let purchases = vec![
            priced(1, 20.0, "Food", ymd(2024, 5, 1)),
            priced(2, 30.0, "Books", ymd(2024, 6, 1)),
        ];
        let analytics = comprehensive_analytics(&purchases, 12, now).unwrap();

        let json_export = build_export(analytics.clone(), ExportFormat::Json, 7, now);
        let value = serde_json::to_value(&json_export).unwrap();
        assert_eq!(value["export_info"]["format"], "json");
        assert_eq!(value["export_info"]["user_id"], 7);
        assert_eq!(value["export_info"]["period_months"], 12);
        assert!(value["export_info"].get("note").is_none());
        assert_eq!(value["data"]["category_analysis"]["total_categories"], 2);

        let csv_export = build_export(analytics, ExportFormat::Csv, 7, now);
        let value = serde_json::to_value(&csv_export).unwrap();
        assert_eq!(value["export_info"]["format"], "csv");
        assert_eq!(value["export_info"]["note"], CSV_NOTE);
        assert_eq!(value["data"]["monthly_spending"].as_array().unwrap().len(), 2);
        assert_eq!(value["data"]["category_analysis"][0]["category"], "Books");
        assert_eq!(value["data"]["store_analysis"][0]["store_name"], "Store");
        assert_eq!(value["data"]["spending_trends"][0]["period"], "May 2024");
    }

    #[tokio::test]
    async fn test_get_analytics_summary_from_database() -> Result<()> {
        let db = setup_test_db().await?;
        let mug = create_test_product(&db, "Mug", 12.5, Some("Kitchen")).await?;
        create_test_purchase(&db, 3, mug.id, "HomeGoods", ymd(2024, 3, 5)).await?;
        create_test_purchase(&db, 3, mug.id, "HomeGoods", ymd(2024, 2, 5)).await?;

        let repo = SeaOrmRepository::new(db);
        let summary = get_analytics_summary(&repo, 3, ymd(2024, 3, 15)).await?;

        assert_eq!(summary.total_statistics.total_purchases, 2);
        assert_eq!(summary.total_statistics.total_spending, 25.0);
        assert_eq!(summary.current_month.top_category.as_deref(), Some("Kitchen"));
        assert_eq!(summary.month_comparison.trend, ChangeTrend::Stable);
        Ok(())
    }
}
