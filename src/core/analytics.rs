//! Spending analytics business logic.
//!
//! This module turns a user's priced purchase history into monthly spending
//! buckets, category and store breakdowns, and a trend series with summary
//! statistics. The aggregators are pure functions over
//! [`PricedPurchase`] slices; the `get_*` functions load the history through
//! the repository traits first and then delegate to them.
//!
//! Every aggregator processes purchases in (date, id) order, so the result
//! does not depend on the order records were stored or returned in.

use crate::{
    core::{
        period::{DateWindow, MonthKey, round2},
        repository::{PricedPurchase, ProductRepository, PurchaseRepository, load_priced_purchases},
    },
    errors::Result,
};
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::Serialize;
use std::{collections::BTreeMap, fmt};
use tracing::{debug, instrument};

/// Months analysed when the caller does not say otherwise.
pub const DEFAULT_PERIOD_MONTHS: u32 = 12;

/// Label used for products without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Relative change between halves of the trend series below which spending
/// counts as stable.
pub const TREND_TOLERANCE: f64 = 0.10;

/// Optional calendar filter for [`monthly_spending`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthFilter {
    /// Only include this year
    pub year: Option<i32>,
    /// Only include this month number (1-12)
    pub month: Option<u32>,
}

impl MonthFilter {
    fn matches(self, key: MonthKey) -> bool {
        self.year.is_none_or(|y| y == key.year) && self.month.is_none_or(|m| m == key.month)
    }

    /// Smallest window guaranteed to contain every matching purchase.
    fn window(self) -> DateWindow {
        let Some(year) = self.year else {
            return DateWindow::unbounded();
        };
        let (first, next) = match self.month {
            Some(month) => (
                NaiveDate::from_ymd_opt(year, month, 1),
                if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                },
            ),
            None => (
                NaiveDate::from_ymd_opt(year, 1, 1),
                NaiveDate::from_ymd_opt(year + 1, 1, 1),
            ),
        };

        match (first, next) {
            (Some(first), Some(next)) => {
                let start = Utc.from_utc_datetime(&first.and_time(chrono::NaiveTime::MIN));
                let end = Utc.from_utc_datetime(&next.and_time(chrono::NaiveTime::MIN))
                    - TimeDelta::nanoseconds(1);
                DateWindow::between(start, end)
            }
            _ => DateWindow::unbounded(),
        }
    }
}

/// Spending within one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    /// Calendar year
    pub year: i32,
    /// Month number, 1-12
    pub month: u32,
    /// English month name
    pub month_name: String,
    /// Sum of purchase amounts
    pub total_spending: f64,
    /// Number of purchases
    pub purchase_count: u64,
    /// Display label, e.g. `"January 2024"`
    pub period: String,
}

/// Monthly buckets, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySpending {
    /// One bucket per month that has purchases
    pub monthly_spending: Vec<MonthlyBucket>,
    /// Number of buckets
    pub total_months: usize,
}

/// Spending within one product category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    /// Category name, or [`UNCATEGORIZED`]
    pub category: String,
    /// Sum of purchase amounts
    pub total_spending: f64,
    /// Number of purchases
    pub purchase_count: u64,
    /// Mean purchase amount
    pub avg_price: f64,
    /// Share of the grand total, 0-100
    pub percentage: f64,
}

/// Category breakdown, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAnalysis {
    /// One entry per category
    pub category_analysis: Vec<CategorySpending>,
    /// Grand total across categories
    pub total_spending: f64,
    /// Number of categories
    pub total_categories: usize,
}

/// Spending at one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSpending {
    /// Store name
    pub store_name: String,
    /// Sum of purchase amounts
    pub total_spending: f64,
    /// Number of purchases
    pub purchase_count: u64,
    /// Mean purchase amount
    pub avg_price: f64,
    /// Share of the grand total, 0-100
    pub percentage: f64,
    /// Most recent purchase at this store
    pub last_purchase: DateTime<Utc>,
}

/// Store breakdown, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreAnalysis {
    /// One entry per store
    pub store_analysis: Vec<StoreSpending>,
    /// Grand total across stores
    pub total_spending: f64,
    /// Number of stores
    pub total_stores: usize,
}

/// Direction of a spending series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Recent months cost noticeably more than earlier ones
    Increasing,
    /// Recent months cost noticeably less than earlier ones
    Decreasing,
    /// No change beyond [`TREND_TOLERANCE`]
    Stable,
}

impl TrendDirection {
    /// Lowercase name as used in API payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point of the trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Calendar year
    pub year: i32,
    /// Month number, 1-12
    pub month: u32,
    /// English month name
    pub month_name: String,
    /// Short label, e.g. `"Jan 2024"`
    pub period: String,
    /// Sum of purchase amounts
    pub total_spending: f64,
    /// Number of purchases
    pub purchase_count: u64,
}

/// Summary statistics over the trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStatistics {
    /// Mean spending per month with purchases
    pub avg_monthly_spending: f64,
    /// Highest monthly total
    pub max_monthly_spending: f64,
    /// Lowest monthly total
    pub min_monthly_spending: f64,
    /// Sum over the whole series
    pub total_spending: f64,
    /// Classification of the series
    pub trend_direction: TrendDirection,
}

/// Monthly series, oldest first, with statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingTrends {
    /// One point per month with purchases
    pub trends_data: Vec<TrendPoint>,
    /// Length of the analysed window in months
    pub period_months: u32,
    /// Summary statistics
    pub statistics: TrendStatistics,
}

/// Window every part of a [`ComprehensiveAnalytics`] was computed over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPeriod {
    /// First instant included
    pub start_date: DateTime<Utc>,
    /// Last instant included
    pub end_date: DateTime<Utc>,
    /// Window length in calendar months
    pub months: u32,
}

/// All analyses over one shared window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComprehensiveAnalytics {
    /// Monthly buckets within the window
    pub monthly_spending: MonthlySpending,
    /// Category breakdown within the window
    pub category_analysis: CategoryAnalysis,
    /// Store breakdown within the window
    pub store_analysis: StoreAnalysis,
    /// Trend series within the window
    pub spending_trends: SpendingTrends,
    /// The shared window
    pub period: AnalysisPeriod,
}

#[derive(Debug, Clone, Copy)]
struct Totals {
    total: f64,
    count: u64,
    last_purchase: DateTime<Utc>,
}

impl Totals {
    fn new(purchase: &PricedPurchase) -> Self {
        Self {
            total: purchase.amount,
            count: 1,
            last_purchase: purchase.purchase_date,
        }
    }

    fn add(&mut self, purchase: &PricedPurchase) {
        self.total += purchase.amount;
        self.count += 1;
        self.last_purchase = self.last_purchase.max(purchase.purchase_date);
    }

    #[allow(clippy::cast_precision_loss)]
    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

fn canonical_order(purchases: &[PricedPurchase]) -> Vec<&PricedPurchase> {
    let mut ordered: Vec<&PricedPurchase> = purchases.iter().collect();
    ordered.sort_by(|a, b| {
        a.purchase_date
            .cmp(&b.purchase_date)
            .then(a.purchase_id.cmp(&b.purchase_id))
    });
    ordered
}

fn totals_by<'a, K, I, F>(purchases: I, key: F) -> BTreeMap<K, Totals>
where
    K: Ord,
    I: IntoIterator<Item = &'a PricedPurchase>,
    F: Fn(&PricedPurchase) -> K,
{
    let mut groups: BTreeMap<K, Totals> = BTreeMap::new();
    for purchase in purchases {
        groups
            .entry(key(purchase))
            .and_modify(|t| t.add(purchase))
            .or_insert_with(|| Totals::new(purchase));
    }
    groups
}

/// Groups by `key`, largest total first, ties by key.
fn ranked_groups<F>(purchases: &[PricedPurchase], key: F) -> (Vec<(String, Totals)>, f64)
where
    F: Fn(&PricedPurchase) -> String,
{
    let mut groups: Vec<(String, Totals)> = totals_by(canonical_order(purchases), key)
        .into_iter()
        .collect();
    groups.sort_by(|(ka, a), (kb, b)| b.total.total_cmp(&a.total).then_with(|| ka.cmp(kb)));
    let grand_total: f64 = groups.iter().map(|(_, t)| t.total).sum();
    (groups, grand_total)
}

fn share_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round2(part / whole * 100.0)
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Buckets purchases by calendar month, most recent first.
#[must_use]
pub fn monthly_spending(purchases: &[PricedPurchase], filter: MonthFilter) -> MonthlySpending {
    let months = totals_by(
        canonical_order(purchases)
            .into_iter()
            .filter(|p| filter.matches(MonthKey::of(p.purchase_date))),
        |p| MonthKey::of(p.purchase_date),
    );

    let monthly_spending: Vec<MonthlyBucket> = months
        .into_iter()
        .rev()
        .map(|(key, totals)| MonthlyBucket {
            year: key.year,
            month: key.month,
            month_name: key.name().to_string(),
            total_spending: round2(totals.total),
            purchase_count: totals.count,
            period: key.label(),
        })
        .collect();

    MonthlySpending {
        total_months: monthly_spending.len(),
        monthly_spending,
    }
}

/// Breaks spending down by product category.
#[must_use]
pub fn category_spending(purchases: &[PricedPurchase]) -> CategoryAnalysis {
    let (groups, grand_total) = ranked_groups(purchases, |p| {
        p.category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    });

    let category_analysis: Vec<CategorySpending> = groups
        .into_iter()
        .map(|(category, totals)| CategorySpending {
            category,
            total_spending: round2(totals.total),
            purchase_count: totals.count,
            avg_price: round2(totals.average()),
            percentage: share_of(totals.total, grand_total),
        })
        .collect();

    CategoryAnalysis {
        total_categories: category_analysis.len(),
        category_analysis,
        total_spending: round2(grand_total),
    }
}

/// Breaks spending down by store.
#[must_use]
pub fn store_spending(purchases: &[PricedPurchase]) -> StoreAnalysis {
    let (groups, grand_total) = ranked_groups(purchases, |p| p.store_name.clone());

    let store_analysis: Vec<StoreSpending> = groups
        .into_iter()
        .map(|(store_name, totals)| StoreSpending {
            store_name,
            total_spending: round2(totals.total),
            purchase_count: totals.count,
            avg_price: round2(totals.average()),
            percentage: share_of(totals.total, grand_total),
            last_purchase: totals.last_purchase,
        })
        .collect();

    StoreAnalysis {
        total_stores: store_analysis.len(),
        store_analysis,
        total_spending: round2(grand_total),
    }
}

/// Classifies a chronological series of monthly totals.
///
/// The mean of the second half is compared with the mean of the first half;
/// when the series has an odd length the middle month belongs to neither.
/// Fewer than two months is always [`TrendDirection::Stable`].
#[must_use]
pub fn classify_trend(monthly_totals: &[f64]) -> TrendDirection {
    let half = monthly_totals.len() / 2;
    if half == 0 {
        return TrendDirection::Stable;
    }

    let earlier = mean(&monthly_totals[..half]);
    let recent = mean(&monthly_totals[monthly_totals.len() - half..]);

    if recent > earlier * (1.0 + TREND_TOLERANCE) {
        TrendDirection::Increasing
    } else if recent < earlier * (1.0 - TREND_TOLERANCE) {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Builds the chronological monthly series and its statistics.
#[must_use]
pub fn spending_trends(purchases: &[PricedPurchase], period_months: u32) -> SpendingTrends {
    let months = totals_by(canonical_order(purchases), |p| MonthKey::of(p.purchase_date));

    let trends_data: Vec<TrendPoint> = months
        .iter()
        .map(|(key, totals)| TrendPoint {
            year: key.year,
            month: key.month,
            month_name: key.name().to_string(),
            period: key.short_label(),
            total_spending: round2(totals.total),
            purchase_count: totals.count,
        })
        .collect();

    let monthly_totals: Vec<f64> = months.values().map(|t| t.total).collect();
    let total: f64 = monthly_totals.iter().sum();
    let max = monthly_totals.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let min = monthly_totals.iter().copied().reduce(f64::min).unwrap_or(0.0);

    SpendingTrends {
        trends_data,
        period_months,
        statistics: TrendStatistics {
            avg_monthly_spending: round2(mean(&monthly_totals)),
            max_monthly_spending: round2(max),
            min_monthly_spending: round2(min),
            total_spending: round2(total),
            trend_direction: classify_trend(&monthly_totals),
        },
    }
}

/// Runs every analysis over the `period_months` calendar months ending at `now`.
///
/// Purchases outside the window are ignored, so callers may pass a wider
/// history.
///
/// # Errors
/// Returns an error if the window start falls outside the supported date range.
pub fn comprehensive_analytics(
    purchases: &[PricedPurchase],
    period_months: u32,
    now: DateTime<Utc>,
) -> Result<ComprehensiveAnalytics> {
    let window = DateWindow::trailing_months(now, period_months)?;
    let in_window: Vec<PricedPurchase> = purchases
        .iter()
        .filter(|p| window.contains(p.purchase_date))
        .cloned()
        .collect();

    Ok(ComprehensiveAnalytics {
        monthly_spending: monthly_spending(&in_window, MonthFilter::default()),
        category_analysis: category_spending(&in_window),
        store_analysis: store_spending(&in_window),
        spending_trends: spending_trends(&in_window, period_months),
        period: AnalysisPeriod {
            start_date: window.start.unwrap_or(now),
            end_date: now,
            months: period_months,
        },
    })
}

/// Monthly spending for a user, optionally narrowed to a year and/or month.
///
/// # Errors
/// Returns an error if the purchase history cannot be loaded.
#[instrument(skip(store))]
pub async fn get_monthly_spending<S>(
    store: &S,
    user_id: i64,
    filter: MonthFilter,
) -> Result<MonthlySpending>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let purchases = load_priced_purchases(store, user_id, &filter.window()).await?;
    let result = monthly_spending(&purchases, filter);
    debug!("Computed {} monthly buckets", result.total_months);
    Ok(result)
}

/// Category breakdown for a user's purchases in `window`.
///
/// # Errors
/// Returns an error if the purchase history cannot be loaded.
#[instrument(skip(store))]
pub async fn get_category_spending<S>(
    store: &S,
    user_id: i64,
    window: DateWindow,
) -> Result<CategoryAnalysis>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let purchases = load_priced_purchases(store, user_id, &window).await?;
    Ok(category_spending(&purchases))
}

/// Store breakdown for a user's purchases in `window`.
///
/// # Errors
/// Returns an error if the purchase history cannot be loaded.
#[instrument(skip(store))]
pub async fn get_store_spending<S>(
    store: &S,
    user_id: i64,
    window: DateWindow,
) -> Result<StoreAnalysis>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let purchases = load_priced_purchases(store, user_id, &window).await?;
    Ok(store_spending(&purchases))
}

/// Trend series over the `period_months` calendar months ending at `now`.
///
/// # Errors
/// Returns an error if the window is out of range or the history cannot be loaded.
#[instrument(skip(store))]
pub async fn get_spending_trends<S>(
    store: &S,
    user_id: i64,
    period_months: u32,
    now: DateTime<Utc>,
) -> Result<SpendingTrends>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let window = DateWindow::trailing_months(now, period_months)?;
    let purchases = load_priced_purchases(store, user_id, &window).await?;
    Ok(spending_trends(&purchases, period_months))
}

/// All analyses for a user over the `period_months` calendar months ending at `now`.
///
/// The history is loaded once and shared between the aggregators.
///
/// # Errors
/// Returns an error if the window is out of range or the history cannot be loaded.
#[instrument(skip(store))]
pub async fn get_comprehensive_analytics<S>(
    store: &S,
    user_id: i64,
    period_months: u32,
    now: DateTime<Utc>,
) -> Result<ComprehensiveAnalytics>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let window = DateWindow::trailing_months(now, period_months)?;
    let purchases = load_priced_purchases(store, user_id, &window).await?;
    comprehensive_analytics(&purchases, period_months, now)
}
