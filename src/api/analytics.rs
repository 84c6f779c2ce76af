//! `/analytics/*` handlers.
//!
//! Each handler validates its query, delegates to the core analytics
//! functions through the shared repository and wraps the result in the
//! `{"success": true, "data": ...}` envelope.

use crate::{
    api::{
        AppState,
        auth::AuthUser,
        error::ApiError,
        params::{
            BreakdownParams, ExportParams, MAX_INSIGHT_MONTHS, MAX_PERIOD_MONTHS, PeriodFilters,
            PeriodParams, SpendingParams, WindowFilters, validate_period,
        },
    },
    core::{
        analytics::{
            CategoryAnalysis, ComprehensiveAnalytics, DEFAULT_PERIOD_MONTHS, MonthFilter,
            MonthlySpending, SpendingTrends, StoreAnalysis, get_category_spending,
            get_comprehensive_analytics, get_monthly_spending, get_spending_trends,
            get_store_spending,
        },
        insights::{DEFAULT_INSIGHT_MONTHS, SpendingInsights, get_spending_insights},
        summary::{AnalyticsExport, AnalyticsSummary, build_export, get_analytics_summary},
    },
};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T, F = ()> {
    /// Always `true`
    pub success: bool,
    /// Endpoint payload
    pub data: T,
    /// Effective filters, when the endpoint takes any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<F>,
}

impl<T> ApiResponse<T> {
    fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            filters: None,
        }
    }
}

impl<T, F> ApiResponse<T, F> {
    fn filtered(data: T, filters: F) -> Self {
        Self {
            success: true,
            data,
            filters: Some(filters),
        }
    }
}

/// Export response: the export payload next to `success`.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    /// Always `true`
    pub success: bool,
    /// Payload and metadata
    #[serde(flatten)]
    pub export: AnalyticsExport,
}

type Handled<T, F = ()> = Result<Json<ApiResponse<T, F>>, ApiError>;

/// `GET /analytics/spending`
pub async fn spending(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<SpendingParams>, QueryRejection>,
) -> Handled<MonthlySpending, MonthFilter> {
    let Query(params) = query?;
    let filter = params.month_filter(Utc::now())?;

    let data = get_monthly_spending(state.repository.as_ref(), user_id, filter)
        .await
        .map_err(|e| ApiError::from_core("get spending analytics", e))?;
    Ok(Json(ApiResponse::filtered(data, filter)))
}

/// `GET /analytics/categories`
pub async fn categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<BreakdownParams>, QueryRejection>,
) -> Handled<CategoryAnalysis, WindowFilters> {
    let Query(params) = query?;
    let (window, filters) = params.window(Utc::now())?;

    let data = get_category_spending(state.repository.as_ref(), user_id, window)
        .await
        .map_err(|e| ApiError::from_core("get category analytics", e))?;
    Ok(Json(ApiResponse::filtered(data, filters)))
}

/// `GET /analytics/stores`
pub async fn stores(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<BreakdownParams>, QueryRejection>,
) -> Handled<StoreAnalysis, WindowFilters> {
    let Query(params) = query?;
    let (window, filters) = params.window(Utc::now())?;

    let data = get_store_spending(state.repository.as_ref(), user_id, window)
        .await
        .map_err(|e| ApiError::from_core("get store analytics", e))?;
    Ok(Json(ApiResponse::filtered(data, filters)))
}

/// `GET /analytics/trends`
pub async fn trends(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<PeriodParams>, QueryRejection>,
) -> Handled<SpendingTrends, PeriodFilters> {
    let Query(params) = query?;
    let period_months =
        validate_period(params.period_months, DEFAULT_PERIOD_MONTHS, MAX_PERIOD_MONTHS)?;

    let data = get_spending_trends(state.repository.as_ref(), user_id, period_months, Utc::now())
        .await
        .map_err(|e| ApiError::from_core("get trend analytics", e))?;
    Ok(Json(ApiResponse::filtered(data, PeriodFilters { period_months })))
}

/// `GET /analytics/comprehensive`
pub async fn comprehensive(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<PeriodParams>, QueryRejection>,
) -> Handled<ComprehensiveAnalytics, PeriodFilters> {
    let Query(params) = query?;
    let period_months =
        validate_period(params.period_months, DEFAULT_PERIOD_MONTHS, MAX_PERIOD_MONTHS)?;

    let data =
        get_comprehensive_analytics(state.repository.as_ref(), user_id, period_months, Utc::now())
            .await
            .map_err(|e| ApiError::from_core("get comprehensive analytics", e))?;
    Ok(Json(ApiResponse::filtered(data, PeriodFilters { period_months })))
}

/// `GET /analytics/summary`
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Handled<AnalyticsSummary> {
    let data = get_analytics_summary(state.repository.as_ref(), user_id, Utc::now())
        .await
        .map_err(|e| ApiError::from_core("get analytics summary", e))?;
    Ok(Json(ApiResponse::new(data)))
}

/// `GET /analytics/export`
pub async fn export(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ExportParams>, QueryRejection>,
) -> Result<Json<ExportResponse>, ApiError> {
    let Query(params) = query?;
    let (format, period_months) = params.resolve()?;
    let now = Utc::now();

    let analytics = get_comprehensive_analytics(state.repository.as_ref(), user_id, period_months, now)
        .await
        .map_err(|e| ApiError::from_core("export analytics", e))?;
    info!("Exporting {period_months} months of analytics for user {user_id} as {format}");

    Ok(Json(ExportResponse {
        success: true,
        export: build_export(analytics, format, user_id, now),
    }))
}

/// `GET /analytics/insights`
pub async fn insights(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<PeriodParams>, QueryRejection>,
) -> Handled<SpendingInsights> {
    let Query(params) = query?;
    let period_months =
        validate_period(params.period_months, DEFAULT_INSIGHT_MONTHS, MAX_INSIGHT_MONTHS)?;

    let data = get_spending_insights(state.repository.as_ref(), user_id, period_months, Utc::now())
        .await
        .map_err(|e| ApiError::from_core("get spending insights", e))?;
    Ok(Json(ApiResponse::new(data)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::{
        api::{AppState, router},
        errors::Result,
        test_utils::*,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Datelike, Months, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn test_app() -> Result<(axum::Router, sea_orm::DatabaseConnection)> {
        let db = setup_test_db().await?;
        let state = AppState::new(db.clone(), "x-user-id")?;
        Ok((router(state), db))
    }

    async fn get(app: axum::Router, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(user) = user {
            request = request.header("x-user-id", user);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// Seeds user 1 with two recent electronics purchases and one clothing purchase.
    async fn seed_recent(db: &sea_orm::DatabaseConnection) -> Result<()> {
        let now = Utc::now();
        let last_month = now.checked_sub_months(Months::new(1)).unwrap();
        let two_months_ago = now.checked_sub_months(Months::new(2)).unwrap();

        let laptop = create_test_product(db, "Laptop", 999.99, Some("Electronics")).await?;
        let headphones = create_test_product(db, "Headphones", 199.99, Some("Electronics")).await?;
        let shirt = create_test_product(db, "Shirt", 29.99, Some("Clothing")).await?;

        create_test_purchase(db, 1, laptop.id, "TechStore", last_month).await?;
        create_test_purchase(db, 1, headphones.id, "TechStore", last_month).await?;
        create_test_purchase(db, 1, shirt.id, "Fashion Outlet", two_months_ago).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_requires_identity() -> Result<()> {
        let (app, _db) = test_app().await?;

        for uri in ["/analytics/spending", "/analytics/summary", "/analytics/insights"] {
            let (status, body) = get(app.clone(), uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Authentication required");
        }

        let (status, _) = get(app, "/analytics/summary", Some("not-a-number")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_errors() -> Result<()> {
        let (app, _db) = test_app().await?;
        let too_late = Utc::now().year() + 2;

        let cases = [
            "/analytics/spending?month=13".to_string(),
            "/analytics/spending?year=1999".to_string(),
            format!("/analytics/spending?year={too_late}"),
            "/analytics/spending?year=abc".to_string(),
            "/analytics/categories?period_months=0".to_string(),
            "/analytics/stores?period_months=61".to_string(),
            "/analytics/categories?start_date=2024-02-01&end_date=2024-01-01".to_string(),
            "/analytics/stores?start_date=last-tuesday".to_string(),
            "/analytics/trends?period_months=0".to_string(),
            "/analytics/comprehensive?period_months=100".to_string(),
            "/analytics/export?format=xml".to_string(),
            "/analytics/insights?period_months=25".to_string(),
        ];

        for uri in cases {
            let (status, body) = get(app.clone(), &uri, Some("1")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_user_gets_empty_results() -> Result<()> {
        let (app, _db) = test_app().await?;

        let (status, body) = get(app.clone(), "/analytics/comprehensive", Some("42")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["filters"]["period_months"], 12);
        assert_eq!(body["data"]["monthly_spending"]["total_months"], 0);
        assert_eq!(body["data"]["category_analysis"]["total_spending"], 0.0);
        assert_eq!(body["data"]["spending_trends"]["statistics"]["trend_direction"], "stable");

        let (status, body) = get(app, "/analytics/insights", Some("42")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["insights"].as_array().unwrap().len(), 0);
        assert_eq!(body["data"]["analysis_period"]["months"], 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_category_breakdown() -> Result<()> {
        let (app, db) = test_app().await?;
        seed_recent(&db).await?;

        let (status, body) = get(app.clone(), "/analytics/categories", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        let top = &body["data"]["category_analysis"][0];
        assert_eq!(top["category"], "Electronics");
        assert_eq!(top["total_spending"], 1199.98);
        assert_eq!(top["purchase_count"], 2);
        assert!((top["percentage"].as_f64().unwrap() - 97.56).abs() < 0.01);
        assert_eq!(body["filters"]["period_months"], 12);
        assert!(body["filters"]["start_date"].is_string());

        // Another user sees nothing
        let (_, body) = get(app, "/analytics/categories", Some("2")).await;
        assert_eq!(body["data"]["total_categories"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stores_with_open_ended_range() -> Result<()> {
        let (app, db) = test_app().await?;
        seed_recent(&db).await?;

        let (status, body) =
            get(app, "/analytics/stores?start_date=2000-01-01", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_stores"], 2);
        assert_eq!(body["data"]["store_analysis"][0]["store_name"], "TechStore");
        assert!(body["filters"]["end_date"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn test_spending_and_trends() -> Result<()> {
        let (app, db) = test_app().await?;
        seed_recent(&db).await?;

        let (status, body) = get(app.clone(), "/analytics/spending", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_months"], 2);
        assert!(body["filters"]["year"].is_null());

        let (status, body) = get(app, "/analytics/trends?period_months=6", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["period_months"], 6);
        assert_eq!(body["data"]["trends_data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["statistics"]["trend_direction"], "increasing");
        assert_eq!(body["filters"]["period_months"], 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_shape() -> Result<()> {
        let (app, db) = test_app().await?;
        seed_recent(&db).await?;

        let (status, body) = get(app, "/analytics/summary", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("filters").is_none());
        assert_eq!(body["data"]["total_statistics"]["total_purchases"], 3);
        assert_eq!(body["data"]["total_statistics"]["total_spending"], 1229.97);
        assert!(body["data"]["current_month"].is_object());
        assert!(body["data"]["month_comparison"]["trend"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_export_formats() -> Result<()> {
        let (app, db) = test_app().await?;
        seed_recent(&db).await?;

        let (status, body) = get(app.clone(), "/analytics/export", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["export_info"]["format"], "json");
        assert_eq!(body["export_info"]["user_id"], 1);
        assert_eq!(body["data"]["category_analysis"]["total_categories"], 2);

        let (status, body) = get(app, "/analytics/export?format=CSV&period_months=3", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["export_info"]["format"], "csv");
        assert_eq!(body["export_info"]["period_months"], 3);
        assert!(body["export_info"]["note"].is_string());
        assert_eq!(body["data"]["store_analysis"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["spending_trends"].as_array().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_insights_for_concentrated_spending() -> Result<()> {
        let (app, db) = test_app().await?;
        seed_recent(&db).await?;

        let (status, body) = get(app, "/analytics/insights?period_months=6", Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        let kinds: Vec<&str> = body["data"]["insights"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["trend", "category", "store", "budget"]);
        assert_eq!(body["data"]["summary_stats"]["trend_direction"], "increasing");
        Ok(())
    }
}
