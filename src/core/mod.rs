/// Monthly, category, store and trend aggregation
pub mod analytics;

/// Rule-based spending advice
pub mod insights;

/// Calendar windows and month labels
pub mod period;

/// Product catalog writes and lookups
pub mod product;

/// Purchase recording and sharing
pub mod purchase;

/// Purchase-history access for the aggregators
pub mod repository;

/// Dashboard summary and export packaging
pub mod summary;
