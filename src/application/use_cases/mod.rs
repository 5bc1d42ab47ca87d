pub mod auth;
pub mod datasets;
pub mod summary_aggregator;
