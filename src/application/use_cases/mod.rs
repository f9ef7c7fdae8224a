pub mod dataset_service;
pub mod insights;
pub mod outliers;
pub mod profiler;
pub mod report;
pub mod schema_inference;
pub mod statistics;
