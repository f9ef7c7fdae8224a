pub mod use_cases;

pub use use_cases::dataset_service::DatasetService;
pub use use_cases::insights::InsightGenerator;
pub use use_cases::outliers::OutlierDetector;
pub use use_cases::profiler::Profiler;
pub use use_cases::report::ReportRenderer;
pub use use_cases::schema_inference::SchemaInferer;
