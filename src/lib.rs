pub mod ai;
pub mod analysis;
pub mod config;
pub mod error;
pub mod measure;
pub mod recommend;

pub use analysis::{AnalysisSession, ProductData, SizeAnalysis, SizeEngine};
pub use config::EngineConfig;
pub use error::AppError;
pub use measure::chart::{NormalizedSizeChart, RawTable};
pub use measure::selector::UserProfile;
pub use recommend::record::RecommendationRecord;
