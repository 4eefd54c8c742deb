mod engineer;
pub mod rolling;

pub use engineer::FeatureEngineer;
