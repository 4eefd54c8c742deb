pub mod features;
pub mod metadata;
pub mod model;
pub mod report;
