pub mod errors;
pub mod player;
pub mod prediction;
pub mod schema;
