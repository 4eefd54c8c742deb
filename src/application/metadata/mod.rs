mod joiner;

pub use joiner::MetadataJoiner;
