mod aggregator;

pub use aggregator::WeeklyReport;
