pub mod store;

pub use store::{AnalysisRecord, InMemoryStatsStore, StatsExport, StatsSnapshot, StatsStore, HISTORY_CAPACITY};
