//! Query Module
//!
//! Cache-instrumented read path shared by entity reads and search.

mod descriptor;
mod instrumented;
mod latency;

pub use descriptor::{kind_prefix, QueryDescriptor};
pub use instrumented::{CacheStatsReport, InstrumentedQuery, QueryOptions, RegionStatsView};
pub use latency::{LatencySummary, LatencyTracker};
