//! Live Monitoring Module
//!
//! Document source abstraction, an in-memory backend, the live aggregator
//! and the monitor holding the current joined view.

pub mod aggregator;
pub mod live;
pub mod memory;
pub mod source;

pub use aggregator::{
    join_live_status, AttemptView, LiveAggregator, LiveCounts, LiveStatus, LiveView,
    SourceFailure, StudentStatus, DEFAULT_FETCH_TIMEOUT, DEFAULT_PAGE_LIMIT, UNKNOWN_LABEL,
};
pub use live::LiveMonitor;
pub use memory::{MemoryBackend, SeedData};
pub use source::{
    channel_name, ChangeEvent, ChangeKind, DocumentList, DocumentSource, Filter, ListQuery,
    Subscription,
};
