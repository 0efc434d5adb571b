//! Postgres-backed implementations of the repository traits.
//!
//! Run/job/vector/cluster bookkeeping lives in fixed tables (mirroring the
//! schema this system replaces); raw feed content lives in
//! date-partitioned `feed_entries_YYYYMMDD` tables resolved through
//! [`newsgrid_core::TableContext`], so those queries build SQL with the
//! resolved table name instead of using `sqlx::query!`.

mod repositories;

pub use repositories::{
    PgClusterRepository, PgFeedEntryRepository, PgJobRepository, PgRunRepository,
    PgVectorRepository,
};
