// ── Query cache ──
//
// Keyed read cache with per-operation freshness, shared in-flight fetches,
// transient-error retry for reads and prefix invalidation driven by writes.

mod client;
mod key;
mod options;

pub use client::{Mutation, QueryClient};
pub use key::QueryKey;
pub use options::{MutationState, QueryOptions, QueryState, RetryPolicy};
