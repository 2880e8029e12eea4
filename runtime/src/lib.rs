//! # Boxoffice Runtime
//!
//! Consumer-side primitives that turn raw requests into race-free, UI-consumable
//! state.
//!
//! ## Core Components
//!
//! - **Latest Cell**: pointer-to-latest parameter cell read by in-flight work
//! - **Query Guard**: per query site generation counter plus cancellation; stale
//!   results are discarded
//! - **Refetch Controller**: debounced search, immediate filter changes
//! - **Fan-Out**: independent sub-resource loads with per-section state
//!
//! ## Example
//!
//! ```
//! use boxoffice_runtime::guard::QueryGuard;
//!
//! # async fn example() {
//! let guard: QueryGuard<Vec<String>> = QueryGuard::new("events");
//!
//! let outcome = guard
//!     .run(|_cancel| async { Ok::<_, String>(vec!["Jazz night".to_string()]) })
//!     .await;
//!
//! assert!(outcome.is_applied());
//! assert_eq!(guard.state().data.map(|d| d.len()), Some(1));
//! # }
//! ```

pub mod cell;
pub mod debounce;
pub mod fanout;
pub mod filters;
pub mod guard;

// Re-export commonly used types
pub use cell::LatestCell;
pub use debounce::{DebounceConfig, Dispatch, RefetchController};
pub use fanout::{FanOut, FanOutHandle, SectionMap};
pub use filters::{FilterKey, ListFilters};
pub use guard::{QueryGuard, QueryOutcome, QueryState, Ticket};
