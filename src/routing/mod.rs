//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration phase (single owner, &mut Router):
//!     router.get/post/... ──┬─ static pattern ──▶ static table (method → path → handler)
//!     group.get/post/...    │
//!       → compose(group mw) ┴─ dynamic pattern ─▶ dynamic list (registration order)
//!     router.freeze() → FrozenRouter (Arc, read-only, shareable)
//!
//! Dispatch phase (per request):
//!     static lookup → dynamic scan (first match wins)
//!     → method-not-allowed (static table only) → not-found
//!     → compose(global middleware) → handler(&mut Context)
//! ```
//!
//! # Design Decisions
//! - Dynamic routes are not ranked; registration order decides overlaps
//! - Group middleware is baked in at registration, global middleware is
//!   composed on every dispatch
//! - Registration is impossible after `freeze`, so dispatch needs no locks

pub mod group;
pub mod matcher;
pub mod router;

pub use group::RouteGroup;
pub use router::{FrozenRouter, RouteInfo, Router};
