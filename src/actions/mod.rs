//! Action catalog, validation, resolution and execution
//!
//! Actions are typed, validated operations grouped into namespaces. A window
//! makes namespaces visible; the model calls actions against a window either
//! fully qualified (`ns.action`) or by short name when unambiguous.
//!
//! # Pipeline
//!
//! ```text
//! model call ──> resolver ──> validator ──> handler (failure boundary)
//!                  │              │              │
//!                  └──── failed ActionResult ────┘──> ActionExecuted event
//! ```
//!
//! Every failure in this pipeline is a *value* (a failed [`ActionResult`]),
//! never a propagated error: faults from user-supplied handler logic stop
//! at the executor boundary.

pub mod executor;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod types;

pub use executor::{ActionEvent, ActionExecutor, CLOSE_ACTION};
pub use registry::ActionRegistry;
pub use resolver::{resolve, ResolvedAction};
pub use schema::{ParamKind, ParamSchema};
pub use types::{ActionDescriptor, ActionMode, ActionOutcome, ActionResult};
