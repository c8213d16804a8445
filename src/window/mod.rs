//! Window model and directory
//!
//! A window is the unit of agent-visible state: a titled block of content
//! rendered into the prompt, with a set of visible action namespaces and an
//! optional bound handler that services action calls. Windows are owned by
//! the [`WindowDirectory`], which stamps lifecycle metadata from the logical
//! clock and notifies registered observers of every change.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  add/remove/update   ┌──────────────────┐
//! │ Application │─────────────────────>│ WindowDirectory  │
//! └─────────────┘                      └────────┬─────────┘
//!                                               │ WindowEvent
//!                                     ┌─────────▼─────────┐
//!                                     │  WindowObserver   │
//!                                     │ (timeline mirror) │
//!                                     └───────────────────┘
//! ```

pub mod directory;
pub mod types;

pub use directory::{WindowDirectory, WindowEvent, WindowEventKind, WindowObserver};
pub use types::{RefreshMode, Window, WindowHandler, WindowOptions};
