//! Core simulation engine.
//!
//! This module provides the central [`SimWorld`] coordinator that manages
//! virtual time and event processing, and the typed event queue that backs
//! it.
//!
//! ## Submodules
//!
//! - `world` - Core SimWorld coordinator and topology arenas
//! - `events` - Event types and queue for scheduling

/// Event types and queue for scheduling.
pub mod events;
/// Core SimWorld coordinator and topology arenas.
pub mod world;

// Re-export main types at module level
pub use events::{Event, EventQueue, ScheduledEvent};
pub use world::SimWorld;
