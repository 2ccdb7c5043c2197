//! Lifecycle events: data model and broadcast bus.
//!
//! A group publishes [`Event`]s (task spawned/stopped/failed, group aborted,
//! generation closed, retry scheduled) to an optional [`Bus`]. Publishing is
//! fire-and-forget; subscribe before running the group to observe events.

mod bus;
mod event;

#[cfg(feature = "logging")]
mod log;

pub use bus::Bus;
pub use event::{Event, EventKind};

#[cfg(feature = "logging")]
pub use log::LogWriter;
