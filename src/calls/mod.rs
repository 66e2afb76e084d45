//! Missed-call tracking.
//!
//! The driver reports call events on its own thread. [`EventTracker`] turns
//! missed incoming calls into [`MissedCallRecord`](crate::model::call::MissedCallRecord)s
//! and appends them to the persistent [`CallLog`], which the API drains in
//! arrival order. The two sides share nothing but the log.

pub mod log;
pub mod tracker;

pub use log::CallLog;
pub use tracker::EventTracker;
