//! Core data model types for segments, logical messages, and call records.

pub mod call;
pub mod message;
pub mod segment;
