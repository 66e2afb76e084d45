//! `smsgate`: a small HTTP gateway for a GSM modem.
//!
//! This crate provides the message engine behind the gateway: reading the
//! modem's segment store, linking segments into logical messages, GSM text
//! transcoding, ordinal-addressed deletion, and a missed-call log fed by the
//! modem's asynchronous call events.

pub mod api;
pub mod auth;
pub mod calls;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod gate;
pub mod link;
pub mod model;
pub mod outbox;
pub mod status;
pub mod store;

#[cfg(test)]
mod proptests;
