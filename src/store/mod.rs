//! Access to the modem's segment storage.

pub mod reader;
