//! Core types and pure logic for the GYMO menu catalog.
//!
//! Everything in this crate is I/O free: domain types, request payloads,
//! association rules, retention arithmetic, cache key discipline and the
//! repository/cache traits that the server crate implements.

pub mod cache;
pub mod catalog;
pub mod serde;
pub mod storage;
