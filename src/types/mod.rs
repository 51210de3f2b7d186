//! Core types: identifiers and the virtual clock instant.
//!
//! - [`id`]: [`ZoneId`], [`TaskId`] and [`Time`]

pub mod id;

pub use id::{TaskId, Time, ZoneId};
