//! Async data access for the RAVE alert roster.
//!
//! One [`Connection`] per request talks to MySQL, SQL Server, PostgreSQL or
//! SQLite. Results land in a [`Table`] that can be projected into an HTML
//! edit form, written back through the update coordinator, or exported as
//! CSV.

pub mod libs;

pub use libs::*;
