pub mod config;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod export;
pub mod form;
pub mod ident;
pub mod introspect;
pub mod memo;
pub mod query_builder;
pub mod rave;
pub mod schema;
pub mod table;
pub mod update;

// Re-export them for easier access from the demos
pub use config::*;
pub use connection::*;
pub use dialect::*;
pub use error::*;
pub use form::render_inputs;
pub use ident::{is_email, validate_identifier};
pub use introspect::{Introspector, Operation};
pub use memo::*;
pub use query_builder::*;
pub use schema::*;
pub use table::*;
pub use update::{UpdateOutcome, UpdateStatement};
