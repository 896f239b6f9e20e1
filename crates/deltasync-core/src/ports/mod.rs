//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces the engine depends on, whose implementations live
//! in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IChangeLog`] - The server's change log: latest cursor, one page of
//!   records, or a persistent byte stream of records
//! - [`IObjectResolver`] - Maps a validated record to a typed domain object

pub mod change_log;
pub mod object_resolver;

pub use change_log::{ByteStream, DeltaPage, IChangeLog};
pub use object_resolver::{IObjectResolver, Resolution};
