//! deltasync Core - Delta sync engine
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Cursor`, `ChangeRecord`, `DeltaFilter`, `SyncSession`, `CursorStore`
//! - **Record handling** - the record validator and the incremental JSON framer
//! - **Use cases** - `FetchDeltasUseCase` (paginated, callback or lazy) and `StreamDeltasUseCase`
//! - **Port definitions** - Traits for adapters: `IChangeLog`, `IObjectResolver`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
