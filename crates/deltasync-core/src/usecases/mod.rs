//! Use cases (application services)
//!
//! Each use case orchestrates the ports to run one kind of sync:
//!
//! - [`FetchDeltasUseCase`] - Paginated polling, in callback or lazy mode
//! - [`StreamDeltasUseCase`] - One persistent streaming connection
//!
//! Both route every raw record through the shared [`Dispatcher`].

pub mod dispatch;
pub mod fetch_deltas;
pub mod stream_deltas;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{Delivery, Dispatcher};
pub use fetch_deltas::{DeltaIter, Deltas, FetchDeltasUseCase};
pub use stream_deltas::StreamDeltasUseCase;
