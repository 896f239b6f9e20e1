//! Integration tests for deltasync-api
//!
//! Uses wiremock to simulate the change-log API and verifies end-to-end
//! behavior of the client, the delta endpoints, both consumption modes of
//! the paginated pull, and the streaming reader.

mod common;

mod test_deltas;
mod test_errors;
mod test_latest_cursor;
mod test_stream;
