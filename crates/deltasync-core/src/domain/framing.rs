//! Incremental framing of concatenated JSON records
//!
//! The streaming endpoint sends an unbounded concatenation of JSON values
//! with no enclosing array and no guaranteed delimiter. [`RecordFramer`]
//! buffers bytes as they arrive and peels complete values off the front:
//!
//! - an object or array is scanned for its closing bracket (string
//!   contents and escapes are skipped) and parsed once it is complete;
//! - a malformed object or array is dropped whole, nested values included;
//! - bytes that cannot start a value are discarded up to the next top-level
//!   `{` so decoding can resynchronize on the following record.
//!
//! Scan state survives across [`push`](RecordFramer::push) calls, so each
//! byte is scanned once however finely the value is chunked. A value whose
//! brackets never balance holds back everything after it until the stream
//! ends.

use bytes::{Buf, BytesMut};
use serde_json::Value;

/// One unit peeled off the front of the buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A complete JSON value
    Value(Value),
    /// Bytes that could not be decoded and were dropped
    Malformed {
        /// Number of bytes discarded
        discarded: usize,
    },
}

enum Attempt {
    Incomplete,
    Decoded(Value, usize),
    Malformed,
}

/// Nesting state of the value at the front of the buffer
#[derive(Debug, Default, Clone, Copy)]
struct Scan {
    /// Bytes of the buffer already scanned
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scan {
    /// Feeds one byte; returns true if it closes the outermost bracket
    fn feed(&mut self, byte: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return false;
        }
        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' if self.depth > 0 => {
                self.depth -= 1;
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }
}

/// Growable byte buffer that yields JSON values as they complete
#[derive(Debug, Default)]
pub struct RecordFramer {
    buffer: BytesMut,
    scan: Scan,
    /// Discarding bytes that cannot start a value
    skipping: bool,
}

impl RecordFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk received from the connection
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes currently buffered (an incomplete value, if any)
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Decodes the first complete value at the front of the buffer
    ///
    /// Returns `None` when the buffer is empty or holds only a partial
    /// value; call again after the next [`push`](Self::push).
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.scan.pos == 0 && !self.skipping {
            let leading = self
                .buffer
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(self.buffer.len());
            self.buffer.advance(leading);
        }
        if self.buffer.is_empty() {
            return None;
        }
        if self.skipping {
            return self.skip_to_record_start();
        }

        match self.buffer[0] {
            b'{' | b'[' => self.take_container(),
            _ => self.take_scalar(),
        }
    }

    /// Peels off an object or array once its closing bracket has arrived
    fn take_container(&mut self) -> Option<Frame> {
        let mut scan = self.scan;
        let end = self
            .buffer
            .iter()
            .skip(scan.pos)
            .position(|&b| scan.feed(b))
            .map(|offset| scan.pos + offset + 1);

        let Some(end) = end else {
            scan.pos = self.buffer.len();
            self.scan = scan;
            return None;
        };
        self.scan = Scan::default();

        let frame = match serde_json::from_slice::<Value>(&self.buffer[..end]) {
            Ok(value) => Frame::Value(value),
            Err(_) => Frame::Malformed { discarded: end },
        };
        self.buffer.advance(end);
        Some(frame)
    }

    /// Decodes a scalar, or starts skipping if the front is not a value
    fn take_scalar(&mut self) -> Option<Frame> {
        let attempt = {
            let mut values = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            match values.next() {
                None => Attempt::Incomplete,
                Some(Ok(value)) => Attempt::Decoded(value, values.byte_offset()),
                Some(Err(e)) if e.is_eof() => Attempt::Incomplete,
                Some(Err(_)) => Attempt::Malformed,
            }
        };

        match attempt {
            Attempt::Incomplete => None,
            Attempt::Decoded(value, consumed) => {
                self.buffer.advance(consumed);
                Some(Frame::Value(value))
            }
            Attempt::Malformed => {
                self.skipping = true;
                self.skip_to_record_start()
            }
        }
    }

    /// Discards up to the next `{`, waiting for more bytes if there is none
    fn skip_to_record_start(&mut self) -> Option<Frame> {
        let from = self.scan.pos.max(1);
        match self.buffer.iter().skip(from).position(|&b| b == b'{') {
            Some(offset) => {
                let discarded = from + offset;
                self.buffer.advance(discarded);
                self.scan = Scan::default();
                self.skipping = false;
                Some(Frame::Malformed { discarded })
            }
            None => {
                self.scan.pos = self.buffer.len();
                None
            }
        }
    }
}
