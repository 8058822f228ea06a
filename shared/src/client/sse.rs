//! Line framing for the `_search_stream` protocol.
//!
//! The stream is a sequence of text lines. The result arrives as a line equal
//! to [`HITS_EVENT_MARKER`] followed by one line holding [`DATA_PREFIX`] and
//! the JSON envelope. Other events are ignored.

use super::AcquireError;
use crate::models::ResultEnvelope;

/// Event line announcing the hits payload.
pub const HITS_EVENT_MARKER: &str = "event: search_response_hits";

/// Prefix of the payload line.
pub const DATA_PREFIX: &str = "data: ";

/// Splits an incoming byte stream into lines.
///
/// Chunks may end anywhere, including inside a multi-byte character, so
/// bytes are buffered until a full line is available. Each byte is searched
/// for a terminator once, however many chunks a line spans.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Start of the first line not yet returned.
    start: usize,
    /// Bytes before this offset are known to hold no `\n`.
    scanned: usize,
}

impl LineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of the stream.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.pending.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.pending.extend_from_slice(chunk);
    }

    /// Removes and returns the next complete line, without its terminator.
    ///
    /// A trailing `\r` is stripped as well.
    pub fn next_line(&mut self) -> Option<String> {
        let Some(offset) = memchr::memchr(b'\n', &self.pending[self.scanned..]) else {
            self.scanned = self.pending.len();
            return None;
        };
        let end = self.scanned + offset;
        let line = &self.pending[self.start..end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let text = String::from_utf8_lossy(line).into_owned();

        self.start = end + 1;
        self.scanned = self.start;
        Some(text)
    }

    /// Returns whatever is left once the stream has ended, if anything.
    pub fn take_remainder(&mut self) -> Option<String> {
        let rest = &self.pending[self.start..];
        let text = (!rest.is_empty())
            .then(|| String::from_utf8_lossy(rest).trim_end_matches('\r').to_string());
        self.pending.clear();
        self.start = 0;
        self.scanned = 0;
        text
    }
}

/// Looks for the hits event among the lines of a stream.
#[derive(Debug, Default)]
pub struct HitsEventScanner {
    marker_seen: bool,
}

impl HitsEventScanner {
    /// Creates a scanner that has not seen the marker yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line.
    ///
    /// Returns `Ok(Some(_))` with the decoded envelope when `line` is the
    /// payload following the marker, `Ok(None)` while still scanning.
    ///
    /// # Errors
    ///
    /// Returns `AcquireError::Decode` when the payload is not a valid envelope.
    pub fn feed(&mut self, line: &str) -> Result<Option<ResultEnvelope>, AcquireError> {
        if self.marker_seen {
            let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
            let envelope = serde_json::from_str(payload).map_err(AcquireError::Decode)?;
            return Ok(Some(envelope));
        }

        if line == HITS_EVENT_MARKER {
            tracing::debug!("Found hits event in search stream");
            self.marker_seen = true;
        }
        Ok(None)
    }

    /// Called at end of stream; reports why no envelope was produced.
    #[must_use]
    pub fn finish(&self) -> AcquireError {
        if self.marker_seen {
            AcquireError::MalformedStream(format!("{HITS_EVENT_MARKER} without a data line"))
        } else {
            AcquireError::NoResultEvent
        }
    }
}

/// Incremental decoder for a `_search_stream` response body.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineBuffer,
    scanner: HitsEventScanner,
}

impl StreamDecoder {
    /// Creates a decoder at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk; returns the envelope as soon as its data line is complete.
    ///
    /// # Errors
    ///
    /// Returns `AcquireError::Decode` when the payload is not a valid envelope.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<ResultEnvelope>, AcquireError> {
        self.lines.push(chunk);
        while let Some(line) = self.lines.next_line() {
            if let Some(envelope) = self.scanner.feed(&line)? {
                return Ok(Some(envelope));
            }
        }
        Ok(None)
    }

    /// Ends the stream, decoding a final unterminated line if there is one.
    ///
    /// # Errors
    ///
    /// Returns `NoResultEvent`, `MalformedStream` or `Decode` when the stream
    /// held no usable hits event.
    pub fn finish(mut self) -> Result<ResultEnvelope, AcquireError> {
        if let Some(line) = self.lines.take_remainder() {
            if let Some(envelope) = self.scanner.feed(&line)? {
                return Ok(envelope);
            }
        }
        Err(self.scanner.finish())
    }
}
