//! Input text, loaded eagerly from a string or lazily from a reader.

use std::io::{self, Read};

use thiserror::Error;
use tracing::trace;

const CHUNK_SIZE: usize = 8 * 1024;

/// Failure to read parser input
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("input is not valid UTF-8 at byte {0}")]
    InvalidUtf8(usize),
}

/// Text the parser reads from.
///
/// Reader input is decoded in chunks as the parser asks for more; a char
/// split across two chunks is held back until it is complete.
pub struct InputBuffer {
    text: String,
    source: Option<Box<dyn Read>>,
    pending: Vec<u8>,
    error: Option<InputError>,
}

impl InputBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            source: None,
            pending: Vec::new(),
            error: None,
        }
    }

    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            text: String::new(),
            source: Some(Box::new(reader)),
            pending: Vec::new(),
            error: None,
        }
    }

    /// Load until at least `end` bytes are available. Returns false if the
    /// input is shorter.
    pub fn ensure(&mut self, end: usize) -> bool {
        while self.text.len() < end && self.source.is_some() {
            self.fill();
        }
        self.text.len() >= end
    }

    fn fill(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let mut chunk = [0u8; CHUNK_SIZE];
        let read = match source.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return,
            Err(err) => {
                self.source = None;
                self.error = Some(err.into());
                return;
            }
        };
        if read == 0 {
            self.source = None;
            if !self.pending.is_empty() {
                self.error = Some(InputError::InvalidUtf8(self.text.len()));
                self.pending.clear();
            }
            return;
        }
        self.pending.extend_from_slice(&chunk[..read]);
        match std::str::from_utf8(&self.pending) {
            Ok(decoded) => {
                self.text.push_str(decoded);
                self.pending.clear();
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if err.error_len().is_some() {
                    self.source = None;
                    self.error = Some(InputError::InvalidUtf8(self.text.len() + valid));
                }
                if let Ok(decoded) = std::str::from_utf8(&self.pending[..valid]) {
                    self.text.push_str(decoded);
                }
                self.pending.drain(..valid);
            }
        }
        trace!(loaded = self.text.len(), "input chunk");
    }

    /// Everything loaded so far
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_complete(&self) -> bool {
        self.source.is_none()
    }

    /// True if no char starts at `pos`
    pub fn at_end(&mut self, pos: usize) -> bool {
        !self.ensure(pos + 1)
    }

    /// Load the rest of the input
    pub fn load_all(&mut self) -> &str {
        while self.source.is_some() {
            self.fill();
        }
        &self.text
    }

    pub fn take_error(&mut self) -> Option<InputError> {
        self.error.take()
    }

    pub fn into_text(mut self) -> String {
        self.load_all();
        self.text
    }
}
