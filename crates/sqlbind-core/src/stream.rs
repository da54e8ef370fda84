//! Bounded token buffer between the lexer and the parser.
//!
//! The lexer runs as the producer on its own thread and the parser
//! consumes on the calling thread; the two communicate only through
//! this buffer. Tokens arrive in strict emission order, the producer
//! blocks while the buffer is full, and dropping the [`TokenWriter`] is
//! the done signal. Once the reader has observed done, every later read
//! reports done again without touching the channel.
//!
//! A purely sequential caller can use the same API by draining the
//! lexer into the channel before parsing; capacity permitting, nothing
//! about the reader changes.

use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use thiserror::Error;

use crate::lexer::Token;

/// How many tokens the buffer holds before the lexer blocks.
pub const TOKEN_BUFFER_SIZE: usize = 100;

/// How long a read waits before giving up. A timeout means the producer
/// neither sent a token nor finished, which is a pipeline bug, not a
/// property of the input.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// The reader waited [`READ_TIMEOUT`] without the producer sending a
/// token or finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out waiting for the next token")]
pub struct ReadTimeout;

/// Creates a connected writer/reader pair over a bounded buffer.
#[must_use]
pub fn token_channel() -> (TokenWriter, TokenStream) {
    let (tx, rx) = sync_channel(TOKEN_BUFFER_SIZE);
    (
        TokenWriter { tx },
        TokenStream {
            rx,
            peeked: None,
            done: false,
            timeout: READ_TIMEOUT,
        },
    )
}

/// The producing end. Dropping it signals done to the reader.
pub struct TokenWriter {
    tx: SyncSender<Token>,
}

impl TokenWriter {
    /// Sends one token, blocking while the buffer is full.
    ///
    /// Returns `false` when the reader is gone; the producer should
    /// stop lexing at that point.
    pub fn write(&self, token: Token) -> bool {
        self.tx.send(token).is_ok()
    }
}

/// The consuming end: a token reader with one-token lookahead.
pub struct TokenStream {
    rx: Receiver<Token>,
    /// A token (or the done signal) pulled ahead by `peek`.
    peeked: Option<Option<Token>>,
    /// Latched once the channel reports done.
    done: bool,
    timeout: Duration,
}

impl TokenStream {
    /// Replaces the read timeout. Mostly useful in tests.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Consumes and returns the next token, or `None` once the
    /// producer has finished.
    ///
    /// # Errors
    ///
    /// Returns [`ReadTimeout`] if the producer stays silent too long.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Token>, ReadTimeout> {
        if let Some(peeked) = self.peeked.take() {
            return Ok(peeked);
        }
        if self.done {
            return Ok(None);
        }
        match self.rx.recv_timeout(self.timeout) {
            Ok(token) => Ok(Some(token)),
            Err(RecvTimeoutError::Disconnected) => {
                self.done = true;
                Ok(None)
            }
            Err(RecvTimeoutError::Timeout) => Err(ReadTimeout),
        }
    }

    /// Returns the next token without consuming it. Repeated peeks
    /// return the same token, and a peek followed by [`next`] agrees
    /// with it.
    ///
    /// # Errors
    ///
    /// Returns [`ReadTimeout`] if the producer stays silent too long.
    ///
    /// [`next`]: Self::next
    pub fn peek(&mut self) -> Result<Option<Token>, ReadTimeout> {
        if self.peeked.is_none() {
            let next = self.next()?;
            self.peeked = Some(next);
        }
        Ok(self.peeked.clone().flatten())
    }
}
