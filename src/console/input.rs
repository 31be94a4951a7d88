//! Consumer side of the console input channel.
//!
//! [`ConsoleInput`] drains packed key bytes from the listener, filters the
//! session escape sequence out of them, and hands the rest to the terminal
//! driver through a non-blocking [`read`](ConsoleInput::read).

use std::collections::VecDeque;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Watches for `<escape>.` at the start of a line.
///
/// `<escape><escape>` sends a single escape character; an escape followed by
/// anything else is passed through unchanged.
#[derive(Debug, Clone)]
pub struct EscapeScanner {
    escape: Option<u8>,
    at_line_start: bool,
    held: bool,
}

impl EscapeScanner {
    pub fn new(escape: Option<u8>) -> Self {
        Self {
            escape,
            at_line_start: true,
            held: false,
        }
    }

    /// Feed one byte, appending what should be sent to `out`.
    ///
    /// Returns true when the byte completes the end-of-session sequence.
    pub fn feed(&mut self, byte: u8, out: &mut VecDeque<u8>) -> bool {
        if self.held {
            self.held = false;
            if byte == b'.' {
                return true;
            }
            if Some(byte) == self.escape {
                out.push_back(byte);
                self.at_line_start = false;
                return false;
            }
            if let Some(escape) = self.escape {
                out.push_back(escape);
            }
            self.at_line_start = false;
        }

        if self.at_line_start && Some(byte) == self.escape {
            self.held = true;
            return false;
        }

        out.push_back(byte);
        self.at_line_start = byte == b'\r' || byte == b'\n';
        false
    }

    /// Release an escape character still waiting for its second byte.
    pub fn flush(&mut self, out: &mut VecDeque<u8>) {
        if std::mem::take(&mut self.held) {
            out.extend(self.escape);
            self.at_line_start = false;
        }
    }
}

/// Pending console input owned by one SOL session.
#[derive(Debug)]
pub struct ConsoleInput {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    scanner: EscapeScanner,
    done: bool,
    disconnected: bool,
}

impl ConsoleInput {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>, escape: Option<u8>) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            scanner: EscapeScanner::new(escape),
            done: false,
            disconnected: false,
        }
    }

    /// Bounded channel plus the input reading from it.
    pub fn channel(capacity: usize, escape: Option<u8>) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx, escape))
    }

    /// True once the escape sequence was typed. Input after it is discarded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// True once the listener has gone away.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Copy pending input into `buf` without blocking. Returns the number of bytes copied.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.fill();
        let count = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }
        count
    }

    pub fn has_pending(&mut self) -> bool {
        self.fill();
        !self.pending.is_empty()
    }

    /// Resolve once input is pending or the escape sequence ended the session.
    ///
    /// Never resolves after the listener is gone with nothing left to read.
    /// Cancel safe, so it can sit in a `tokio::select!` branch.
    pub async fn wait_pending(&mut self) {
        loop {
            if self.has_pending() || self.done {
                return;
            }
            if self.disconnected {
                std::future::pending::<()>().await;
            }
            match self.rx.recv().await {
                Some(chunk) => self.absorb(&chunk),
                None => self.disconnected = true,
            }
        }
    }

    /// Stop accepting input. A listener blocked on a full channel is released.
    ///
    /// Queued chunks stay readable, and a held escape character is passed on.
    pub fn close(&mut self) {
        self.rx.close();
        self.fill();
        if !self.done {
            self.scanner.flush(&mut self.pending);
        }
    }

    fn fill(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.absorb(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
    }

    fn absorb(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if self.done {
                return;
            }
            if self.scanner.feed(byte, &mut self.pending) {
                log::debug!("Escape sequence received, ending console session");
                self.done = true;
            }
        }
    }
}
