//! Console event listener: the producer side of the input channel.
//!
//! A dedicated thread polls crossterm for console events, packs key presses into
//! SOL bytes and hands them to the consumer through a bounded channel. When the
//! consumer falls behind, the send blocks and the listener stops reading the
//! console until there is room again.

use crate::console::keycode::encode_key_event;
use crate::error::Result;
use crossterm::event::{self, Event};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::Sender;

/// Polls console events and packs them into bytes.
#[derive(Debug, Default)]
pub struct InputCollector;

impl InputCollector {
    pub fn new() -> Self {
        Self
    }

    /// Wait up to `timeout` for a console event and pack it.
    ///
    /// Returns `Ok(None)` on timeout or for events that produce no bytes.
    pub fn poll_bytes(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let event = event::read()?;
        Ok(self.process_event(event))
    }

    /// Pack a single event (also used for synthetic events in tests).
    pub fn process_event(&mut self, event: Event) -> Option<Vec<u8>> {
        match event {
            Event::Key(key) => encode_key_event(&key),
            Event::Paste(text) if !text.is_empty() => Some(text.into_bytes()),
            _ => None,
        }
    }
}

/// Spawn the listener thread.
///
/// The thread exits when `shutdown` is set, when the receiver is gone, or on a
/// console error.
pub fn spawn_listener(
    tx: Sender<Vec<u8>>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut collector = InputCollector::new();
        while !shutdown.load(Ordering::SeqCst) {
            match collector.poll_bytes(poll_interval) {
                Ok(Some(bytes)) => {
                    if tx.blocking_send(bytes).is_err() {
                        log::debug!("Console input receiver dropped, listener exiting");
                        return;
                    }
                }
                Ok(None) => continue,
                Err(err) => {
                    log::error!("Console listener error: {err}");
                    break;
                }
            }
        }
    })
}
