//! Serial-over-LAN console input shim.
//!
//! The terminal driver owns a [`SolConsole`] for the length of a session. It
//! bundles what the driver needs from the local console:
//!
//! - raw console mode for the session ([`mode`])
//! - a listener thread packing key presses into bytes ([`listener`], [`keycode`])
//! - non-blocking reads of pending input ([`input`])
//! - a select over the SOL socket and pending input ([`select`](mod@select))

pub mod input;
pub mod keycode;
pub mod listener;
pub mod mode;
pub mod select;

pub use input::{ConsoleInput, EscapeScanner};
pub use keycode::{encode_key_event, keycode_for, KeySequence};
pub use listener::{spawn_listener, InputCollector};
pub use mode::ConsoleMode;
pub use select::{Readiness, ReadySource};

use crate::config::ConsoleConfig;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Console side of one SOL session.
pub struct SolConsole {
    input: ConsoleInput,
    shutdown: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
    mode: Option<ConsoleMode>,
}

impl SolConsole {
    /// Enter raw mode (if configured) and start listening to the console.
    pub fn start(config: &ConsoleConfig) -> Result<Self> {
        config.validate()?;

        let mode = if config.raw_mode {
            Some(ConsoleMode::enter_raw()?)
        } else {
            None
        };

        let escape = Some(config.escape_char as u8);
        let (tx, input) = ConsoleInput::channel(config.buffer_capacity, escape);
        let mut console = Self::from_input(input);
        console.mode = mode;
        console.listener = Some(spawn_listener(
            tx,
            Arc::clone(&console.shutdown),
            config.poll_interval(),
        ));
        log::debug!(
            "Console listener started (capacity {}, escape {:?})",
            config.buffer_capacity,
            config.escape_char
        );

        Ok(console)
    }

    /// Session fed by an existing input channel. No listener thread is started
    /// and the console mode is left alone.
    pub fn from_input(input: ConsoleInput) -> Self {
        Self {
            input,
            shutdown: Arc::new(AtomicBool::new(false)),
            listener: None,
            mode: None,
        }
    }

    /// Copy pending console input into `buf`; 0 when nothing is pending.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.input.read(buf)
    }

    /// Wait for the socket or the console, see [`select::select`].
    pub async fn select<S: ReadySource + ?Sized>(
        &mut self,
        socket: &S,
        timeout: Option<Duration>,
    ) -> Result<Readiness> {
        select::select(&mut self.input, socket, timeout).await
    }

    /// True once the user typed the escape sequence.
    pub fn is_done(&self) -> bool {
        self.input.is_done()
    }

    /// True while the session holds the console in raw mode.
    pub fn is_raw(&self) -> bool {
        self.mode.as_ref().is_some_and(ConsoleMode::is_raw)
    }

    /// Stop the listener and restore the console mode. Idempotent.
    ///
    /// Blocks for up to one poll interval while the listener thread exits.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.input.close();
        if let Some(handle) = self.listener.take() {
            if handle.join().is_err() {
                log::error!("Console listener thread panicked");
            }
        }
        self.mode.take();
    }
}

impl Drop for SolConsole {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;

    struct Silent;

    #[async_trait]
    impl ReadySource for Silent {
        async fn readable(&self) -> io::Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn reads_input_until_escape() {
        let (tx, input) = ConsoleInput::channel(4, Some(b'~'));
        let mut console = SolConsole::from_input(input);
        assert!(!console.is_raw());

        tx.send(b"ls\r".to_vec()).await.unwrap();
        let ready = console
            .select(&Silent, Some(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(ready.input);
        assert!(!ready.socket);

        tx.send(b"~.exit".to_vec()).await.unwrap();
        let mut buf = [0u8; 16];
        let n = console.read(&mut buf);
        assert_eq!(&buf[..n], b"ls\r");
        assert!(console.is_done());
        assert_eq!(console.read(&mut buf), 0);
    }

    #[tokio::test]
    async fn shutdown_twice_closes_input_once() {
        let (tx, input) = ConsoleInput::channel(1, None);
        let mut console = SolConsole::from_input(input);

        console.shutdown();
        console.shutdown();
        assert!(tx.send(b"late".to_vec()).await.is_err());
        drop(console);
    }

    #[test]
    fn started_listener_is_joined_on_shutdown() {
        let config = ConsoleConfig {
            raw_mode: false,
            poll_interval_ms: 5,
            ..ConsoleConfig::default()
        };
        let mut console = SolConsole::start(&config).unwrap();
        assert!(console.listener.is_some());
        assert!(!console.is_raw());

        console.shutdown();
        assert!(console.listener.is_none());
        console.shutdown();
    }

    #[tokio::test]
    async fn shutdown_from_blocking_task() {
        let config = ConsoleConfig {
            raw_mode: false,
            poll_interval_ms: 5,
            ..ConsoleConfig::default()
        };
        let mut console = SolConsole::start(&config).unwrap();
        tokio::task::spawn_blocking(move || console.shutdown())
            .await
            .unwrap();
    }

    #[test]
    fn start_rejects_invalid_config() {
        let config = ConsoleConfig {
            buffer_capacity: 0,
            raw_mode: false,
            ..ConsoleConfig::default()
        };
        assert!(SolConsole::start(&config).is_err());
    }
}
