//! Select-style multiplexing of the SOL socket and pending console input.

use crate::console::input::ConsoleInput;
use crate::error::{MgmtError, Result};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

/// Which side has something to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub socket: bool,
    pub input: bool,
}

impl Readiness {
    /// Nothing ready (the wait timed out).
    pub fn is_idle(&self) -> bool {
        !self.socket && !self.input
    }
}

/// Something that can signal read readiness without consuming data.
#[async_trait]
pub trait ReadySource: Send + Sync {
    async fn readable(&self) -> io::Result<()>;
}

#[async_trait]
impl ReadySource for TcpStream {
    async fn readable(&self) -> io::Result<()> {
        TcpStream::readable(self).await
    }
}

enum Woke {
    Socket(io::Result<()>),
    Input,
}

async fn socket_ready_now<S: ReadySource + ?Sized>(socket: &S) -> Result<bool> {
    match tokio::time::timeout(Duration::ZERO, socket.readable()).await {
        Ok(result) => result
            .map(|()| true)
            .map_err(|e| MgmtError::io("socket readiness check failed", e)),
        Err(_) => Ok(false),
    }
}

/// Wait until the socket is readable, console input is pending, or `timeout`
/// elapses. `None` waits indefinitely.
///
/// Input that is already pending returns at once. A timeout returns an idle
/// [`Readiness`]; socket errors are returned as errors.
pub async fn select<S: ReadySource + ?Sized>(
    input: &mut ConsoleInput,
    socket: &S,
    timeout: Option<Duration>,
) -> Result<Readiness> {
    if input.has_pending() {
        return Ok(Readiness {
            socket: socket_ready_now(socket).await?,
            input: true,
        });
    }

    let wait = async {
        tokio::select! {
            res = socket.readable() => Woke::Socket(res),
            _ = input.wait_pending() => Woke::Input,
        }
    };

    let woke = match timeout {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(woke) => woke,
            Err(_) => return Ok(Readiness::default()),
        },
        None => wait.await,
    };

    match woke {
        Woke::Socket(res) => {
            res.map_err(|e| MgmtError::io("socket readiness wait failed", e))?;
            Ok(Readiness {
                socket: true,
                input: input.has_pending(),
            })
        }
        Woke::Input => Ok(Readiness {
            socket: socket_ready_now(socket).await?,
            input: input.has_pending(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Readiness source toggled by the test.
    struct Flag(AtomicBool);

    #[async_trait]
    impl ReadySource for Flag {
        async fn readable(&self) -> io::Result<()> {
            if self.0.load(Ordering::SeqCst) {
                Ok(())
            } else {
                std::future::pending().await
            }
        }
    }

    struct Broken;

    #[async_trait]
    impl ReadySource for Broken {
        async fn readable(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[tokio::test]
    async fn times_out_when_nothing_is_ready() {
        let (_tx, mut input) = ConsoleInput::channel(1, None);
        let socket = Flag(AtomicBool::new(false));

        let ready = select(&mut input, &socket, Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert!(ready.is_idle());
    }

    #[tokio::test]
    async fn reports_pending_input_immediately() {
        let (tx, mut input) = ConsoleInput::channel(1, None);
        tx.send(b"k".to_vec()).await.unwrap();
        let socket = Flag(AtomicBool::new(false));

        let ready = select(&mut input, &socket, None).await.unwrap();
        assert_eq!(
            ready,
            Readiness {
                socket: false,
                input: true
            }
        );
    }

    #[tokio::test]
    async fn reports_both_sides() {
        let (tx, mut input) = ConsoleInput::channel(1, None);
        tx.send(b"k".to_vec()).await.unwrap();
        let socket = Flag(AtomicBool::new(true));

        let ready = select(&mut input, &socket, Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(
            ready,
            Readiness {
                socket: true,
                input: true
            }
        );
    }

    #[tokio::test]
    async fn wakes_on_input_sent_later() {
        let (tx, mut input) = ConsoleInput::channel(1, None);
        let socket = Flag(AtomicBool::new(false));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tx.send(b"late".to_vec()).await.unwrap();
        });

        let ready = select(&mut input, &socket, Some(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(ready.input);
        assert!(!ready.socket);
    }

    #[tokio::test]
    async fn socket_error_is_returned() {
        let (_tx, mut input) = ConsoleInput::channel(1, None);
        let err = select(&mut input, &Broken, Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, MgmtError::Io { .. }));
    }
}
