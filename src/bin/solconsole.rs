//! solconsole - minimal serial-over-LAN terminal.
//!
//! Connects to a SOL endpoint, forwards console input to it and prints what
//! the server sends. Type the escape character followed by `.` at the start of
//! a line to quit.

use anyhow::{Context, Result};
use clap::Parser;
use mgmtutil::console::SolConsole;
use mgmtutil::{logging, Config};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::net::TcpStream;

const SELECT_TIMEOUT: Duration = Duration::from_millis(500);
const NET_BUFFER_SIZE: usize = 4096;
const INPUT_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Parser)]
#[command(name = "solconsole", version = mgmtutil::VERSION)]
#[command(about = "Serial-over-LAN console client")]
struct Args {
    /// SOL endpoint as HOST:PORT
    address: String,

    /// Escape character (followed by '.' at line start ends the session)
    #[arg(short = 'e', long = "escape")]
    escape: Option<char>,

    /// Keep the console in line mode
    #[arg(long = "no-raw")]
    no_raw: bool,

    /// Configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show extra debug messages
    #[arg(short = 'x')]
    debug: bool,
}

async fn copy_from_socket(stream: &TcpStream, buf: &mut [u8], stdout: &mut Stdout) -> Result<bool> {
    match stream.try_read(buf) {
        Ok(0) => Ok(false),
        Ok(n) => {
            stdout.write_all(&buf[..n]).await?;
            stdout.flush().await?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(true),
        Err(e) => Err(e).context("SOL socket read failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(escape) = args.escape {
        config.console.escape_char = escape;
    }
    if args.no_raw {
        config.console.raw_mode = false;
    }

    let mut stream = TcpStream::connect(&args.address)
        .await
        .with_context(|| format!("Cannot connect to {}", args.address))?;

    let mut console = SolConsole::start(&config.console)?;
    let line_end = if console.is_raw() { "\r\n" } else { "\n" };
    eprint!(
        "[SOL session connected to {}, use {}. to exit]{line_end}",
        args.address, config.console.escape_char
    );
    let mut stdout = tokio::io::stdout();
    let mut net_buf = vec![0u8; NET_BUFFER_SIZE];
    let mut input_buf = [0u8; INPUT_BUFFER_SIZE];

    let result: Result<()> = async {
        while !console.is_done() {
            let ready = console.select(&stream, Some(SELECT_TIMEOUT)).await?;

            if ready.socket && !copy_from_socket(&stream, &mut net_buf, &mut stdout).await? {
                log::info!("SOL connection closed by peer");
                eprint!("{line_end}[SOL connection closed by peer]{line_end}");
                break;
            }

            if ready.input {
                let n = console.read(&mut input_buf);
                if n > 0 {
                    stream.write_all(&input_buf[..n]).await?;
                }
            }
        }
        Ok(())
    }
    .await;

    // The listener join blocks for up to one poll interval.
    if tokio::task::spawn_blocking(move || console.shutdown())
        .await
        .is_err()
    {
        log::error!("Console shutdown task panicked");
    }
    eprintln!("[SOL session closed]");
    result
}
