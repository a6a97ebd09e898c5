//! CLI for rcpdiag: issue one diagnostic command to the RCP and print the
//! reply.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items,
    clippy::struct_excessive_bools
)]

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use rcpdiag::{Client, Command, Error, Reply, RetryPolicy, SocketLink};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rcpdiag",
    version,
    about = "Manufacturing diagnostics for an RCP over its diagnostic endpoint"
)]
#[command(group(ArgGroup::new("command").required(true).multiple(false)))]
struct Cli {
    /// Return the 32-bit customer version compiled into the RCP firmware.
    #[arg(long, group = "command", alias = "cust_version")]
    cust_version: bool,

    /// Return the secure element version of the RCP.
    #[arg(long, group = "command", alias = "se_version")]
    se_version: bool,

    /// Read the CTUNE manufacturing token (0xffff when not programmed).
    #[arg(long, group = "command", alias = "get_ctune_token")]
    get_ctune_token: bool,

    /// Write the CTUNE manufacturing token. Fails unless the token is blank.
    #[arg(long, group = "command", alias = "set_ctune_token", value_name = "VALUE", value_parser = parse_u16)]
    set_ctune_token: Option<u16>,

    /// Read the CTUNE register value currently used by the radio.
    #[arg(long, group = "command", alias = "get_ctune_value")]
    get_ctune_value: bool,

    /// Set the CTUNE register value. The radio must be idle.
    #[arg(long, group = "command", alias = "set_ctune_value", value_name = "VALUE", value_parser = parse_u16)]
    set_ctune_value: Option<u16>,

    /// Start a CW tone on the RCP's configured 802.15.4 channel.
    #[arg(long, group = "command", alias = "tone_start")]
    tone_start: bool,

    /// Stop the CW tone.
    #[arg(long, group = "command", alias = "tone_stop")]
    tone_stop: bool,

    /// Write VALUE to the RCP's diagnostic GPIO (1 = LED on, 0 = off).
    #[arg(long, group = "command", alias = "gpio_write", value_name = "VALUE", value_parser = parse_u8)]
    gpio_write: Option<u8>,

    /// Erase the user data page holding the manufacturing tokens.
    ///
    /// Everything else stored in that page is erased too.
    #[arg(long, group = "command", alias = "erase_userdata_page")]
    erase_userdata_page: bool,

    /// Agent socket path.
    #[arg(short, long, default_value = "/tmp/rcpdiag.sock")]
    socket: PathBuf,

    /// Attempts for connect, reply and close waits.
    #[arg(long, default_value_t = 5)]
    retries: u32,

    /// Pause between attempts, in milliseconds.
    #[arg(long, default_value_t = 100)]
    retry_delay_ms: u64,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let default = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cli.run() {
        eprintln!("rcpdiag: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    /// The single command selected on the command line.
    fn selected(&self) -> Command {
        if self.cust_version {
            Command::FirmwareVersion
        } else if self.se_version {
            Command::SeVersion
        } else if self.get_ctune_token {
            Command::GetTuningToken
        } else if let Some(v) = self.set_ctune_token {
            Command::SetTuningToken(v)
        } else if self.get_ctune_value {
            Command::GetTuningValue
        } else if let Some(v) = self.set_ctune_value {
            Command::SetTuningValue(v)
        } else if self.tone_start {
            Command::ToneStart
        } else if self.tone_stop {
            Command::ToneStop
        } else if let Some(v) = self.gpio_write {
            Command::GpioWrite(v)
        } else {
            Command::EraseUserData
        }
    }

    const fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_delay_ms))
    }

    /// Connects, runs the command and disconnects.
    ///
    /// Only a failed connect is an error; a missing reply is reported and
    /// the close still happens.
    fn run(&self) -> Result<()> {
        let command = self.selected();
        let mut client = Client::connect(SocketLink::new(&self.socket), self.policy())
            .with_context(|| format!("connecting to {}", self.socket.display()))?;

        let opcode = u8::from(command.opcode());
        match client.exchange(command) {
            Ok(raw) => {
                println!("{}", format_reply(opcode, &raw));
                match Reply::decode(command.opcode(), &raw) {
                    Ok(reply) => println!("{reply}"),
                    Err(e) => warn!("{e}"),
                }
            }
            Err(Error::ReplyTimeout { attempts, last }) => {
                println!("Reply to command 0x{opcode:x}: read timeout after {attempts} attempts ({last})");
            }
            Err(e) => eprintln!("rcpdiag: {e}"),
        }

        client.disconnect();
        Ok(())
    }
}

/// Formats raw reply bytes as `Reply to command 0x.., len=N: 0x.. 0x..`.
fn format_reply(opcode: u8, raw: &[u8]) -> String {
    let mut out = format!("Reply to command 0x{opcode:x}, len={}:", raw.len());
    for b in raw {
        let _ = write!(out, " 0x{b:02x}");
    }
    out
}

/// Parses an unsigned integer in decimal or `0x` hex.
fn parse_unsigned(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let v = parse_unsigned(s)?;
    u16::try_from(v).map_err(|_| format!("{s} does not fit in 16 bits"))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let v = parse_unsigned(s)?;
    u8::try_from(v).map_err(|_| format!("{s} does not fit in 8 bits"))
}
