//! Host side of rcpdiag.
//!
//! A [`Client`] opens the RCP's diagnostic endpoint over a [`Link`], sends
//! one command, polls for the fixed-shape reply and closes the endpoint
//! again. Every wait is a fixed number of fixed-delay attempts
//! ([`RetryPolicy`]), so a command-line invocation always terminates.
//!
//! ```no_run
//! use rcpdiag::{Client, Command, RetryPolicy, SocketLink};
//!
//! let link = SocketLink::new("/tmp/rcpdiag.sock");
//! let mut client = Client::connect(link, RetryPolicy::default())?;
//! let reply = client.request(Command::FirmwareVersion)?;
//! println!("{reply}");
//! client.disconnect();
//! # Ok::<(), rcpdiag::Error>(())
//! ```

mod client;
mod config;
mod error;
mod link;

pub use client::Client;
pub use config::RetryPolicy;
pub use error::{Error, Result};
pub use link::{Link, SocketLink};
pub use rcpdiag_proto::{Command, EndpointState, Opcode, RadioStatus, Reply, Status};
