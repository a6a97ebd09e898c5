//! Host connection manager: connect, send, receive with retry, disconnect.

use std::io;

use rcpdiag_proto::{Command, EndpointId, EndpointState, MAX_FRAME, Reply, TX_WINDOW, USER_ENDPOINT};
use tracing::{debug, info, trace, warn};

use crate::{Error, Link, Result, RetryPolicy};

/// An open diagnostic endpoint on the RCP.
///
/// One command is in flight at a time: [`Client::exchange`] sends a frame
/// and waits for its reply before returning.
#[derive(Debug)]
pub struct Client<L> {
    link: L,
    policy: RetryPolicy,
    /// The endpoint opened on the link.
    endpoint: EndpointId,
}

impl<L: Link> Client<L> {
    /// Initializes `link` (retrying per `policy`) and opens the endpoint.
    ///
    /// Only initialization is retried; an open failure after a successful
    /// init is returned at once.
    pub fn connect(mut link: L, policy: RetryPolicy) -> Result<Self> {
        let mut last = None;
        let (ready, attempts) = policy.run(|attempt| match link.init() {
            Ok(()) => Some(()),
            Err(e) => {
                debug!(attempt, "link init failed: {e}");
                last = Some(e);
                None
            }
        });
        if ready.is_none() {
            return Err(Error::Init {
                attempts,
                source: last.unwrap_or_else(|| io::ErrorKind::TimedOut.into()),
            });
        }

        link.open_endpoint(USER_ENDPOINT, TX_WINDOW)
            .map_err(Error::Open)?;
        info!(endpoint = %USER_ENDPOINT, attempts, "endpoint open");
        Ok(Self {
            link,
            policy,
            endpoint: USER_ENDPOINT,
        })
    }

    /// The underlying link.
    pub const fn link(&self) -> &L {
        &self.link
    }

    /// Writes one encoded command. Acknowledgement is the reply itself.
    pub fn send(&mut self, command: Command) -> Result<()> {
        let frame = command.encode();
        debug!(?command, ?frame, "sending command");
        self.link.write(&frame).map_err(Error::Write)
    }

    /// Polls for the next reply frame until one arrives or the retry budget
    /// is spent.
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_FRAME];
        let mut last = None;
        let (len, attempts) = self.policy.run(|attempt| {
            match self.link.read_nonblocking(&mut buf) {
                Ok(n) if n > 0 => return Some(n),
                Ok(_) => last = Some(io::ErrorKind::UnexpectedEof.into()),
                Err(e) => last = Some(e),
            }
            trace!(attempt, "no reply yet");
            None
        });
        match len {
            Some(n) => {
                buf.truncate(n);
                debug!(attempts, reply = ?buf, "reply received");
                Ok(buf)
            }
            None => Err(Error::ReplyTimeout {
                attempts,
                last: last.unwrap_or_else(|| io::ErrorKind::WouldBlock.into()),
            }),
        }
    }

    /// Sends `command` and returns the raw reply bytes.
    pub fn exchange(&mut self, command: Command) -> Result<Vec<u8>> {
        self.send(command)?;
        self.receive()
    }

    /// Sends `command` and decodes its reply.
    pub fn request(&mut self, command: Command) -> Result<Reply> {
        let raw = self.exchange(command)?;
        Ok(Reply::decode(command.opcode(), &raw)?)
    }

    /// Closes the endpoint and waits for the link to confirm it.
    ///
    /// Failures are logged, not returned: the caller is exiting either way.
    /// Returns whether the close was confirmed within the retry budget.
    pub fn disconnect(mut self) -> bool {
        debug!(endpoint = %self.endpoint, "closing endpoint");
        if let Err(e) = self.link.close_endpoint() {
            warn!(endpoint = %self.endpoint, "close endpoint failed: {e}");
        }
        let endpoint = self.endpoint;
        let link = &mut self.link;
        let (closed, attempts) = self.policy.run(|_| {
            match link.endpoint_state(endpoint) {
                Ok(EndpointState::Closed | EndpointState::Freed) => Some(()),
                Ok(state) => {
                    trace!(?state, "waiting for close");
                    None
                }
                Err(e) => {
                    trace!("endpoint state query failed: {e}");
                    None
                }
            }
        });
        if closed.is_some() {
            debug!(attempts, "endpoint closed");
            true
        } else {
            warn!(endpoint = %endpoint, attempts, "endpoint close not confirmed");
            false
        }
    }
}
