//! Endpoint lifecycle: open, monitor and recycle the single diagnostic
//! endpoint.
//!
//! ```text
//! Closed ──open ok──▶ Open ──connect──▶ Connected
//!    ▲                                     │ unreachable
//!    └──────── freed ──── Disconnected ◀───┘
//! ```

use std::future::Future;
use std::time::Duration;

use rcpdiag_proto::{EndpointId, EndpointState, Status, TX_WINDOW, USER_ENDPOINT};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{Capabilities, Dispatcher, Event, Notification, Result, Transport, TransportError};

/// Lifecycle state of the agent's endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Lifecycle {
    /// Not open; the next reconcile tries to open it.
    Closed,
    /// Open, waiting for the host to attach.
    Open,
    /// Host attached.
    Connected,
    /// Closed after the host vanished, waiting for the transport to free it.
    Disconnected,
}

/// Owns the transport, the dispatcher and the lifecycle state.
///
/// There is exactly one endpoint per agent, and the agent is the only owner
/// of its transport, so every state change happens on one task: inside
/// [`Agent::reconcile`] or while handling a drained [`Event`].
#[derive(Debug)]
pub struct Agent<T, C> {
    transport: T,
    dispatcher: Dispatcher<C>,
    /// The only endpoint this agent serves.
    endpoint: EndpointId,
    state: Lifecycle,
}

impl<T: Transport, C: Capabilities> Agent<T, C> {
    /// Creates a closed agent for [`USER_ENDPOINT`].
    pub const fn new(transport: T, dispatcher: Dispatcher<C>) -> Self {
        Self {
            transport,
            dispatcher,
            endpoint: USER_ENDPOINT,
            state: Lifecycle::Closed,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> Lifecycle {
        self.state
    }

    /// The command dispatcher.
    pub const fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// Moves the lifecycle forward. Safe to call as often as wanted.
    pub fn reconcile(&mut self) {
        if self.state == Lifecycle::Disconnected
            && self.transport.endpoint_state() == EndpointState::Freed
        {
            debug!(endpoint = %self.endpoint, "endpoint freed");
            self.set_state(Lifecycle::Closed);
        }
        if self.state == Lifecycle::Closed {
            debug!(endpoint = %self.endpoint, "endpoint closed, opening");
            match self.open() {
                Ok(()) => self.set_state(Lifecycle::Open),
                Err(e) => debug!(endpoint = %self.endpoint, "open failed, retrying: {e}"),
            }
        }
    }

    /// Opens the endpoint and registers for every notification.
    fn open(&mut self) -> std::result::Result<(), TransportError> {
        match self.transport.open_endpoint(self.endpoint, 0, TX_WINDOW) {
            Ok(()) | Err(TransportError::AlreadyExists) => {}
            Err(e) => return Err(e),
        }
        for notification in Notification::ALL {
            self.transport.register(notification)?;
        }
        Ok(())
    }

    /// Handles one transport notification.
    ///
    /// Only [`Error::ReplyPending`](crate::Error::ReplyPending) escapes;
    /// everything else is absorbed into the lifecycle.
    pub fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Connected(id) => self.on_connect(id),
            Event::Received(frame) => {
                self.dispatcher.dispatch(&frame, &mut self.transport)?;
            }
            Event::WriteCompleted(status) => self.on_write_completed(status),
            Event::Error(id) => self.on_error(id),
        }
        Ok(())
    }

    fn on_connect(&mut self, id: EndpointId) {
        if id != self.endpoint {
            debug!(%id, "connect for foreign endpoint ignored");
            return;
        }
        if self.state == Lifecycle::Open {
            self.set_state(Lifecycle::Connected);
        } else {
            warn!(%id, state = ?self.state, "unexpected connect");
        }
    }

    fn on_write_completed(&mut self, status: Status) {
        self.dispatcher.write_completed(status);
    }

    fn on_error(&mut self, id: EndpointId) {
        let state = self.transport.endpoint_state();
        if id != self.endpoint {
            debug!(%id, ?state, "error for foreign endpoint ignored");
            return;
        }
        if state != EndpointState::DestinationUnreachable {
            warn!(%id, ?state, "endpoint error ignored");
            return;
        }
        info!(%id, "host unreachable, closing endpoint");
        if let Err(e) = self.transport.close_endpoint() {
            error!(%id, "close after disconnect failed: {e}");
        }
        self.dispatcher.abandon();
        self.set_state(Lifecycle::Disconnected);
    }

    /// Reconciles, then handles every queued notification.
    pub fn tick(&mut self) -> Result<()> {
        self.reconcile();
        while let Some(event) = self.transport.poll_event() {
            self.handle(event)?;
        }
        Ok(())
    }

    fn set_state(&mut self, next: Lifecycle) {
        if self.state != next {
            info!(endpoint = %self.endpoint, from = ?self.state, to = ?next, "lifecycle");
            self.state = next;
        }
    }
}

/// Ticks `agent` every `poll` until `shutdown` resolves or a fatal error.
pub async fn serve<T, C>(
    agent: &mut Agent<T, C>,
    poll: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    T: Transport,
    C: Capabilities,
{
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("shutdown requested");
                return Ok(());
            }
            _ = ticker.tick() => agent.tick()?,
        }
    }
}

#[cfg(test)]
mod tests {
    use rcpdiag_proto::EndpointId;

    use super::*;
    use crate::transport::fake::FakeTransport;
    use crate::{DeviceProfile, Error, SimulatedDevice};

    fn agent(t: FakeTransport) -> Agent<FakeTransport, SimulatedDevice> {
        let profile = DeviceProfile::default();
        Agent::new(t, Dispatcher::new(SimulatedDevice::new(&profile), &profile))
    }

    fn connected() -> Agent<FakeTransport, SimulatedDevice> {
        let mut a = agent(FakeTransport::new());
        a.tick().unwrap();
        a.transport.push(Event::Connected(USER_ENDPOINT));
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Connected);
        a
    }

    #[test]
    fn closed_to_open_to_connected() {
        let mut a = agent(FakeTransport::new());
        assert_eq!(a.state(), Lifecycle::Closed);

        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Open);
        assert_eq!(a.transport.registered, Notification::ALL.to_vec());

        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Open);
        assert_eq!(a.transport.opens, 1);

        a.transport.push(Event::Connected(USER_ENDPOINT));
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Connected);
    }

    #[test]
    fn connect_for_other_endpoint_is_ignored() {
        let mut a = agent(FakeTransport::new());
        a.tick().unwrap();
        a.transport.push(Event::Connected(EndpointId(12)));
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Open);
    }

    #[test]
    fn connect_never_skips_open() {
        let mut a = agent(FakeTransport::new());
        a.transport.fail_open = true;
        a.handle(Event::Connected(USER_ENDPOINT)).unwrap();
        assert_eq!(a.state(), Lifecycle::Closed);
    }

    #[test]
    fn failed_open_stays_closed_and_retries() {
        let mut a = agent(FakeTransport::new());
        a.transport.fail_open = true;
        a.tick().unwrap();
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Closed);
        assert_eq!(a.transport.opens, 2);

        a.transport.fail_open = false;
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Open);
    }

    #[test]
    fn failed_registration_stays_closed() {
        let mut a = agent(FakeTransport::new());
        a.transport.fail_register = Some(Notification::Connect);
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Closed);

        // The endpoint already exists now; re-open counts as success.
        a.transport.fail_register = None;
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Open);
    }

    #[test]
    fn unreachable_recycles_endpoint() {
        let mut a = connected();
        a.transport.state = EndpointState::DestinationUnreachable;
        a.transport.push(Event::Error(USER_ENDPOINT));
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Disconnected);
        assert_eq!(a.transport.closes, 1);

        // Still closing: stay disconnected.
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Disconnected);

        a.transport.state = EndpointState::Freed;
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Open);
        assert_eq!(a.transport.opens, 2);

        a.transport.push(Event::Connected(USER_ENDPOINT));
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Connected);
    }

    #[test]
    fn other_errors_leave_state_alone() {
        let mut a = connected();
        a.transport.state = EndpointState::Faulted;
        a.transport.push(Event::Error(USER_ENDPOINT));
        a.tick().unwrap();
        assert_eq!(a.state(), Lifecycle::Connected);
        assert_eq!(a.transport.closes, 0);
    }

    #[test]
    fn received_frame_is_answered() {
        let mut a = connected();
        a.transport.push(Event::Received(vec![0x03]));
        a.tick().unwrap();
        assert_eq!(a.transport.written, vec![vec![0xff, 0xff]]);
        assert!(a.dispatcher().pending().is_some());

        a.transport.push(Event::WriteCompleted(Status::OK));
        a.tick().unwrap();
        assert!(a.dispatcher().pending().is_none());
    }

    #[test]
    fn overlapping_commands_are_fatal() {
        let mut a = connected();
        a.transport.push(Event::Received(vec![0x01]));
        a.transport.push(Event::Received(vec![0x02]));
        assert!(matches!(a.tick(), Err(Error::ReplyPending(_))));
        assert_eq!(a.transport.written.len(), 1);
    }

    #[test]
    fn disconnect_abandons_outstanding_reply() {
        let mut a = connected();
        a.transport.push(Event::Received(vec![0x01]));
        a.tick().unwrap();
        a.transport.state = EndpointState::DestinationUnreachable;
        a.transport.push(Event::Error(USER_ENDPOINT));
        a.tick().unwrap();
        assert!(a.dispatcher().pending().is_none());
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let mut a = agent(FakeTransport::new());
        serve(
            &mut a,
            Duration::from_millis(1),
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap();
        assert_eq!(a.state(), Lifecycle::Open);
    }

    #[tokio::test]
    async fn serve_surfaces_fatal_errors() {
        let mut a = connected();
        a.transport.push(Event::Received(vec![0x01]));
        a.transport.push(Event::Received(vec![0x01]));
        let res = serve(&mut a, Duration::from_millis(1), std::future::pending()).await;
        assert!(matches!(res, Err(Error::ReplyPending(_))));
    }
}
