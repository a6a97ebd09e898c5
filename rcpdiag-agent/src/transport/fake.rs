//! Scripted transport for driving the agent in tests.
#![allow(clippy::missing_docs_in_private_items)]

use std::collections::VecDeque;

use rcpdiag_proto::{EndpointId, EndpointState};

use super::{Event, Notification, Transport};
use crate::TransportError;

/// Records every call and delivers events pushed by the test.
#[derive(Debug)]
pub(crate) struct FakeTransport {
    pub open: bool,
    pub state: EndpointState,
    pub registered: Vec<Notification>,
    pub events: VecDeque<Event>,
    pub written: Vec<Vec<u8>>,
    pub opens: usize,
    pub closes: usize,
    pub fail_open: bool,
    pub fail_register: Option<Notification>,
    pub fail_write: bool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            open: false,
            state: EndpointState::Freed,
            registered: Vec::new(),
            events: VecDeque::new(),
            written: Vec::new(),
            opens: 0,
            closes: 0,
            fail_open: false,
            fail_register: None,
            fail_write: false,
        }
    }

    /// An open, connected endpoint with every notification registered.
    pub fn connected() -> Self {
        let mut t = Self::new();
        t.open = true;
        t.state = EndpointState::Connected;
        t.registered = Notification::ALL.to_vec();
        t
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }
}

impl Transport for FakeTransport {
    fn open_endpoint(&mut self, _id: EndpointId, _flags: u8, window: u8) -> Result<(), TransportError> {
        assert_eq!(window, 1);
        self.opens += 1;
        if self.fail_open {
            return Err(TransportError::Rejected { op: "open" });
        }
        if self.open {
            return Err(TransportError::AlreadyExists);
        }
        self.open = true;
        self.state = EndpointState::Open;
        Ok(())
    }

    fn register(&mut self, notification: Notification) -> Result<(), TransportError> {
        if self.fail_register == Some(notification) {
            return Err(TransportError::Rejected { op: "register" });
        }
        self.registered.push(notification);
        Ok(())
    }

    fn write(&mut self, frame: &[u8], _flags: u8) -> Result<(), TransportError> {
        if self.fail_write {
            return Err(TransportError::NotConnected);
        }
        self.written.push(frame.to_vec());
        Ok(())
    }

    fn close_endpoint(&mut self) -> Result<(), TransportError> {
        self.closes += 1;
        self.open = false;
        self.registered.clear();
        self.state = EndpointState::Closing;
        Ok(())
    }

    fn endpoint_state(&self) -> EndpointState {
        self.state
    }

    fn poll_event(&mut self) -> Option<Event> {
        while let Some(event) = self.events.pop_front() {
            if self.registered.contains(&event.kind()) {
                return Some(event);
            }
        }
        None
    }
}
