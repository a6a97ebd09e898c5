//! RCP side of rcpdiag.
//!
//! An [`Agent`] owns the single diagnostic endpoint. It is driven by
//! repeated [`Agent::tick`] calls: each tick reconciles the endpoint
//! lifecycle (re-opening it after a disconnect) and then drains the
//! transport's notification queue, handing received frames to the
//! [`Dispatcher`].
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use rcpdiag_agent::{Agent, DeviceProfile, Dispatcher, SimulatedDevice, SocketTransport};
//!
//! # async fn example() -> rcpdiag_agent::Result<()> {
//! let profile = DeviceProfile::default();
//! let dispatcher = Dispatcher::new(SimulatedDevice::new(&profile), &profile);
//! let mut agent = Agent::new(SocketTransport::new("/tmp/rcpdiag.sock"), dispatcher);
//! rcpdiag_agent::serve(&mut agent, Duration::from_millis(10), std::future::pending()).await
//! # }
//! ```

mod capability;
mod config;
mod device;
mod dispatch;
mod endpoint;
mod error;
pub mod transport;

pub use capability::{Capabilities, TUNING_TOKEN_OFFSET};
pub use config::DeviceProfile;
pub use device::{SimulatedDevice, USER_DATA_SIZE};
pub use dispatch::Dispatcher;
pub use endpoint::{Agent, Lifecycle, serve};
pub use error::{Error, Result, TransportError};
pub use transport::{Event, Notification, SocketTransport, Transport};
