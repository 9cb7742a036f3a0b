//! Transport sessions to network devices.
//!
//! A [`Session`] is one interactive login to one device, over SSH or Telnet.
//! Output capture is time based: write a command, wait a fixed
//! settle delay, then take whatever the device printed. There is no prompt
//! detection, so slow commands can be truncated; callers tune the delay.
//!
//! # Main Components
//!
//! - [`Session`] - connect / escalate / send / disconnect capability set
//! - [`SessionFactory`] - builds a session for a credential set
//! - [`TransportFactory`] - production factory choosing [`SshSession`] or [`TelnetSession`]
//! - [`ConnectionSecurityOptions`] - SSH algorithm and host key policy

use async_ssh2_tokio::ServerCheckMethod;
use async_trait::async_trait;
use log::{debug, info, warn};
use russh::Preferred;
use std::borrow::Cow;
use std::time::Duration;

use crate::config;
use crate::device::{ConnectionType, DeviceCredentials};
use crate::error::ExecError;

pub use security::{ConnectionSecurityOptions, SecurityLevel};
pub use ssh::SshSession;
pub use telnet::{TelnetFilter, TelnetSession};

/// An interactive login to a single device.
///
/// Implementations must tolerate `disconnect` on a session that never
/// connected or was already closed.
#[async_trait]
pub trait Session: Send {
    /// Opens the transport, authenticates and drains the login banner.
    async fn connect(&mut self) -> Result<(), ExecError>;

    /// Sends `enable` followed by the enable password. Best effort: callers
    /// treat failures as warnings.
    async fn escalate(&mut self, enable_password: &str) -> Result<(), ExecError>;

    /// Writes `command`, waits `settle_delay` and returns everything the
    /// device printed in the meantime, decoded lossily as UTF-8.
    async fn send_command(
        &mut self,
        command: &str,
        settle_delay: Duration,
    ) -> Result<String, ExecError>;

    /// Closes the transport.
    async fn disconnect(&mut self) -> Result<(), ExecError>;
}

/// Builds sessions for credential sets. The executor owns one of these.
pub trait SessionFactory: Send + Sync {
    fn create(&self, credentials: &DeviceCredentials) -> Box<dyn Session>;
}

/// Factory for real devices: SSH or Telnet depending on the credentials.
#[derive(Debug, Clone, Default)]
pub struct TransportFactory {
    security: ConnectionSecurityOptions,
}

impl TransportFactory {
    pub fn new(security: ConnectionSecurityOptions) -> Self {
        Self { security }
    }
}

impl SessionFactory for TransportFactory {
    fn create(&self, credentials: &DeviceCredentials) -> Box<dyn Session> {
        match credentials.connection_type() {
            ConnectionType::Ssh => Box::new(SshSession::new(
                credentials.clone(),
                self.security.clone(),
            )),
            ConnectionType::Telnet => Box::new(TelnetSession::new(credentials.clone())),
        }
    }
}

mod security;
mod ssh;
mod telnet;
