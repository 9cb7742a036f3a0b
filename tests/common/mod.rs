#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netops::api::AppState;
use netops::device::DeviceCredentials;
use netops::error::ExecError;
use netops::executor::Executor;
use netops::session::{Session, SessionFactory};

/// Counters shared by every session a [`ScriptedFactory`] hands out.
#[derive(Debug, Default)]
pub struct Counters {
    pub created: AtomicUsize,
    pub disconnected: AtomicUsize,
}

impl Counters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disconnected(&self) -> usize {
        self.disconnected.load(Ordering::SeqCst)
    }
}

/// Device stand-in: answers every command with `<command> output`, unless
/// its address is listed as rejecting the login.
pub struct ScriptedSession {
    ip_address: String,
    reject_login: bool,
    counters: Arc<Counters>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn connect(&mut self) -> Result<(), ExecError> {
        if self.reject_login {
            return Err(ExecError::Connection(format!(
                "authentication failed for {}",
                self.ip_address
            )));
        }
        Ok(())
    }

    async fn escalate(&mut self, _enable_password: &str) -> Result<(), ExecError> {
        Ok(())
    }

    async fn send_command(&mut self, command: &str, _: Duration) -> Result<String, ExecError> {
        Ok(format!("{command} output"))
    }

    async fn disconnect(&mut self) -> Result<(), ExecError> {
        self.counters.disconnected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedFactory {
    rejecting: HashSet<String>,
    counters: Arc<Counters>,
}

impl ScriptedFactory {
    pub fn rejecting(ips: &[&str]) -> Self {
        Self {
            rejecting: ips.iter().map(|ip| ip.to_string()).collect(),
            counters: Arc::default(),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(&self, credentials: &DeviceCredentials) -> Box<dyn Session> {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedSession {
            ip_address: credentials.ip_address().to_string(),
            reject_login: self.rejecting.contains(credentials.ip_address()),
            counters: self.counters.clone(),
        })
    }
}

/// App state over scripted devices; logins to `rejecting` addresses fail.
pub fn app_state(rejecting: &[&str]) -> (AppState, Arc<Counters>) {
    let factory = ScriptedFactory::rejecting(rejecting);
    let counters = factory.counters();
    let executor = Executor::new(factory).with_settle_delay(Duration::ZERO);
    (AppState::new(executor), counters)
}
