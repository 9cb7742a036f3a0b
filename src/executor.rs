//! Runs command lists against devices.
//!
//! [`Executor::execute`] is the single-device sequence: resolve commands,
//! connect, optionally escalate, send each command, disconnect. The session is
//! disconnected exactly once on every path out of that sequence.
//! [`Executor::execute_batch`] fans a command set out over several devices
//! and turns each device's failure into a `failed` outcome.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::catalog;
use crate::config;
use crate::device::DeviceCredentials;
use crate::error::ExecError;
use crate::outcome::{BatchOutcome, ExecutionResult};
use crate::session::{Session, SessionFactory};

/// One device of a batch request.
///
/// `credentials` is an error when the device entry itself was invalid; such
/// entries are reported as failed without touching the network.
#[derive(Debug)]
pub struct BatchJob {
    pub device_name: String,
    pub ip_address: String,
    pub credentials: Result<DeviceCredentials, ExecError>,
}

/// Executes command lists through sessions built by a [`SessionFactory`].
#[derive(Clone)]
pub struct Executor {
    factory: Arc<dyn SessionFactory>,
    settle_delay: Duration,
    batch_parallel: usize,
}

impl Executor {
    pub fn new<F: SessionFactory + 'static>(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            settle_delay: config::DEFAULT_SETTLE_DELAY,
            batch_parallel: config::DEFAULT_BATCH_PARALLEL,
        }
    }

    /// Wait between writing a command and reading its output.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Maximum devices handled at once by [`Executor::execute_batch`].
    pub fn with_batch_parallel(mut self, parallel: usize) -> Self {
        self.batch_parallel = parallel.max(1);
        self
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn batch_parallel(&self) -> usize {
        self.batch_parallel
    }

    /// Connects to the device described by `credentials` and runs the commands.
    ///
    /// An explicit non-empty `commands` list wins; otherwise `use_defaults`
    /// selects the catalog commands for the device type. Resolving to an
    /// empty list is a validation error and no connection is attempted.
    /// Any connect or send failure is returned after the session has been
    /// disconnected; output gathered before the failure is dropped.
    pub async fn execute(
        &self,
        credentials: &DeviceCredentials,
        commands: Option<Vec<String>>,
        use_defaults: bool,
    ) -> Result<ExecutionResult, ExecError> {
        let commands = resolve_commands(credentials, commands, use_defaults)?;

        let mut session = self.factory.create(credentials);
        let result = self.run(session.as_mut(), credentials, &commands).await;

        if let Err(e) = session.disconnect().await {
            warn!("Error disconnecting from {}: {}", credentials.target(), e);
        }

        if let Err(e) = &result {
            error!("Execution on {} failed: {}", credentials.target(), e);
        }
        result
    }

    async fn run(
        &self,
        session: &mut dyn Session,
        credentials: &DeviceCredentials,
        commands: &[String],
    ) -> Result<ExecutionResult, ExecError> {
        session.connect().await?;

        if let Some(enable_password) = credentials.enable_password() {
            info!("Entering privileged mode on {}", credentials.target());
            match session.escalate(enable_password).await {
                Ok(()) => info!("Privileged mode requested on {}", credentials.target()),
                Err(e) => warn!(
                    "Failed to enter enable mode on {}: {}",
                    credentials.target(),
                    e
                ),
            }
        }

        let mut results = ExecutionResult::new();
        for command in commands {
            info!("Executing command on {}: {}", credentials.target(), command);
            let output = session.send_command(command, self.settle_delay).await?;
            results.insert(command.clone(), output);
        }
        Ok(results)
    }

    /// Runs the same command selection on every job.
    ///
    /// Outcomes come back in job order. Up to `batch_parallel` devices are
    /// worked on at once; a failure on one device never stops the others.
    pub async fn execute_batch(
        &self,
        jobs: Vec<BatchJob>,
        commands: Option<Vec<String>>,
        use_defaults: bool,
    ) -> Vec<BatchOutcome> {
        let mut outcomes: Vec<BatchOutcome> = jobs
            .iter()
            .map(|job| {
                BatchOutcome::failed(&job.device_name, &job.ip_address, "device task aborted")
            })
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.batch_parallel));
        let mut join_set = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let credentials = match job.credentials {
                Ok(credentials) => credentials,
                Err(e) => {
                    warn!("Skipping batch device {}: {}", job.device_name, e);
                    outcomes[index] =
                        BatchOutcome::failed(job.device_name, job.ip_address, e.to_string());
                    continue;
                }
            };

            let executor = self.clone();
            let sem = semaphore.clone();
            let commands = commands.clone();
            let device_name = job.device_name;
            join_set.spawn(async move {
                let outcome = match sem.acquire_owned().await {
                    Ok(_permit) => {
                        match executor.execute(&credentials, commands, use_defaults).await {
                            Ok(results) => BatchOutcome::success(
                                device_name,
                                credentials.ip_address(),
                                results,
                            ),
                            Err(e) => BatchOutcome::failed(
                                device_name,
                                credentials.ip_address(),
                                e.to_string(),
                            ),
                        }
                    }
                    Err(_) => BatchOutcome::failed(
                        device_name,
                        credentials.ip_address(),
                        "batch semaphore closed",
                    ),
                };
                (index, outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = outcome,
                Err(e) => error!("batch device task join error: {e}"),
            }
        }

        outcomes
    }
}

/// Picks the command list for a run; an empty result is a validation error.
pub fn resolve_commands(
    credentials: &DeviceCredentials,
    commands: Option<Vec<String>>,
    use_defaults: bool,
) -> Result<Vec<String>, ExecError> {
    let commands = match commands.filter(|c| !c.is_empty()) {
        Some(explicit) => explicit,
        None if use_defaults => catalog::default_commands(credentials.device_type()),
        None => Vec::new(),
    };
    if commands.is_empty() {
        return Err(ExecError::validation("No commands specified"));
    }
    Ok(commands)
}
