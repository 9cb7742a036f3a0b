//! # netops - Show-command execution on network devices
//!
//! `netops` logs into network devices over SSH or Telnet, runs a list of
//! show commands in an interactive shell and returns the raw output of each
//! one. Runs can target a single device or a batch, and every run is kept in
//! an in-memory store so it can be fetched or downloaded later through the
//! REST API.
//!
//! ## Features
//!
//! - **Two transports**: SSH (password auth, PTY shell) and Telnet (IAC negotiation handled inline)
//! - **Built-in command sets**: per device family, for Ciena, Brocade and Alcatel-Lucent gear
//! - **Privileged mode**: optional `enable` escalation before the first command
//! - **Batch runs**: bounded parallelism, one outcome per device, failures isolated
//! - **Legacy SSH support**: algorithm profiles down to DH group1 and CBC ciphers
//! - **REST API and SDK**: axum server plus a reqwest client for it
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netops::device::{DeviceCredentials, DeviceType};
//! use netops::executor::Executor;
//! use netops::session::TransportFactory;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = Executor::new(TransportFactory::default());
//!     let credentials =
//!         DeviceCredentials::new("192.168.1.1", "admin", "password", DeviceType::BrocadeIcx)
//!             .with_enable_password(Some("enable-secret".to_string()));
//!
//!     // `None` + `true`: run the built-in commands for the device type
//!     let results = executor.execute(&credentials, None, true).await?;
//!     for (command, output) in results.iter() {
//!         println!("{command}:\n{output}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`session::Session`] - One interactive login; [`session::TransportFactory`] picks SSH
//!   or Telnet
//! - [`executor::Executor`] - Single-device and batch execution
//! - [`catalog`] - Supported device types and their built-in command lists
//! - [`cache::ResultStore`] - Process-lifetime store of execution results
//! - [`api`] - axum router exposing all of the above
//! - [`client::NetOpsClient`] - HTTP SDK for the API
//! - [`error`] - Error types for execution and the SDK
//! - [`config`] - Timing constants, SSH algorithm sets and server settings

pub mod api;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod session;
