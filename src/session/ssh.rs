use super::*;

use async_ssh2_tokio::Config;
use async_ssh2_tokio::client::{AuthMethod, Client};
use russh::ChannelMsg;
use russh::client::Msg;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TryRecvError};
use tokio::task::JoinHandle;

/// Interactive shell over SSH with password authentication.
pub struct SshSession {
    credentials: DeviceCredentials,
    security: ConnectionSecurityOptions,
    client: Option<Client>,
    sender: Option<Sender<Vec<u8>>>,
    recv: Option<Receiver<Vec<u8>>>,
    io_task: Option<JoinHandle<()>>,
}

impl SshSession {
    pub fn new(credentials: DeviceCredentials, security: ConnectionSecurityOptions) -> Self {
        Self {
            credentials,
            security,
            client: None,
            sender: None,
            recv: None,
            io_task: None,
        }
    }

    /// TCP connect, authentication, PTY and shell request.
    async fn open(&self) -> Result<(Client, russh::Channel<Msg>), ExecError> {
        let device_addr = self.credentials.target();

        let config = Config {
            preferred: self.security.preferred(),
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let client = Client::connect_with_config(
            (self.credentials.ip_address().to_string(), self.credentials.port()),
            self.credentials.username(),
            AuthMethod::with_password(self.credentials.password()),
            self.security.server_check.clone(),
            config,
        )
        .await?;
        debug!("{} SSH authentication successful", device_addr);

        let channel = client.get_channel().await?;
        channel
            .request_pty(false, "vt100", 511, 24, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        debug!("{} Shell request successful", device_addr);

        Ok((client, channel))
    }

    /// Pulls everything currently buffered, polling until a poll comes back empty.
    async fn drain(&mut self) -> Result<String, ExecError> {
        let recv = self.recv.as_mut().ok_or(ExecError::NotConnected)?;
        let mut bytes = Vec::new();
        loop {
            let mut received = false;
            let mut closed = false;
            loop {
                match recv.try_recv() {
                    Ok(chunk) => {
                        bytes.extend_from_slice(&chunk);
                        received = true;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                }
            }
            if !received || closed {
                break;
            }
            tokio::time::sleep(config::DRAIN_POLL_INTERVAL).await;
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn write_line(&self, line: &str) -> Result<(), ExecError> {
        let sender = self.sender.as_ref().ok_or(ExecError::NotConnected)?;
        sender
            .send(format!("{line}\n").into_bytes())
            .await
            .map_err(|_| ExecError::ChannelClosed)
    }
}

/// Shuttles bytes between the shell channel and the session until either side closes.
async fn pump(
    mut channel: russh::Channel<Msg>,
    mut from_session: Receiver<Vec<u8>>,
    to_session: Sender<Vec<u8>>,
    device_addr: String,
) {
    loop {
        tokio::select! {
            outbound = from_session.recv() => match outbound {
                Some(data) => {
                    if let Err(e) = channel.data(&data[..]).await {
                        debug!("{} Failed to send data to shell: {:?}", device_addr, e);
                        break;
                    }
                }
                None => {
                    let _ = channel.eof().await;
                    let _ = channel.close().await;
                    break;
                }
            },
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { ref data })
                | Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    if to_session.send(data.to_vec()).await.is_err() {
                        debug!(
                            "{} Shell output receiver dropped. Closing task.",
                            device_addr
                        );
                        break;
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    debug!("{} Shell exited with status code: {}", device_addr, exit_status);
                    break;
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    debug!("{} Shell channel closed.", device_addr);
                    break;
                }
                Some(_) => {}
            }
        }
    }
    debug!("{} SSH I/O task ended.", device_addr);
}

#[async_trait]
impl Session for SshSession {
    async fn connect(&mut self) -> Result<(), ExecError> {
        let device_addr = self.credentials.target();
        info!("Connecting via SSH to {}", device_addr);
        if !self.security.verifies_host_keys() {
            warn!(
                "{} host key verification is disabled, accepting any host key",
                device_addr
            );
        }

        let secs = self.credentials.timeout_secs();
        let (client, channel) = tokio::time::timeout(Duration::from_secs(secs), self.open())
            .await
            .map_err(|_| ExecError::Timeout {
                addr: device_addr.clone(),
                secs,
            })??;

        let (sender_to_shell, receiver_from_session) = mpsc::channel::<Vec<u8>>(256);
        let (sender_to_session, receiver_from_shell) = mpsc::channel::<Vec<u8>>(1024);
        self.io_task = Some(tokio::spawn(pump(
            channel,
            receiver_from_session,
            sender_to_session,
            device_addr.clone(),
        )));
        self.client = Some(client);
        self.sender = Some(sender_to_shell);
        self.recv = Some(receiver_from_shell);

        tokio::time::sleep(config::SSH_BANNER_DELAY).await;
        let banner = self.drain().await?;
        debug!("{} Initial output: {:?}", device_addr, banner);

        info!("SSH connection established to {}", device_addr);
        Ok(())
    }

    async fn escalate(&mut self, enable_password: &str) -> Result<(), ExecError> {
        self.write_line("enable").await?;
        tokio::time::sleep(config::ENABLE_STEP_DELAY).await;
        let prompt = self.drain().await?;
        debug!("{} enable prompt: {:?}", self.credentials.target(), prompt);

        self.write_line(enable_password).await?;
        tokio::time::sleep(config::ENABLE_STEP_DELAY).await;
        self.drain().await?;
        Ok(())
    }

    async fn send_command(
        &mut self,
        command: &str,
        settle_delay: Duration,
    ) -> Result<String, ExecError> {
        self.write_line(command).await?;
        tokio::time::sleep(settle_delay).await;
        self.drain().await
    }

    async fn disconnect(&mut self) -> Result<(), ExecError> {
        // Dropping the sender makes the pump send EOF and close the channel.
        self.sender.take();
        if let Some(task) = self.io_task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(Duration::from_secs(2), task).await.is_err() {
                debug!("{} SSH I/O task did not stop, aborting", self.credentials.target());
                abort.abort();
            }
        }
        self.recv.take();

        if let Some(client) = self.client.take() {
            if !client.is_closed() {
                client.disconnect().await?;
            }
            info!("SSH connection to {} closed", self.credentials.target());
        }
        Ok(())
    }
}
