use super::*;

use std::io::ErrorKind;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;
const NUL: u8 = 0;
const XON: u8 = 0x11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FilterState {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Strips Telnet command sequences from the inbound stream.
///
/// Every option the peer offers or requests is refused, so the session stays
/// in plain NVT mode. Refusals are collected into `replies` for the caller to
/// write back.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: FilterState,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw socket bytes; payload goes to `data`, option refusals to `replies`.
    pub fn feed(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                FilterState::Data => match byte {
                    IAC => FilterState::Iac,
                    NUL | XON => FilterState::Data,
                    _ => {
                        data.push(byte);
                        FilterState::Data
                    }
                },
                FilterState::Iac => match byte {
                    IAC => {
                        data.push(IAC);
                        FilterState::Data
                    }
                    DO | DONT | WILL | WONT => FilterState::Negotiate(byte),
                    SB => FilterState::Subnegotiation,
                    _ => FilterState::Data,
                },
                FilterState::Negotiate(verb) => {
                    match verb {
                        DO => replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    FilterState::Data
                }
                FilterState::Subnegotiation => match byte {
                    IAC => FilterState::SubnegotiationIac,
                    _ => FilterState::Subnegotiation,
                },
                FilterState::SubnegotiationIac => match byte {
                    SE => FilterState::Data,
                    _ => FilterState::Subnegotiation,
                },
            };
        }
    }
}

/// Doubles any literal 0xFF so it is not read as a command byte.
fn escape_iac(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    for &byte in payload {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Line-mode Telnet session with `login:` / `Password:` authentication.
pub struct TelnetSession {
    credentials: DeviceCredentials,
    stream: Option<TcpStream>,
    filter: TelnetFilter,
}

impl TelnetSession {
    pub fn new(credentials: DeviceCredentials) -> Self {
        Self {
            credentials,
            stream: None,
            filter: TelnetFilter::new(),
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), ExecError> {
        let stream = self.stream.as_mut().ok_or(ExecError::NotConnected)?;
        let payload = escape_iac(format!("{line}\n").as_bytes());
        stream.write_all(&payload).await?;
        Ok(())
    }

    /// Blocks for the next chunk of payload. `None` means the peer closed.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, ExecError> {
        let Self { stream, filter, .. } = self;
        let stream = stream.as_mut().ok_or(ExecError::NotConnected)?;
        let mut buf = vec![0u8; config::READ_CHUNK_SIZE];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            let mut data = Vec::new();
            let mut replies = Vec::new();
            filter.feed(&buf[..n], &mut data, &mut replies);
            if !replies.is_empty() {
                stream.write_all(&replies).await?;
            }
            if !data.is_empty() {
                return Ok(Some(data));
            }
        }
    }

    /// Reads until `pattern` shows up or `deadline` passes.
    ///
    /// Returns whether the pattern was seen. The peer closing the connection
    /// is an error.
    async fn read_until(&mut self, pattern: &[u8], deadline: Instant) -> Result<bool, ExecError> {
        let mut seen = Vec::new();
        loop {
            if contains(&seen, pattern) {
                return Ok(true);
            }
            match tokio::time::timeout_at(deadline, self.read_chunk()).await {
                Err(_) => return Ok(false),
                Ok(Ok(Some(chunk))) => seen.extend_from_slice(&chunk),
                Ok(Ok(None)) => {
                    return Err(ExecError::Connection(format!(
                        "{} closed the connection",
                        self.credentials.target()
                    )));
                }
                Ok(Err(err)) => return Err(err),
            }
        }
    }

    /// Takes whatever is already buffered without blocking, polling until quiet.
    async fn drain(&mut self) -> Result<String, ExecError> {
        let Self { stream, filter, .. } = self;
        let stream = stream.as_mut().ok_or(ExecError::NotConnected)?;
        let mut buf = vec![0u8; config::READ_CHUNK_SIZE];
        let mut data = Vec::new();
        loop {
            let mut received = false;
            let mut closed = false;
            loop {
                match stream.try_read(&mut buf) {
                    Ok(0) => {
                        closed = true;
                        break;
                    }
                    Ok(n) => {
                        let mut replies = Vec::new();
                        filter.feed(&buf[..n], &mut data, &mut replies);
                        if !replies.is_empty() {
                            stream.write_all(&replies).await?;
                        }
                        received = true;
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => return Err(e.into()),
                }
            }
            if !received || closed {
                break;
            }
            tokio::time::sleep(config::DRAIN_POLL_INTERVAL).await;
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Answers the login and password prompts.
    ///
    /// Each prompt wait ends at `connect_deadline` at the latest. A prompt
    /// that never shows up is tolerated and the credential is sent anyway.
    async fn login(&mut self, connect_deadline: Instant) -> Result<(), ExecError> {
        let device_addr = self.credentials.target();
        let prompt_deadline =
            || connect_deadline.min(Instant::now() + config::LOGIN_PROMPT_TIMEOUT);

        if !self.read_until(b"login:", prompt_deadline()).await? {
            debug!("{} no login prompt seen, sending username anyway", device_addr);
        }
        let username = self.credentials.username().to_string();
        self.write_line(&username).await?;

        if !self.read_until(b"Password:", prompt_deadline()).await? {
            debug!("{} no password prompt seen, sending password anyway", device_addr);
        }
        let password = self.credentials.password().to_string();
        self.write_line(&password).await
    }
}

#[async_trait]
impl Session for TelnetSession {
    async fn connect(&mut self) -> Result<(), ExecError> {
        let device_addr = self.credentials.target();
        info!("Connecting via Telnet to {}", device_addr);

        let secs = self.credentials.timeout_secs();
        let timeout_err = || ExecError::Timeout {
            addr: device_addr.clone(),
            secs,
        };
        let deadline = Instant::now() + Duration::from_secs(secs);

        let stream = tokio::time::timeout_at(
            deadline,
            TcpStream::connect((self.credentials.ip_address(), self.credentials.port())),
        )
        .await
        .map_err(|_| timeout_err())?
        .map_err(|e| ExecError::Connection(format!("{device_addr}: {e}")))?;
        self.stream = Some(stream);

        self.login(deadline).await?;
        tokio::time::sleep(config::TELNET_BANNER_DELAY).await;
        let banner = self.drain().await?;
        debug!("{} Initial output: {:?}", device_addr, banner);

        info!("Telnet connection established to {}", device_addr);
        Ok(())
    }

    async fn escalate(&mut self, enable_password: &str) -> Result<(), ExecError> {
        self.write_line("enable").await?;
        tokio::time::sleep(config::ENABLE_STEP_DELAY).await;
        let prompt_deadline = Instant::now() + config::ENABLE_PROMPT_TIMEOUT;
        if !self.read_until(b"Password:", prompt_deadline).await? {
            debug!("{} no enable password prompt seen", self.credentials.target());
        }

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
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("{} shutdown error: {}", self.credentials.target(), e);
            }
            info!("Telnet connection to {} closed", self.credentials.target());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceType;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn filter(input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut f = TelnetFilter::new();
        let mut data = Vec::new();
        let mut replies = Vec::new();
        f.feed(input, &mut data, &mut replies);
        (data, replies)
    }

    #[test]
    fn plain_text_passes_through() {
        let (data, replies) = filter(b"router> ");
        assert_eq!(data, b"router> ");
        assert!(replies.is_empty());
    }

    #[test]
    fn do_and_will_are_refused() {
        let (data, replies) = filter(&[IAC, DO, 24, b'o', b'k', IAC, WILL, 1]);
        assert_eq!(data, b"ok");
        assert_eq!(replies, vec![IAC, WONT, 24, IAC, DONT, 1]);
    }

    #[test]
    fn dont_and_wont_need_no_reply() {
        let (data, replies) = filter(&[IAC, DONT, 3, IAC, WONT, 5, b'x']);
        assert_eq!(data, b"x");
        assert!(replies.is_empty());
    }

    #[test]
    fn subnegotiation_is_dropped() {
        let (data, _) = filter(&[b'a', IAC, SB, 24, 1, IAC, SE, b'b']);
        assert_eq!(data, b"ab");
    }

    #[test]
    fn escaped_iac_is_literal_and_nul_is_dropped() {
        let (data, _) = filter(&[b'a', IAC, IAC, b'\r', NUL, b'\n']);
        assert_eq!(data, vec![b'a', IAC, b'\r', b'\n']);
    }

    #[test]
    fn sequence_split_across_reads_is_handled() {
        let mut f = TelnetFilter::new();
        let mut data = Vec::new();
        let mut replies = Vec::new();
        f.feed(&[b'l', IAC], &mut data, &mut replies);
        f.feed(&[DO], &mut data, &mut replies);
        f.feed(&[31, b'n'], &mut data, &mut replies);
        assert_eq!(data, b"ln");
        assert_eq!(replies, vec![IAC, WONT, 31]);
    }

    #[test]
    fn outbound_iac_is_doubled() {
        assert_eq!(escape_iac(&[1, IAC, 2]), vec![1, IAC, IAC, 2]);
    }

    /// Minimal device: negotiates, logs in, then answers every line with
    /// `<line> OK`. `enable` is answered with a password prompt. With
    /// `prompts` off the device reads credentials without asking for them.
    async fn spawn_fake_device(prompts: bool) -> (u16, tokio::task::JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            let (read_half, mut write_half) = socket.into_split();
            let mut reader = BufReader::new(read_half);
            let mut lines = Vec::new();

            write_half.write_all(&[IAC, DO, 24]).await.expect("write");
            if prompts {
                write_half.write_all(b"\r\nlogin: ").await.expect("write");
            }
            let mut line = Vec::new();
            reader.read_until(b'\n', &mut line).await.expect("read");
            lines.push(line.clone());

            if prompts {
                write_half.write_all(b"Password: ").await.expect("write");
            }
            line.clear();
            reader.read_until(b'\n', &mut line).await.expect("read");
            lines.push(line.clone());

            write_half.write_all(b"Welcome\r\nswitch>").await.expect("write");
            loop {
                line.clear();
                let n = reader.read_until(b'\n', &mut line).await.expect("read");
                if n == 0 {
                    break;
                }
                let cmd = String::from_utf8_lossy(&line).trim().to_string();
                lines.push(line.clone());
                let reply = if cmd == "enable" {
                    "Password: ".to_string()
                } else if lines.len() >= 2 && lines[lines.len() - 2] == b"enable\n" {
                    "\r\nswitch#".to_string()
                } else {
                    format!("{cmd} OK\r\nswitch#")
                };
                if write_half.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
            lines
        });
        (port, handle)
    }

    fn telnet_credentials(port: u16, timeout_secs: u64) -> DeviceCredentials {
        DeviceCredentials::new("127.0.0.1", "admin", "secret", DeviceType::BrocadeFws)
            .with_connection_type(ConnectionType::Telnet)
            .with_port(Some(port))
            .with_timeout_secs(timeout_secs)
    }

    #[tokio::test]
    async fn logs_in_and_captures_command_output() {
        let (port, device) = spawn_fake_device(true).await;
        let mut session = TelnetSession::new(telnet_credentials(port, 10));
        session.connect().await.expect("connect");
        let output = session
            .send_command("show version", Duration::from_millis(200))
            .await
            .expect("send");
        assert!(output.contains("show version OK"), "output was {output:?}");
        session.disconnect().await.expect("disconnect");
        session.disconnect().await.expect("second disconnect is harmless");

        let lines = device.await.expect("device task");
        assert_eq!(lines[0], [&[IAC, WONT, 24][..], &b"admin\n"[..]].concat());
        assert_eq!(lines[1], b"secret\n");
        assert_eq!(lines[2], b"show version\n");
    }

    #[tokio::test]
    async fn short_timeout_does_not_cover_the_banner_wait() {
        let (port, device) = spawn_fake_device(true).await;
        let mut session = TelnetSession::new(telnet_credentials(port, 1));
        session.connect().await.expect("responsive device logs in within 1s");
        session.disconnect().await.expect("disconnect");

        let lines = device.await.expect("device task");
        assert_eq!(lines[1], b"secret\n");
    }

    #[tokio::test]
    async fn missing_prompts_are_cut_short_by_the_timeout() {
        let (port, device) = spawn_fake_device(false).await;
        let mut session = TelnetSession::new(telnet_credentials(port, 1));
        let started = Instant::now();
        session.connect().await.expect("credentials sent without prompts");
        assert!(
            started.elapsed() < config::LOGIN_PROMPT_TIMEOUT + config::TELNET_BANNER_DELAY,
            "prompt waits should stop at the connect timeout"
        );
        session.disconnect().await.expect("disconnect");

        let lines = device.await.expect("device task");
        assert_eq!(lines[0], [&[IAC, WONT, 24][..], &b"admin\n"[..]].concat());
        assert_eq!(lines[1], b"secret\n");
    }

    #[tokio::test]
    async fn escalate_answers_the_enable_password_prompt() {
        let (port, device) = spawn_fake_device(true).await;
        let mut session = TelnetSession::new(telnet_credentials(port, 10));
        session.connect().await.expect("connect");
        session.escalate("enable-secret").await.expect("escalate");
        let output = session
            .send_command("show clock", Duration::from_millis(200))
            .await
            .expect("send");
        assert!(output.contains("show clock OK"), "output was {output:?}");
        session.disconnect().await.expect("disconnect");

        let lines = device.await.expect("device task");
        assert_eq!(lines[2], b"enable\n");
        assert_eq!(lines[3], b"enable-secret\n");
        assert_eq!(lines[4], b"show clock\n");
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let creds = DeviceCredentials::new("127.0.0.1", "admin", "secret", DeviceType::Ciena)
            .with_connection_type(ConnectionType::Telnet)
            .with_port(Some(port))
            .with_timeout_secs(5);
        let mut session = TelnetSession::new(creds);
        let err = session.connect().await.expect_err("nothing listens");
        assert!(matches!(err, ExecError::Connection(_)));
        session.disconnect().await.expect("disconnect without connect");
    }

    #[tokio::test]
    async fn send_before_connect_is_rejected() {
        let creds = DeviceCredentials::new("127.0.0.1", "admin", "secret", DeviceType::Ciena)
            .with_connection_type(ConnectionType::Telnet);
        let mut session = TelnetSession::new(creds);
        let err = session
            .send_command("show version", Duration::ZERO)
            .await
            .expect_err("not connected");
        assert!(matches!(err, ExecError::NotConnected));
    }
}
