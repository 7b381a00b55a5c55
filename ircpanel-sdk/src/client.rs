//! IRC client connection.
//!
//! This is the main entry point for SDK consumers. It manages the TCP
//! connection, IRC registration with fallback nicknames, and emits events.
//! Supports both plaintext and TLS connections.
//!
//! ## Nickname fallback
//!
//! `ConnectConfig::alt_nicks` lists the nicknames tried, in order, when the
//! server answers `433 ERR_NICKNAMEINUSE` before registration completes.
//! When the list is exhausted the connection is closed with
//! [`Event::Disconnected`].
//!
//! ## Reconnection
//!
//! The SDK does not implement automatic reconnection. A single connection
//! attempt is made per [`establish_connection`] call.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::rustls;
use tokio_rustls::TlsConnector;

use crate::event::Event;
use crate::irc::Message;

/// Configuration for connecting to an IRC server.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Server address (host:port).
    pub server_addr: String,
    /// Desired nickname.
    pub nick: String,
    /// Nicknames tried in order if `nick` is taken.
    pub alt_nicks: Vec<String>,
    /// Username (ident).
    pub user: String,
    /// Real name.
    pub realname: String,
    /// Use TLS.
    pub tls: bool,
    /// Skip TLS certificate verification (for self-signed certs).
    pub tls_insecure: bool,
    /// Upper bound on TCP connect plus TLS handshake. `None` waits forever.
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:6667".to_string(),
            nick: "user".to_string(),
            alt_nicks: Vec::new(),
            user: "user".to_string(),
            realname: "ircpanel user".to_string(),
            tls: false,
            tls_insecure: false,
            connect_timeout: None,
        }
    }
}

/// Commands the consumer can send to the client.
#[derive(Debug)]
pub enum Command {
    Join(String),
    Privmsg { target: String, text: String },
    Quit(Option<String>),
}

impl Command {
    fn to_message(&self) -> Message {
        match self {
            Command::Join(channel) => Message::new("JOIN", vec![channel.clone()]),
            Command::Privmsg { target, text } => {
                Message::new("PRIVMSG", vec![target.clone(), text.clone()])
            }
            Command::Quit(Some(reason)) => Message::new("QUIT", vec![reason.clone()]),
            Command::Quit(None) => Message::new("QUIT", Vec::new()),
        }
    }
}

/// Refuse text that would end the IRC line early and smuggle in another
/// command.
fn ensure_single_line(field: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n', '\0']) {
        bail!("{field} must not contain CR, LF or NUL");
    }
    Ok(())
}

/// A handle to a running IRC client connection.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<Command>,
    nick: Arc<Mutex<String>>,
}

impl ClientHandle {
    pub async fn join(&self, channel: &str) -> Result<()> {
        ensure_single_line("channel", channel)?;
        self.cmd_tx.send(Command::Join(channel.to_string())).await?;
        Ok(())
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        ensure_single_line("target", target)?;
        ensure_single_line("message text", text)?;
        self.cmd_tx
            .send(Command::Privmsg {
                target: target.to_string(),
                text: text.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn quit(&self, message: Option<&str>) -> Result<()> {
        if let Some(reason) = message {
            ensure_single_line("quit reason", reason)?;
        }
        self.cmd_tx
            .send(Command::Quit(message.map(|s| s.to_string())))
            .await?;
        Ok(())
    }

    /// Our current nick: the configured one until the server confirms
    /// registration, then whatever the server accepted.
    pub fn nick(&self) -> String {
        self.nick.lock().clone()
    }

    /// Whether the protocol task is still running.
    pub fn is_open(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}

/// A connection that has completed TCP (and optionally TLS) but hasn't
/// started IRC registration yet.
pub enum EstablishedConnection {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

/// Establish TCP (and optionally TLS) connection to the server.
///
/// Errors here are connection failures: DNS, refused, TLS handshake or the
/// configured timeout elapsing.
pub async fn establish_connection(config: &ConnectConfig) -> Result<EstablishedConnection> {
    match config.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, establish_inner(config))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "connect to {} timed out after {}s",
                    config.server_addr,
                    limit.as_secs()
                )
            })?,
        None => establish_inner(config).await,
    }
}

async fn establish_inner(config: &ConnectConfig) -> Result<EstablishedConnection> {
    // Auto-detect TLS from port if not explicitly set
    let use_tls = config.tls || config.server_addr.ends_with(":6697");
    let mode = if use_tls { "TLS" } else { "plain" };

    tracing::debug!("Resolving {}...", config.server_addr);
    let tcp = TcpStream::connect(&config.server_addr)
        .await
        .map_err(|e| anyhow::anyhow!("TCP connect to {} failed: {e}", config.server_addr))?;
    tracing::debug!("TCP connected to {} ({mode})", config.server_addr);

    if !use_tls {
        return Ok(EstablishedConnection::Plain(tcp));
    }

    let tls_config = if config.tls_insecure {
        tracing::debug!("TLS: insecure mode (skipping cert verification)");
        rustls_insecure_config()
    } else {
        tracing::debug!("TLS: verifying server certificate...");
        rustls_default_config()
    };
    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name = config
        .server_addr
        .split(':')
        .next()
        .unwrap_or("localhost");
    let dns_name = rustls::pki_types::ServerName::try_from(server_name.to_string())?;
    let tls_stream = connector
        .connect(dns_name, tcp)
        .await
        .map_err(|e| anyhow::anyhow!("TLS handshake with {} failed: {e}", config.server_addr))?;
    tracing::debug!("TLS handshake complete");
    Ok(EstablishedConnection::Tls(Box::new(tls_stream)))
}

/// Connect using an already-established connection.
///
/// Returns a handle for sending commands and a receiver for events.
/// The IRC protocol runs in a spawned task.
pub fn connect_with_stream(
    conn: EstablishedConnection,
    config: ConnectConfig,
) -> (ClientHandle, mpsc::Receiver<Event>) {
    match conn {
        EstablishedConnection::Plain(tcp) => {
            let (reader, writer) = tokio::io::split(tcp);
            spawn_protocol(BufReader::new(reader), writer, config)
        }
        EstablishedConnection::Tls(tls) => {
            let (reader, writer) = tokio::io::split(*tls);
            spawn_protocol(BufReader::new(reader), writer, config)
        }
    }
}

/// Spawn the protocol loop over any reader/writer pair.
pub(crate) fn spawn_protocol<R, W>(
    reader: R,
    writer: W,
    config: ConnectConfig,
) -> (ClientHandle, mpsc::Receiver<Event>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(4096);
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let nick = Arc::new(Mutex::new(config.nick.clone()));

    let handle = ClientHandle {
        cmd_tx,
        nick: nick.clone(),
    };

    tokio::spawn(async move {
        let _ = event_tx.send(Event::Connected).await;
        if let Err(e) = run_irc(reader, writer, &config, nick, event_tx.clone(), cmd_rx).await {
            tracing::debug!(error = %e, "IRC session ended with error");
            let _ = event_tx
                .send(Event::Disconnected {
                    reason: e.to_string(),
                })
                .await;
        }
    });

    (handle, event_rx)
}

fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn rustls_default_config() -> rustls::ClientConfig {
    install_crypto_provider();

    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

fn rustls_insecure_config() -> rustls::ClientConfig {
    install_crypto_provider();
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureVerifier))
        .with_no_client_auth()
}

#[derive(Debug)]
struct InsecureVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::CryptoProvider::get_default()
            .map(|p| p.signature_verification_algorithms.supported_schemes())
            .unwrap_or_default()
    }
}

async fn run_irc<R, W>(
    mut reader: R,
    mut writer: W,
    config: &ConnectConfig,
    nick: Arc<Mutex<String>>,
    event_tx: mpsc::Sender<Event>,
    mut cmd_rx: mpsc::Receiver<Command>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let user = Message::new(
        "USER",
        vec![
            config.user.clone(),
            "0".to_string(),
            "*".to_string(),
            config.realname.clone(),
        ],
    );
    send_message(&mut writer, &Message::new("NICK", vec![config.nick.clone()])).await?;
    send_message(&mut writer, &user).await?;

    let mut registered = false;
    let mut nick_tries: usize = 0;
    let mut pending_commands: Vec<Command> = Vec::new();
    let mut line_buf: Vec<u8> = Vec::new();
    let mut last_activity = tokio::time::Instant::now();
    let ping_interval = Duration::from_secs(60);
    let ping_timeout = Duration::from_secs(120);

    loop {
        tokio::select! {
            result = reader.read_until(b'\n', &mut line_buf) => {
                let n = result?;
                if n == 0 {
                    let _ = event_tx.send(Event::Disconnected { reason: "EOF".to_string() }).await;
                    break;
                }

                last_activity = tokio::time::Instant::now();
                // Peers may relay Latin-1 or other legacy encodings verbatim
                let raw = String::from_utf8_lossy(&line_buf).trim_end().to_string();
                line_buf.clear();
                tracing::trace!(line = %raw, "<<");

                let Some(msg) = Message::parse(&raw) else {
                    continue;
                };
                match msg.command.as_str() {
                    // ERR_NICKNAMEINUSE
                    "433" if !registered => {
                        let taken = msg.params.get(1).cloned().unwrap_or_default();
                        let _ = event_tx.send(Event::ServerNotice {
                            text: format!("Nickname {taken} is already in use"),
                        }).await;
                        match config.alt_nicks.get(nick_tries) {
                            Some(alt) => {
                                nick_tries += 1;
                                tracing::debug!(nick = %alt, "nick taken, trying fallback");
                                *nick.lock() = alt.clone();
                                send_message(&mut writer, &Message::new("NICK", vec![alt.clone()])).await?;
                            }
                            None => {
                                let _ = event_tx.send(Event::Disconnected {
                                    reason: "Nick in use".to_string(),
                                }).await;
                                break;
                            }
                        }
                    }
                    "001" => {
                        let confirmed = msg.params.first().cloned().unwrap_or_default();
                        *nick.lock() = confirmed.clone();
                        registered = true;
                        let _ = event_tx.send(Event::Registered { nick: confirmed }).await;
                        for cmd in pending_commands.drain(..) {
                            execute_command(&mut writer, cmd).await?;
                        }
                    }
                    "PING" => {
                        let token = msg.params.first().cloned().unwrap_or_default();
                        send_message(&mut writer, &Message::new("PONG", vec![token])).await?;
                    }
                    "JOIN" => {
                        let channel = msg.params.first().cloned().unwrap_or_default();
                        let who = msg.nick().unwrap_or("").to_string();
                        let _ = event_tx.send(Event::Joined { channel, nick: who }).await;
                    }
                    "PART" => {
                        let channel = msg.params.first().cloned().unwrap_or_default();
                        let who = msg.nick().unwrap_or("").to_string();
                        let _ = event_tx.send(Event::Parted { channel, nick: who }).await;
                    }
                    "NICK" => {
                        let old_nick = msg.nick().unwrap_or("").to_string();
                        let new_nick = msg.params.first().cloned().unwrap_or_default();
                        if !old_nick.is_empty() && !new_nick.is_empty() {
                            {
                                let mut current = nick.lock();
                                if current.eq_ignore_ascii_case(&old_nick) {
                                    *current = new_nick.clone();
                                }
                            }
                            let _ = event_tx.send(Event::NickChanged { old_nick, new_nick }).await;
                        }
                    }
                    "KICK" if msg.params.len() >= 2 => {
                        let by = msg.nick().unwrap_or("server").to_string();
                        let _ = event_tx.send(Event::Kicked {
                            channel: msg.params[0].clone(),
                            nick: msg.params[1].clone(),
                            by,
                            reason: msg.params.get(2).cloned().unwrap_or_default(),
                        }).await;
                    }
                    "TOPIC" if !msg.params.is_empty() => {
                        let _ = event_tx.send(Event::TopicChanged {
                            channel: msg.params[0].clone(),
                            topic: msg.params.get(1).cloned().unwrap_or_default(),
                            set_by: msg.nick().map(|s| s.to_string()),
                        }).await;
                    }
                    // RPL_TOPIC
                    "332" if msg.params.len() >= 3 => {
                        let _ = event_tx.send(Event::TopicChanged {
                            channel: msg.params[1].clone(),
                            topic: msg.params[2].clone(),
                            set_by: None,
                        }).await;
                    }
                    // RPL_NAMREPLY
                    "353" if msg.params.len() >= 4 => {
                        let channel = msg.params[2].clone();
                        let nicks = msg.params[3].split_whitespace().map(|s| s.to_string()).collect();
                        let _ = event_tx.send(Event::Names { channel, nicks }).await;
                    }
                    "QUIT" => {
                        let who = msg.nick().unwrap_or("").to_string();
                        let reason = msg.params.first().cloned().unwrap_or_default();
                        let _ = event_tx.send(Event::UserQuit { nick: who, reason }).await;
                    }
                    "PRIVMSG" | "NOTICE" if msg.params.len() >= 2 => {
                        let prefix = msg.prefix.as_deref().unwrap_or("");
                        // Server notices come from a bare server name, not nick!user@host
                        let is_server_notice = msg.command == "NOTICE" && !prefix.contains('!');
                        if is_server_notice {
                            let text = msg.params[1].clone();
                            let _ = event_tx.send(Event::ServerNotice { text }).await;
                        } else {
                            let _ = event_tx.send(Event::Message {
                                from: msg.nick().unwrap_or("").to_string(),
                                target: msg.params[0].clone(),
                                text: msg.params[1].clone(),
                                tags: msg.tags.clone(),
                            }).await;
                        }
                    }
                    "ERROR" => {
                        let text = msg.params.join(" ");
                        let _ = event_tx.send(Event::ServerNotice { text }).await;
                    }
                    _ => {
                        let is_error_numeric = msg
                            .command
                            .parse::<u16>()
                            .is_ok_and(|num| (400..600).contains(&num));
                        if is_error_numeric {
                            let text = if msg.params.len() > 1 {
                                msg.params[1..].join(" ")
                            } else {
                                msg.params.join(" ")
                            };
                            let _ = event_tx.send(Event::ServerNotice { text }).await;
                        } else {
                            let _ = event_tx.send(Event::Unhandled {
                                command: msg.command.clone(),
                                raw,
                            }).await;
                        }
                    }
                }
            }
            Some(cmd) = cmd_rx.recv() => {
                if registered || matches!(cmd, Command::Quit(_)) {
                    let quitting = matches!(cmd, Command::Quit(_));
                    execute_command(&mut writer, cmd).await?;
                    if quitting && !registered {
                        break; // Quit before registration
                    }
                } else {
                    pending_commands.push(cmd);
                }
            }
            _ = tokio::time::sleep_until(last_activity + ping_interval) => {
                if last_activity.elapsed() > ping_timeout {
                    let _ = event_tx.send(Event::Disconnected { reason: "Ping timeout".to_string() }).await;
                    break;
                }
                send_message(&mut writer, &Message::new("PING", vec!["keepalive".to_string()])).await?;
            }
        }
    }

    Ok(())
}

async fn execute_command<W: AsyncWrite + Unpin>(writer: &mut W, cmd: Command) -> Result<()> {
    send_message(writer, &cmd.to_message()).await
}

async fn send_message<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Message) -> Result<()> {
    let line = msg.to_string();
    tracing::trace!(line = %line, ">>");
    writer.write_all(format!("{line}\r\n").as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
