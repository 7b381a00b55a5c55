//! Session controller: the outgoing side of the bridge.
//!
//! Holds at most one live session. Connect, send and disconnect failures
//! are returned to the caller and also rendered as console lines.
//!
//! A connect can run in one call ([`SessionController::connect`]) or in
//! three steps so a front end keeps handling input while the network
//! attempt is in flight: [`SessionController::begin_connect`] validates and
//! moves to Connecting, [`PendingConnect::attempt`] runs on any task, and
//! [`SessionController::finish_connect`] installs the result.

use std::sync::Arc;

use ircpanel_sdk::event::Event;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::console::ConsoleLine;
use crate::error::{ConnectError, SendError, SessionError};
use crate::identity::{ChannelTarget, ConnectionIdentity};
use crate::router::EventRouter;
use crate::session::{Connector, Session};
use crate::state::{Panel, SessionState};

/// Reason sent to the server on disconnect.
pub const QUIT_REASON: &str = "User has disconnected.";

struct ActiveSession<S> {
    session: S,
    identity: ConnectionIdentity,
    channel: ChannelTarget,
    router: JoinHandle<()>,
}

/// A validated connect request whose network attempt has not run yet.
pub struct PendingConnect<C: Connector> {
    connector: Arc<C>,
    generation: u64,
    identity: ConnectionIdentity,
    channel: ChannelTarget,
}

impl<C: Connector> PendingConnect<C> {
    /// Run the single connection attempt. Owns everything it needs, so it
    /// can be spawned.
    pub async fn attempt(self) -> ConnectAttempt<C::Session> {
        let result = self.connector.request_connection(&self.identity).await;
        ConnectAttempt {
            generation: self.generation,
            identity: self.identity,
            channel: self.channel,
            result,
        }
    }
}

/// Outcome of [`PendingConnect::attempt`], handed back to
/// [`SessionController::finish_connect`].
pub struct ConnectAttempt<S> {
    generation: u64,
    identity: ConnectionIdentity,
    channel: ChannelTarget,
    result: Result<(S, mpsc::Receiver<Event>), SessionError>,
}

pub struct SessionController<C: Connector> {
    connector: Arc<C>,
    panel: Panel,
    active: Option<ActiveSession<C::Session>>,
    /// Bumped by every begin and cancel; only the latest attempt may land.
    generation: u64,
}

impl<C: Connector> SessionController<C> {
    pub fn new(connector: C, panel: Panel) -> Self {
        Self {
            connector: Arc::new(connector),
            panel,
            active: None,
            generation: 0,
        }
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn session_state(&self) -> SessionState {
        self.panel.session_state()
    }

    /// Identity of the live session, if any.
    pub fn identity(&self) -> Option<&ConnectionIdentity> {
        self.active.as_ref().map(|a| &a.identity)
    }

    /// Make one connection attempt and start routing its events.
    pub async fn connect(
        &mut self,
        nickname: &str,
        server_addr: &str,
        channel: &str,
    ) -> Result<C::Session, ConnectError> {
        let pending = self.begin_connect(nickname, server_addr, channel)?;
        let attempt = pending.attempt().await;
        self.finish_connect(attempt).await
    }

    /// Validate the request and enter Connecting. Nothing touches the
    /// network until the returned attempt runs.
    pub fn begin_connect(
        &mut self,
        nickname: &str,
        server_addr: &str,
        channel: &str,
    ) -> Result<PendingConnect<C>, ConnectError> {
        self.reap_closed_session();
        if let Some(active) = &self.active {
            return Err(ConnectError::AlreadyConnected {
                nick: active.session.nick(),
            });
        }
        if self.panel.session_state() != SessionState::Disconnected {
            return Err(ConnectError::AlreadyConnected {
                nick: nickname.trim().to_string(),
            });
        }

        let prepared = ConnectionIdentity::new(server_addr, nickname)
            .and_then(|identity| ChannelTarget::new(channel).map(|target| (identity, target)));
        let (identity, channel) = match prepared {
            Ok(pair) => pair,
            Err(e) => {
                self.panel.push(ConsoleLine::error(format!("Cannot connect: {e}")));
                return Err(e);
            }
        };

        {
            let mut panel = self.panel.lock();
            panel.console.push(ConsoleLine::info("Connection initiated."));
            panel.advance(SessionState::Connecting);
        }

        self.generation += 1;
        Ok(PendingConnect {
            connector: Arc::clone(&self.connector),
            generation: self.generation,
            identity,
            channel,
        })
    }

    /// Install the outcome of an attempt started by
    /// [`SessionController::begin_connect`]. A session that opens after the
    /// attempt was cancelled is closed straight away.
    pub async fn finish_connect(
        &mut self,
        attempt: ConnectAttempt<C::Session>,
    ) -> Result<C::Session, ConnectError> {
        let ConnectAttempt {
            generation,
            identity,
            channel,
            result,
        } = attempt;
        let server = identity.server_addr().to_string();

        let cancelled = generation != self.generation
            || self.active.is_some()
            || self.panel.session_state() != SessionState::Connecting;
        let (session, events) = match result {
            Ok(opened) if cancelled => {
                tracing::info!(%server, "connection opened after cancel, closing");
                if let Err(e) = opened.0.close(QUIT_REASON).await {
                    tracing::warn!(error = %e, "close failed");
                }
                return Err(ConnectError::Cancelled { server });
            }
            Ok(opened) => opened,
            Err(source) if cancelled => {
                tracing::debug!(%server, error = %source, "cancelled attempt failed");
                return Err(ConnectError::Cancelled { server });
            }
            Err(source) => {
                tracing::warn!(%server, error = %source, "connect failed");
                let mut panel = self.panel.lock();
                panel.advance(SessionState::Disconnected);
                panel
                    .console
                    .push(ConsoleLine::error(format!("Connection failed: {source}")));
                return Err(ConnectError::Connection { server, source });
            }
        };

        let router = EventRouter::new(self.panel.clone(), session.clone(), channel.clone());
        let router = tokio::spawn(router.run(events));
        tracing::info!(%server, nick = identity.nick(), %channel, "session started");
        self.active = Some(ActiveSession {
            session: session.clone(),
            identity,
            channel,
            router,
        });
        Ok(session)
    }

    /// Abandon an attempt from [`SessionController::begin_connect`] that has
    /// not been finished. Returns whether there was one.
    pub fn cancel_connect(&mut self) -> bool {
        if self.active.is_some() {
            return false;
        }
        let mut panel = self.panel.lock();
        if panel.session_state() != SessionState::Connecting {
            return false;
        }
        self.generation += 1;
        panel.advance(SessionState::Disconnected);
        panel.console.push(ConsoleLine::info("Connection attempt cancelled."));
        tracing::info!("connect attempt cancelled");
        true
    }

    /// Forward `text` verbatim to the joined channel. Text that would
    /// break the IRC line framing is refused.
    pub async fn send_channel_message(&self, text: &str) -> Result<(), SendError> {
        let active = match &self.active {
            Some(active) if self.panel.session_state() == SessionState::Joined => active,
            _ => return Err(SendError::NotJoined),
        };
        if text.contains(['\r', '\n', '\0']) {
            return Err(SendError::InvalidText);
        }
        active
            .session
            .channel_say(&active.channel, text)
            .await
            .map_err(|source| SendError::Session {
                channel: active.channel.to_string(),
                source,
            })
    }

    /// Send, then echo our own line (the server does not echo it back).
    /// Failures are rendered instead.
    pub async fn submit_message(&self, text: &str) -> Result<(), SendError> {
        match self.send_channel_message(text).await {
            Ok(()) => {
                if let Some(active) = &self.active {
                    let nick = active.session.nick();
                    self.panel.push(ConsoleLine::self_echo(&nick, text));
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "message not sent");
                self.panel.push(ConsoleLine::error(format!("Message not sent: {e}")));
                Err(e)
            }
        }
    }

    /// Close the session and stop routing its events, or abandon a connect
    /// still in flight. Process lifetime is the caller's business.
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        let Some(active) = self.active.take() else {
            self.cancel_connect();
            return Ok(());
        };

        let closed = active.session.close(QUIT_REASON).await;
        if let Err(e) = &closed {
            tracing::warn!(error = %e, "close failed");
        }
        active.router.abort();

        let mut panel = self.panel.lock();
        panel.advance(SessionState::Disconnected);
        panel.console.push(ConsoleLine::info(QUIT_REASON));
        tracing::info!(nick = %active.session.nick(), "session closed by user");
        closed
    }

    /// Drop a session the library already closed.
    fn reap_closed_session(&mut self) {
        if self.active.is_some() && self.panel.session_state() == SessionState::Disconnected {
            if let Some(stale) = self.active.take() {
                tracing::debug!(nick = %stale.session.nick(), "dropping closed session");
                stale.router.abort();
            }
        }
    }
}

impl<C: Connector> Drop for SessionController<C> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.router.abort();
        }
    }
}
