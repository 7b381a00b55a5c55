//! Turns library events into console lines and session transitions.

use ircpanel_sdk::event::Event;
use tokio::sync::mpsc;

use crate::console::ConsoleLine;
use crate::identity::ChannelTarget;
use crate::session::Session;
use crate::state::{Panel, SessionState};

pub const CONNECTED_TEXT: &str = "Connection successful. Waiting for authorization...";
pub const WELCOME_TEXT: &str = "Welcome! Chat send/receive enabled.";

/// Consumes one session's event stream. Produces exactly one console line
/// per event and never fails.
pub struct EventRouter<S: Session> {
    panel: Panel,
    session: S,
    channel: ChannelTarget,
}

impl<S: Session> EventRouter<S> {
    pub fn new(panel: Panel, session: S, channel: ChannelTarget) -> Self {
        Self {
            panel,
            session,
            channel,
        }
    }

    /// Drain events until the library drops its sender.
    pub async fn run(self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        tracing::debug!(channel = %self.channel, "event stream closed");
    }

    pub async fn handle(&self, event: Event) {
        tracing::debug!(kind = event.kind(), "event");
        match event {
            Event::Registered { ref nick } => self.on_registered(nick, &event).await,
            Event::Message {
                ref from,
                ref target,
                ref text,
                ..
            } if self.channel.matches(target) => {
                self.panel.push(ConsoleLine::chat(from, text));
            }
            Event::Joined {
                ref channel,
                ref nick,
            } if self.channel.matches(channel) && nick.eq_ignore_ascii_case(&self.session.nick()) => {
                self.on_join_complete(&event);
            }
            Event::NickChanged {
                ref old_nick,
                ref new_nick,
            } => {
                let mut panel = self.panel.lock();
                if panel.nick().is_some_and(|n| n.eq_ignore_ascii_case(old_nick)) {
                    panel.set_nick(new_nick.clone());
                }
                panel.console.push(raw_line(&event));
            }
            Event::Disconnected { ref reason } => {
                tracing::info!(%reason, "session closed by library");
                let mut panel = self.panel.lock();
                panel.advance(SessionState::Disconnected);
                panel.console.push(raw_line(&event));
            }
            other => self.panel.push(raw_line(&other)),
        }
    }

    async fn on_registered(&self, nick: &str, event: &Event) {
        {
            let mut panel = self.panel.lock();
            if panel.session_state() != SessionState::Connecting {
                panel.console.push(raw_line(event));
                return;
            }
            panel.set_nick(nick);
            panel.console.push(ConsoleLine::info(CONNECTED_TEXT));
        }

        tracing::info!(%nick, channel = %self.channel, "registered, joining");
        if let Err(e) = self.session.join_channel(&self.channel).await {
            tracing::warn!(error = %e, channel = %self.channel, "join request failed");
            self.panel
                .push(ConsoleLine::error(format!("Could not join {}: {e}", self.channel)));
        }
    }

    fn on_join_complete(&self, event: &Event) {
        let mut panel = self.panel.lock();
        if panel.advance(SessionState::Joined) {
            panel.set_channel(self.channel.clone());
            panel.console.push(ConsoleLine::info(WELCOME_TEXT));
        } else {
            panel.console.push(raw_line(event));
        }
    }
}

fn raw_line(event: &Event) -> ConsoleLine {
    ConsoleLine::raw_event(event.kind(), &event.payload())
}
