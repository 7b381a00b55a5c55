//! State shared between the session controller, the event router and the
//! display surface.
//!
//! Every mutation goes through one [`Panel`] lock. The router writes from
//! its own task, the controller and the UI from theirs; nobody holds the
//! lock across an await.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::console::{Console, ConsoleLine, ConsoleOrder};
use crate::identity::ChannelTarget;

/// Text of the line shown before anything happens.
pub const BANNER: &str = "Awaiting server connection...";

/// Lifecycle of the single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Joined,
}

impl SessionState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Joined)
                | (Connecting, Disconnected)
                | (Joined, Disconnected)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Joined => "joined",
        }
    }
}

/// Which controls the display surface should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub connect: bool,
    pub disconnect: bool,
    /// Message field and Send.
    pub compose: bool,
    /// Username and channel fields.
    pub edit_identity: bool,
}

#[derive(Debug)]
pub struct PanelState {
    pub console: Console,
    session_state: SessionState,
    nick: Option<String>,
    channel: Option<ChannelTarget>,
}

impl PanelState {
    pub fn new(order: ConsoleOrder) -> Self {
        let mut console = Console::new(order);
        console.push(ConsoleLine::info(BANNER));
        Self {
            console,
            session_state: SessionState::Disconnected,
            nick: None,
            channel: None,
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    /// Apply a transition if legal. Returns whether the state changed.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if !self.session_state.can_advance_to(next) {
            tracing::debug!(
                from = self.session_state.label(),
                to = next.label(),
                "ignoring illegal session transition"
            );
            return false;
        }
        tracing::info!(from = self.session_state.label(), to = next.label(), "session state");
        self.session_state = next;
        if next == SessionState::Disconnected {
            self.nick = None;
            self.channel = None;
        }
        true
    }

    pub fn controls(&self) -> Controls {
        match self.session_state {
            SessionState::Disconnected => Controls {
                connect: true,
                disconnect: false,
                compose: false,
                edit_identity: true,
            },
            SessionState::Connecting => Controls {
                connect: false,
                disconnect: true,
                compose: false,
                edit_identity: false,
            },
            SessionState::Joined => Controls {
                connect: false,
                disconnect: true,
                compose: true,
                edit_identity: false,
            },
        }
    }

    /// Our nickname as confirmed by the server, once registered.
    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    pub fn set_nick(&mut self, nick: impl Into<String>) {
        self.nick = Some(nick.into());
    }

    pub fn channel(&self) -> Option<&ChannelTarget> {
        self.channel.as_ref()
    }

    pub fn set_channel(&mut self, channel: ChannelTarget) {
        self.channel = Some(channel);
    }
}

/// Cloneable handle to the shared [`PanelState`].
#[derive(Debug, Clone)]
pub struct Panel(Arc<Mutex<PanelState>>);

impl Panel {
    pub fn new(order: ConsoleOrder) -> Self {
        Self(Arc::new(Mutex::new(PanelState::new(order))))
    }

    pub fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.0.lock()
    }

    pub fn push(&self, line: ConsoleLine) {
        self.0.lock().console.push(line);
    }

    pub fn session_state(&self) -> SessionState {
        self.0.lock().session_state()
    }

    pub fn controls(&self) -> Controls {
        self.0.lock().controls()
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self::new(ConsoleOrder::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_lifecycle_path_is_legal() {
        use SessionState::*;
        assert!(Disconnected.can_advance_to(Connecting));
        assert!(Connecting.can_advance_to(Joined));
        assert!(Joined.can_advance_to(Disconnected));
        assert!(Connecting.can_advance_to(Disconnected));

        assert!(!Disconnected.can_advance_to(Joined));
        assert!(!Joined.can_advance_to(Connecting));
        assert!(!Disconnected.can_advance_to(Disconnected));
        assert!(!Joined.can_advance_to(Joined));
    }

    #[test]
    fn illegal_advance_leaves_state() {
        let mut state = PanelState::new(ConsoleOrder::OldestFirst);
        assert!(!state.advance(SessionState::Joined));
        assert_eq!(state.session_state(), SessionState::Disconnected);
    }

    #[test]
    fn compose_enabled_only_when_joined() {
        let mut state = PanelState::new(ConsoleOrder::OldestFirst);
        assert!(!state.controls().compose);
        assert!(state.controls().connect);

        state.advance(SessionState::Connecting);
        assert!(!state.controls().compose);
        assert!(state.controls().disconnect);
        assert!(!state.controls().edit_identity);

        state.advance(SessionState::Joined);
        assert!(state.controls().compose);
        assert!(!state.controls().connect);
    }

    #[test]
    fn disconnect_forgets_nick_and_channel() {
        let mut state = PanelState::new(ConsoleOrder::OldestFirst);
        state.advance(SessionState::Connecting);
        state.set_nick("bob");
        state.set_channel(ChannelTarget::new("rust").unwrap());
        state.advance(SessionState::Disconnected);
        assert!(state.nick().is_none());
        assert!(state.channel().is_none());
    }

    #[test]
    fn starts_with_banner() {
        let panel = Panel::default();
        let guard = panel.lock();
        assert_eq!(guard.console.len(), 1);
        assert_eq!(guard.console.latest().unwrap().text, "> Awaiting server connection...");
    }
}
