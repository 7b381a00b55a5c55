//! Application state for the TUI: the three input fields and the wiring
//! from keys to session controller operations.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ircpanel_core::{ConnectAttempt, Connector, Controls, SessionController};
use tokio::task::{JoinError, JoinHandle};

/// The network half of a connect, running off the input loop.
pub type PendingAttempt<C> = JoinHandle<ConnectAttempt<<C as Connector>::Session>>;

/// Input fields, in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Channel,
    Message,
}

impl Field {
    const ALL: [Field; 3] = [Field::Username, Field::Channel, Field::Message];

    fn enabled(self, controls: Controls) -> bool {
        match self {
            Field::Username | Field::Channel => controls.edit_identity,
            Field::Message => controls.compose,
        }
    }
}

/// What a key press asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Connect,
    Send,
    /// Disconnect and close the panel.
    Close,
}

pub struct App<C: Connector> {
    pub username: String,
    pub channel: String,
    pub message: String,
    pub focus: Field,
    pub server: String,
    pub should_quit: bool,
    pub controller: SessionController<C>,
    /// Connect attempt in flight, polled by the main loop.
    pub pending: Option<PendingAttempt<C>>,
}

impl<C: Connector> App<C> {
    pub fn new(
        server: String,
        username: String,
        channel: String,
        controller: SessionController<C>,
    ) -> Self {
        Self {
            username,
            channel,
            message: String::new(),
            focus: Field::Username,
            server,
            should_quit: false,
            controller,
            pending: None,
        }
    }

    pub fn controls(&self) -> Controls {
        self.controller.panel().controls()
    }

    /// Apply a key press to the fields. Returns the controller operation it
    /// triggers, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        let controls = self.controls();
        self.settle_focus(controls);

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Close;
        }

        match key.code {
            KeyCode::Esc | KeyCode::F(10) => Action::Close,
            KeyCode::F(2) if controls.connect => Action::Connect,
            KeyCode::Tab => {
                self.cycle_focus(controls, 1);
                Action::None
            }
            KeyCode::BackTab => {
                self.cycle_focus(controls, Field::ALL.len() - 1);
                Action::None
            }
            KeyCode::Enter => match self.focus {
                Field::Message if controls.compose && !self.message.is_empty() => Action::Send,
                Field::Username | Field::Channel if controls.connect => Action::Connect,
                _ => Action::None,
            },
            KeyCode::Backspace => {
                if let Some(field) = self.focused_field_mut(controls) {
                    field.pop();
                }
                Action::None
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.focused_field_mut(controls) {
                    field.push(c);
                }
                Action::None
            }
            _ => Action::None,
        }
    }

    /// Run the controller operation for `action`. Failures are already on
    /// the console; they are only logged here.
    pub async fn perform(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Connect => {
                match self
                    .controller
                    .begin_connect(&self.username, &self.server, &self.channel)
                {
                    Ok(pending) => self.pending = Some(tokio::spawn(pending.attempt())),
                    Err(e) => tracing::info!(error = %e, "connect request rejected"),
                }
            }
            Action::Send => {
                if self.controller.submit_message(&self.message).await.is_ok() {
                    self.message.clear();
                }
            }
            Action::Close => {
                if let Some(pending) = self.pending.take() {
                    pending.abort();
                }
                if let Err(e) = self.controller.disconnect().await {
                    tracing::warn!(error = %e, "disconnect failed");
                }
                self.should_quit = true;
            }
        }
    }

    /// Install the outcome of the attempt started by [`Action::Connect`].
    pub async fn finish_connect(&mut self, joined: Result<ConnectAttempt<C::Session>, JoinError>) {
        self.pending = None;
        match joined {
            Ok(attempt) => {
                if let Err(e) = self.controller.finish_connect(attempt).await {
                    tracing::info!(error = %e, "connect attempt did not open a session");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "connect task ended abnormally");
                self.controller.cancel_connect();
            }
        }
    }

    fn focused_field_mut(&mut self, controls: Controls) -> Option<&mut String> {
        if !self.focus.enabled(controls) {
            return None;
        }
        Some(match self.focus {
            Field::Username => &mut self.username,
            Field::Channel => &mut self.channel,
            Field::Message => &mut self.message,
        })
    }

    fn cycle_focus(&mut self, controls: Controls, step: usize) {
        let start = Field::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
        for offset in 1..=Field::ALL.len() {
            let candidate = Field::ALL[(start + offset * step) % Field::ALL.len()];
            if candidate.enabled(controls) {
                self.focus = candidate;
                return;
            }
        }
    }

    /// Move focus off a field that just became disabled.
    fn settle_focus(&mut self, controls: Controls) {
        if !self.focus.enabled(controls) {
            self.cycle_focus(controls, 1);
        }
    }
}
