//! Bridge between an IRC connection and a chat panel.
//!
//! [`controller::SessionController`] turns user intents (connect, send,
//! disconnect) into library calls; [`router::EventRouter`] turns the
//! library's events into [`console::ConsoleLine`]s. Both write through the
//! shared [`state::Panel`].

pub mod console;
pub mod controller;
pub mod error;
pub mod identity;
pub mod router;
pub mod session;
pub mod state;

pub use ircpanel_sdk as sdk;

pub use console::{Category, Console, ConsoleLine, ConsoleOrder};
pub use controller::{ConnectAttempt, PendingConnect, SessionController};
pub use error::{ConnectError, SendError, SessionError};
pub use identity::{ChannelTarget, ConnectionIdentity};
pub use session::{Connector, SdkConnector, Session};
pub use state::{Controls, Panel, SessionState};
