//! Events emitted by the IRC client for the UI layer to consume.

use std::collections::HashMap;

/// Events that the SDK emits to the consumer (TUI, GUI, bot, etc.)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// TCP (and TLS, if enabled) connection is up; registration starts.
    Connected,

    /// IRC registration complete. `nick` is our confirmed nick, which may be
    /// one of the configured fallbacks.
    Registered { nick: String },

    /// Someone (possibly us) joined a channel.
    Joined { channel: String, nick: String },

    /// Someone left a channel.
    Parted { channel: String, nick: String },

    /// A message in a channel or private message.
    Message {
        from: String,
        target: String,
        text: String,
        /// IRCv3 message tags (empty if none).
        tags: HashMap<String, String>,
    },

    /// NAMES list for a channel (one 353 reply).
    Names { channel: String, nicks: Vec<String> },

    /// Channel topic changed or received on join.
    TopicChanged {
        channel: String,
        topic: String,
        set_by: Option<String>,
    },

    /// A user changed nick.
    NickChanged { old_nick: String, new_nick: String },

    /// Someone was kicked from a channel.
    Kicked {
        channel: String,
        nick: String,
        by: String,
        reason: String,
    },

    /// Someone quit the server.
    UserQuit { nick: String, reason: String },

    /// Server sent a notice, error numeric or MOTD line.
    ServerNotice { text: String },

    /// A line the client does not model. `raw` is the line as received.
    Unhandled { command: String, raw: String },

    /// Connection was closed.
    Disconnected { reason: String },
}

impl Event {
    /// Upper-snake name of the event kind, stable for display.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Connected => "CONNECTED",
            Event::Registered { .. } => "REGISTERED",
            Event::Joined { .. } => "JOINED",
            Event::Parted { .. } => "PARTED",
            Event::Message { .. } => "MESSAGE",
            Event::Names { .. } => "NAMES",
            Event::TopicChanged { .. } => "TOPIC_CHANGED",
            Event::NickChanged { .. } => "NICK_CHANGED",
            Event::Kicked { .. } => "KICKED",
            Event::UserQuit { .. } => "USER_QUIT",
            Event::ServerNotice { .. } => "SERVER_NOTICE",
            Event::Unhandled { .. } => "UNHANDLED",
            Event::Disconnected { .. } => "DISCONNECTED",
        }
    }

    /// Payload rendered as text: the raw line for unmodeled input, otherwise
    /// a compact rendering of the fields.
    pub fn payload(&self) -> String {
        match self {
            Event::Connected => String::new(),
            Event::Registered { nick } => nick.clone(),
            Event::Joined { channel, nick } => format!("{nick} {channel}"),
            Event::Parted { channel, nick } => format!("{nick} {channel}"),
            Event::Message { from, target, text, .. } => format!("{from} -> {target}: {text}"),
            Event::Names { channel, nicks } => format!("{channel} {}", nicks.join(" ")),
            Event::TopicChanged { channel, topic, set_by } => match set_by {
                Some(by) => format!("{channel} {topic} (set by {by})"),
                None => format!("{channel} {topic}"),
            },
            Event::NickChanged { old_nick, new_nick } => format!("{old_nick} -> {new_nick}"),
            Event::Kicked { channel, nick, by, reason } => {
                format!("{nick} from {channel} by {by} ({reason})")
            }
            Event::UserQuit { nick, reason } => format!("{nick} ({reason})"),
            Event::ServerNotice { text } => text.clone(),
            Event::Unhandled { raw, .. } => raw.clone(),
            Event::Disconnected { reason } => reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unhandled_payload_is_the_raw_line() {
        let event = Event::Unhandled {
            command: "372".into(),
            raw: ":srv 372 bob :- welcome".into(),
        };
        assert_eq!(event.kind(), "UNHANDLED");
        assert_eq!(event.payload(), ":srv 372 bob :- welcome");
    }

    #[test]
    fn topic_payload_mentions_setter() {
        let event = Event::TopicChanged {
            channel: "#rust".into(),
            topic: "borrowck".into(),
            set_by: Some("carol".into()),
        };
        assert_eq!(event.payload(), "#rust borrowck (set by carol)");
    }
}
