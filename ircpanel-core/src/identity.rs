//! Who we connect as, and where we chat.

use std::fmt;

use crate::error::ConnectError;

/// Suffixes appended to the chosen nickname, tried in order by the
/// connection library when the nickname is taken.
pub const FALLBACK_SUFFIXES: [&str; 3] = ["_2", "_3", "_4"];

/// Prefix marking a channel name.
pub const CHANNEL_MARKER: char = '#';

/// Server plus the ordered nickname candidates for one connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    server_addr: String,
    nick: String,
    fallback_nicks: Vec<String>,
}

impl ConnectionIdentity {
    pub fn new(server_addr: &str, nick: &str) -> Result<Self, ConnectError> {
        let nick = nick.trim();
        if nick.is_empty() {
            return Err(ConnectError::EmptyNickname);
        }
        if nick.contains(char::is_whitespace) {
            return Err(ConnectError::InvalidNickname(nick.to_string()));
        }
        let fallback_nicks = FALLBACK_SUFFIXES
            .iter()
            .map(|suffix| format!("{nick}{suffix}"))
            .collect();
        Ok(Self {
            server_addr: server_addr.trim().to_string(),
            nick: nick.to_string(),
            fallback_nicks,
        })
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn fallback_nicks(&self) -> &[String] {
        &self.fallback_nicks
    }

    /// Every candidate in the order the server will see them.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.nick.as_str()).chain(self.fallback_nicks.iter().map(String::as_str))
    }
}

/// A channel name, always carrying the channel marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelTarget(String);

impl ChannelTarget {
    pub fn new(name: &str) -> Result<Self, ConnectError> {
        let name = name.trim();
        let bare = name.strip_prefix(CHANNEL_MARKER).unwrap_or(name);
        if bare.is_empty() {
            return Err(ConnectError::EmptyChannel);
        }
        if name.contains([' ', ',', '\x07']) {
            return Err(ConnectError::InvalidChannel(name.to_string()));
        }
        Ok(Self(normalize_channel(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// IRC channel names compare case-insensitively.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefix the channel marker unless it is already there.
pub fn normalize_channel(name: &str) -> String {
    if name.starts_with(CHANNEL_MARKER) {
        name.to_string()
    } else {
        format!("{CHANNEL_MARKER}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_candidates_in_order() {
        let id = ConnectionIdentity::new("irc.example.net:6667", "alice").unwrap();
        let all: Vec<&str> = id.candidates().collect();
        assert_eq!(all, vec!["alice", "alice_2", "alice_3", "alice_4"]);
        assert_eq!(id.fallback_nicks().len(), 3);
    }

    #[test]
    fn nickname_is_trimmed() {
        let id = ConnectionIdentity::new("irc.example.net:6667", "  bob ").unwrap();
        assert_eq!(id.nick(), "bob");
        assert_eq!(id.fallback_nicks()[0], "bob_2");
    }

    #[test]
    fn empty_or_spaced_nick_is_rejected() {
        assert!(matches!(
            ConnectionIdentity::new("srv:6667", "   "),
            Err(ConnectError::EmptyNickname)
        ));
        assert!(matches!(
            ConnectionIdentity::new("srv:6667", "two words"),
            Err(ConnectError::InvalidNickname(_))
        ));
    }

    #[test]
    fn channel_gets_marker_once() {
        assert_eq!(ChannelTarget::new("rust").unwrap().as_str(), "#rust");
        assert_eq!(ChannelTarget::new("#rust").unwrap().as_str(), "#rust");
        assert_eq!(normalize_channel(&normalize_channel("rust")), "#rust");
    }

    #[test]
    fn empty_channel_is_rejected() {
        assert!(matches!(ChannelTarget::new(""), Err(ConnectError::EmptyChannel)));
        assert!(matches!(ChannelTarget::new("#"), Err(ConnectError::EmptyChannel)));
        assert!(matches!(
            ChannelTarget::new("a,b"),
            Err(ConnectError::InvalidChannel(_))
        ));
    }

    #[test]
    fn channel_match_ignores_case() {
        let target = ChannelTarget::new("Rust").unwrap();
        assert!(target.matches("#rust"));
        assert!(!target.matches("#go"));
    }
}
