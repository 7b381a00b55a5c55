//! Minimal IRC line codec (RFC 1459 framing plus IRCv3 message tags).

use std::collections::HashMap;
use std::fmt;

/// A single parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// IRCv3 tags (`@key=value;...`), unescaped.
    pub tags: HashMap<String, String>,
    /// Source prefix without the leading `:`.
    pub prefix: Option<String>,
    /// Command or three-digit numeric, upper-cased.
    pub command: String,
    /// Middle params followed by the trailing param, if any.
    pub params: Vec<String>,
}

impl Message {
    pub fn new(command: &str, params: Vec<String>) -> Self {
        Self {
            tags: HashMap::new(),
            prefix: None,
            command: command.to_string(),
            params,
        }
    }

    /// Parse one line. Trailing CR/LF is ignored. Returns `None` for blank
    /// lines or lines without a command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut tags = HashMap::new();
        if let Some(stripped) = rest.strip_prefix('@') {
            let (raw_tags, after) = stripped.split_once(' ')?;
            for pair in raw_tags.split(';').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some((k, v)) => tags.insert(k.to_string(), unescape_tag_value(v)),
                    None => tags.insert(pair.to_string(), String::new()),
                };
            }
            rest = after.trim_start_matches(' ');
        }

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (p, after) = stripped.split_once(' ')?;
            prefix = Some(p.to_string());
            rest = after.trim_start_matches(' ');
        }

        let (command, mut rest) = match rest.split_once(' ') {
            Some((c, r)) => (c, r),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((p, r)) => {
                    params.push(p.to_string());
                    rest = r;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            tags,
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nick portion of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .and_then(|p| p.split('!').next())
            .filter(|n| !n.is_empty())
    }
}

/// Writes the line without CRLF. Tags are not written; the client never
/// sends them.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

fn unescape_tag_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_command_and_trailing() {
        let msg = Message::parse(":alice!a@host PRIVMSG #rust :hello there\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!a@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#rust", "hello there"]);
        assert_eq!(msg.nick(), Some("alice"));
    }

    #[test]
    fn parses_numeric_without_prefix() {
        let msg = Message::parse("433 * bob :Nickname is already in use").unwrap();
        assert_eq!(msg.command, "433");
        assert_eq!(msg.params.len(), 3);
        assert!(msg.prefix.is_none());
        assert!(msg.nick().is_none());
    }

    #[test]
    fn parses_tags_with_escapes() {
        let msg = Message::parse("@time=2024-01-01T00:00:00Z;label=a\\sb\\:c;flag :srv NOTICE * :hi").unwrap();
        assert_eq!(msg.tags.get("label").map(String::as_str), Some("a b;c"));
        assert_eq!(msg.tags.get("flag").map(String::as_str), Some(""));
        assert_eq!(msg.command, "NOTICE");
    }

    #[test]
    fn lowercase_command_is_normalized() {
        let msg = Message::parse("ping :token").unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["token"]);
    }

    #[test]
    fn blank_line_is_rejected() {
        assert!(Message::parse("\r\n").is_none());
        assert!(Message::parse(":prefixonly").is_none());
    }

    #[test]
    fn display_adds_colon_only_when_needed() {
        let msg = Message::new("PRIVMSG", vec!["#rust".into(), "two words".into()]);
        assert_eq!(msg.to_string(), "PRIVMSG #rust :two words");

        let msg = Message::new("JOIN", vec!["#rust".into()]);
        assert_eq!(msg.to_string(), "JOIN #rust");

        let msg = Message::new("QUIT", vec![":)".into()]);
        assert_eq!(msg.to_string(), "QUIT ::)");
    }

    #[test]
    fn display_skips_tags_and_keeps_prefix() {
        let msg = Message::parse("@id=1 :srv NOTICE * :hi there").unwrap();
        assert_eq!(msg.to_string(), ":srv NOTICE * :hi there");
    }
}
