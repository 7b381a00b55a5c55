//! Scrollback console: append-only, color-categorized lines.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Deserialize;

/// Scrollback cap; the oldest line is dropped past this.
pub const MAX_LINES: usize = 1000;

/// Display category of a console line. Each maps to one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Lifecycle progress from this client (black).
    Info,
    /// Failures and every event the router does not special-case (red).
    Error,
    /// A message from someone else in the channel (blue).
    ChatMessage,
    /// Our own message, echoed locally (green).
    SelfEcho,
}

/// Where new lines go relative to existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleOrder {
    /// Latest line on top (each line inserted at index zero).
    #[default]
    NewestFirst,
    /// Chronological, latest line at the bottom.
    OldestFirst,
}

/// One rendered record. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ConsoleLine {
    pub text: String,
    pub category: Category,
    pub at: DateTime<Local>,
}

impl ConsoleLine {
    pub fn new(category: Category, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category,
            at: Local::now(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Category::Info, format!("> {}", text.into()))
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Category::Error, format!("> {}", text.into()))
    }

    /// `<sender>: body`
    pub fn chat(sender: &str, body: &str) -> Self {
        Self::new(Category::ChatMessage, format!("<{sender}>: {body}"))
    }

    /// Same shape as [`ConsoleLine::chat`], colored as our own.
    pub fn self_echo(nick: &str, body: &str) -> Self {
        Self::new(Category::SelfEcho, format!("<{nick}>: {body}"))
    }

    /// Catch-all rendering: kind name followed by the raw payload.
    pub fn raw_event(kind: &str, payload: &str) -> Self {
        if payload.is_empty() {
            Self::error(kind)
        } else {
            Self::error(format!("{kind} {payload}"))
        }
    }
}

/// The console: lines kept in display order.
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: VecDeque<ConsoleLine>,
    order: ConsoleOrder,
}

impl Console {
    pub fn new(order: ConsoleOrder) -> Self {
        Self {
            lines: VecDeque::new(),
            order,
        }
    }

    pub fn push(&mut self, line: ConsoleLine) {
        match self.order {
            ConsoleOrder::NewestFirst => {
                self.lines.push_front(line);
                if self.lines.len() > MAX_LINES {
                    self.lines.pop_back();
                }
            }
            ConsoleOrder::OldestFirst => {
                self.lines.push_back(line);
                if self.lines.len() > MAX_LINES {
                    self.lines.pop_front();
                }
            }
        }
    }

    /// Lines in display order, top to bottom.
    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &ConsoleLine> + ExactSizeIterator {
        self.lines.iter()
    }

    /// The most recently pushed line.
    pub fn latest(&self) -> Option<&ConsoleLine> {
        match self.order {
            ConsoleOrder::NewestFirst => self.lines.front(),
            ConsoleOrder::OldestFirst => self.lines.back(),
        }
    }

    pub fn order(&self) -> ConsoleOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(console: &Console) -> Vec<&str> {
        console.lines().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn newest_first_puts_latest_on_top() {
        let mut console = Console::new(ConsoleOrder::NewestFirst);
        console.push(ConsoleLine::info("one"));
        console.push(ConsoleLine::info("two"));
        assert_eq!(texts(&console), vec!["> two", "> one"]);
        assert_eq!(console.latest().unwrap().text, "> two");
    }

    #[test]
    fn oldest_first_is_chronological() {
        let mut console = Console::new(ConsoleOrder::OldestFirst);
        console.push(ConsoleLine::info("one"));
        console.push(ConsoleLine::info("two"));
        assert_eq!(texts(&console), vec!["> one", "> two"]);
        assert_eq!(console.latest().unwrap().text, "> two");
    }

    #[test]
    fn default_order_is_newest_first() {
        assert_eq!(Console::default().order(), ConsoleOrder::NewestFirst);
    }

    #[test]
    fn line_formats() {
        let chat = ConsoleLine::chat("alice", "hi");
        assert_eq!(chat.text, "<alice>: hi");
        assert_eq!(chat.category, Category::ChatMessage);

        let echo = ConsoleLine::self_echo("bob_2", "yo");
        assert_eq!(echo.text, "<bob_2>: yo");
        assert_eq!(echo.category, Category::SelfEcho);

        let raw = ConsoleLine::raw_event("UNHANDLED", ":srv 372 bob :- motd");
        assert_eq!(raw.text, "> UNHANDLED :srv 372 bob :- motd");
        assert_eq!(raw.category, Category::Error);

        assert_eq!(ConsoleLine::raw_event("CONNECTED", "").text, "> CONNECTED");
    }

    #[test]
    fn scrollback_drops_the_oldest_line_past_the_cap() {
        for order in [ConsoleOrder::NewestFirst, ConsoleOrder::OldestFirst] {
            let mut console = Console::new(order);
            for i in 0..=MAX_LINES {
                console.push(ConsoleLine::info(i.to_string()));
            }
            assert_eq!(console.len(), MAX_LINES);
            assert_eq!(console.latest().unwrap().text, format!("> {MAX_LINES}"));
            assert!(console.lines().all(|l| l.text != "> 0"));
        }
    }
}
