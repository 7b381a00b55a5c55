//! Ratatui rendering for the TUI.

use ircpanel_core::{Category, ConsoleOrder, Connector, Controls};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{App, Field};

pub fn draw<C: Connector>(frame: &mut Frame, app: &App<C>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(3), // username + channel
            Constraint::Length(1), // buttons
            Constraint::Length(3), // message
            Constraint::Min(3),    // console
        ])
        .split(frame.area());

    let controls = app.controls();

    draw_status_bar(frame, app, chunks[0]);

    let identity_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    draw_field(frame, app, Field::Username, "Username", &app.username, controls.edit_identity, identity_cols[0]);
    draw_field(frame, app, Field::Channel, "Channel", &app.channel, controls.edit_identity, identity_cols[1]);

    draw_buttons(frame, controls, chunks[2]);
    draw_field(frame, app, Field::Message, "Message", &app.message, controls.compose, chunks[3]);
    draw_console(frame, app, chunks[4]);
}

fn draw_status_bar<C: Connector>(frame: &mut Frame, app: &App<C>, area: Rect) {
    let panel = app.controller.panel().lock();
    let nick = panel.nick().unwrap_or("-");
    let channel = panel
        .channel()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status_text = format!(
        " [{}] {} | nick: {nick} | channel: {channel}",
        panel.session_state().label(),
        app.server
    );
    let status = Paragraph::new(status_text).style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(status, area);
}

fn draw_field<C: Connector>(
    frame: &mut Frame,
    app: &App<C>,
    field: Field,
    title: &str,
    value: &str,
    enabled: bool,
    area: Rect,
) {
    let focused = enabled && app.focus == field;
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else if enabled {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let text_style = if enabled {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" {title} "));
    let inner = block.inner(area);

    // Keep the tail of long input visible
    let width = inner.width.saturating_sub(1) as usize;
    let char_count = value.chars().count();
    let visible: String = value.chars().skip(char_count.saturating_sub(width)).collect();
    let cursor_x = inner.x + visible.chars().count() as u16;

    frame.render_widget(Paragraph::new(visible).style(text_style).block(block), area);
    if focused {
        frame.set_cursor_position(Position::new(cursor_x, inner.y));
    }
}

fn draw_buttons(frame: &mut Frame, controls: Controls, area: Rect) {
    let button = |label: &str, enabled: bool| {
        let style = if enabled {
            Style::default().fg(Color::Black).bg(Color::Gray).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(format!(" {label} "), style)
    };
    let line = Line::from(vec![
        Span::raw(" "),
        button("F2 Connect to Server", controls.connect),
        Span::raw("  "),
        button("F10 Disconnect and Close", controls.disconnect),
        Span::raw("  "),
        button("Enter Send", controls.compose),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_console<C: Connector>(frame: &mut Frame, app: &App<C>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Console ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let panel = app.controller.panel().lock();
    let console = &panel.console;
    let height = inner.height as usize;

    // Newest-first keeps the top; oldest-first keeps the bottom.
    let skip = match console.order() {
        ConsoleOrder::NewestFirst => 0,
        ConsoleOrder::OldestFirst => console.len().saturating_sub(height),
    };
    let lines: Vec<Line> = console
        .lines()
        .skip(skip)
        .take(height)
        .map(|line| {
            Line::from(vec![
                Span::styled(
                    line.at.format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(line.text.clone(), category_style(line.category)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn category_style(category: Category) -> Style {
    let color = match category {
        Category::Info => Color::Reset,
        Category::Error => Color::Red,
        Category::ChatMessage => Color::Blue,
        Category::SelfEcho => Color::Green,
    };
    Style::default().fg(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_category_has_its_own_color() {
        let colors: Vec<Option<Color>> = [
            Category::Info,
            Category::Error,
            Category::ChatMessage,
            Category::SelfEcho,
        ]
        .into_iter()
        .map(|c| category_style(c).fg)
        .collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(category_style(Category::Error).fg, Some(Color::Red));
    }
}
