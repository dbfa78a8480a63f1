//! UI rendering for the terminal user interface, using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::app::{App, ViewKind};
use crate::config::{ControlsSettings, Settings, UiSettings};
use crate::player::{Status, render_status};
use crate::track::display_from_fields;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("1-4", "views");
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("enter", "play");
    map.insert("space", "play/pause");
    map.insert("s", "stop");
    map.insert("h/l", "prev/next");
    // H/L and +/- are filled in from the config.
    map.insert("/ ?", "search");
    map.insert("e", "queue");
    map.insert(":", "command");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating the configured steps.
fn controls_text(controls: &ControlsSettings) -> String {
    let order = [
        "1-4", "j/k", "gg/G", "enter", "space", "s", "h/l", "H/L", "+/-", "/ ?", "e", ":", "q",
    ];
    order
        .iter()
        .filter_map(|k| match *k {
            "H/L" => Some(format!("[H/L] seek -/+{}s", controls.seek_seconds)),
            "+/-" => Some(format!("[+/-] volume {}", controls.volume_step)),
            _ => CONTROLS_MAP.get(k).map(|v| format!("[{k}] {v}")),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// The "now playing" line.
fn now_playing_text(status: &Status, ui: &UiSettings) -> String {
    match &status.track {
        Some(track) => display_from_fields(
            track,
            &ui.now_playing_track_fields,
            &ui.now_playing_track_separator,
        ),
        None => "-".to_string(),
    }
}

fn tab_titles(app: &App) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, kind) in ViewKind::ALL.iter().enumerate() {
        let name = match kind {
            ViewKind::Library => "library",
            ViewKind::Playlist => "playlist",
            ViewKind::Browser => "browser",
            ViewKind::Queue => "queue",
        };
        let style = if *kind == app.view_kind() {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {}:{name} ", i + 1), style));
    }
    Line::from(spans)
}

/// The bottom line: the open prompt, else the message, else nothing.
fn message_line(app: &App) -> Line<'static> {
    if let Some(prompt) = app.prompt() {
        return Line::from(format!("{}{}", prompt.symbol(), app.input()));
    }
    match app.message() {
        Some(m) if m.is_error() => Line::styled(m.text().to_string(), Style::default().fg(Color::Red)),
        Some(m) => Line::from(m.text().to_string()),
        None => Line::default(),
    }
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, app: &App, settings: &Settings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(tab_titles(app))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(settings.ui.header_text.as_str())
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = app.player.status();
    let status_par = Paragraph::new(vec![
        Line::from(now_playing_text(&status, &settings.ui)),
        Line::from(render_status(&settings.ui.status_format, &status)),
    ])
    .block(
        Block::bordered()
            .padding(Padding {
                left: 1,
                right: 0,
                top: 0,
                bottom: 0,
            })
            .title(match app.player.output_name() {
                Some(name) => format!(" status [{name}] "),
                None => " status ".to_string(),
            }),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Main list; only the visible rows are rendered.
    {
        let view = app.active_view();
        let rows = chunks[2].height.saturating_sub(2) as usize;
        let rendered = view.render(rows);
        let selected = rendered.iter().position(|r| r.selected);
        let items: Vec<ListItem> = rendered
            .into_iter()
            .map(|r| {
                let style = if r.active {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(r.text).style(style)
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", view.title())),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(selected);
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    frame.render_widget(Paragraph::new(message_line(app)), chunks[3]);

    let footer = Paragraph::new(controls_text(&settings.controls))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_text_uses_configured_steps() {
        let controls = ControlsSettings {
            seek_seconds: 10,
            volume_step: 3,
        };
        let text = controls_text(&controls);
        assert!(text.starts_with("[1-4] views | [j/k] up/down"));
        assert!(text.contains("[H/L] seek -/+10s"));
        assert!(text.contains("[+/-] volume 3"));
        assert!(text.ends_with("[q] quit"));
    }
}
