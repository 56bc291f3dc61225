//! Rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::model::{Origin, Record};
use crate::session::StatusLevel;
use crate::tui::app::{App, Focus};

pub fn draw(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.size());

    draw_filters(f, app, rows[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main[0]);

    draw_full_list(f, app, lists[0]);
    draw_filtered_list(f, app, lists[1]);
    draw_detail(f, app, main[1]);
    draw_status(f, app, rows[2]);
}

fn pane(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

fn highlight() -> Style {
    Style::default()
        .add_modifier(Modifier::BOLD)
        .fg(Color::Yellow)
}

fn draw_filters(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Length(7),
            Constraint::Min(10),
        ])
        .split(area);

    let name = Paragraph::new(app.name_input.as_str())
        .block(pane(" Name ".to_string(), app.focus == Focus::NameFilter));
    f.render_widget(name, chunks[0]);

    let combine = Paragraph::new(app.session.filter().combine().as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(combine, chunks[1]);

    let content_style = if app.session.filter().query_error().is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let content = Paragraph::new(app.content_input.as_str())
        .style(content_style)
        .block(pane(" Content ".to_string(), app.focus == Focus::ContentFilter));
    f.render_widget(content, chunks[2]);

    let cursor = match app.focus {
        Focus::NameFilter => Some((chunks[0], app.name_input.chars().count())),
        Focus::ContentFilter => Some((chunks[2], app.content_input.chars().count())),
        _ => None,
    };
    if let (Some((rect, len)), None) = (cursor, &app.prompt) {
        let x = rect.x + 1 + (len as u16).min(rect.width.saturating_sub(3));
        f.set_cursor(x, rect.y + 1);
    }
}

fn record_line(record: &Record) -> Line<'static> {
    let color = if record.is_handshake() {
        Color::Yellow
    } else {
        match record.origin {
            Origin::Client => Color::Cyan,
            Origin::Server => Color::Magenta,
        }
    };
    let arrow = match record.origin {
        Origin::Client => "C->S",
        Origin::Server => "S->C",
    };

    Line::from(vec![
        Span::styled(
            format!("{:>6} ", record.ordinal.map_or(0, |o| o.index())),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(format!("{:>9.3} ", record.arrival_time)),
        Span::styled(format!("{arrow} "), Style::default().fg(color)),
        Span::raw(format!("{:>5} ", record.type_id)),
        Span::styled(record.type_name.clone(), Style::default().fg(color)),
        Span::styled(
            format!(" ({})", record.byte_length),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn draw_full_list(f: &mut Frame, app: &mut App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    app.full_height = height.max(1);

    let store = app.session.store();
    let offset = app.session.sync().full_offset().min(store.len());

    // Only the visible window is built; the first row is the sync offset
    let items: Vec<ListItem> = store
        .iter()
        .skip(offset)
        .take(height)
        .map(|record| ListItem::new(record_line(record)))
        .collect();

    let mut state = ListState::default();
    state.select(
        app.session
            .sync()
            .selected()
            .map(|o| o.index())
            .filter(|&i| i >= offset && i < offset + height)
            .map(|i| i - offset),
    );

    let follow = if app.follow { " [follow]" } else { "" };
    let title = format!(" Packets ({}){follow} ", store.len());
    let list = List::new(items)
        .block(pane(title, app.focus == Focus::Full))
        .highlight_style(highlight())
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_filtered_list(f: &mut Frame, app: &mut App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    app.filtered_height = height.max(1);

    let view = app.session.view();
    let offset = app.filtered_offset.min(view.len());
    let store = app.session.store();

    let items: Vec<ListItem> = view.ordinals()[offset..]
        .iter()
        .take(height)
        .filter_map(|&ordinal| store.get(ordinal))
        .map(|record| ListItem::new(record_line(record)))
        .collect();

    let mut state = ListState::default();
    state.select(
        app.session
            .sync()
            .filtered_cursor()
            .filter(|&i| i >= offset && i < offset + height)
            .map(|i| i - offset),
    );

    let title = format!(" Filtered ({}) ", view.len());
    let list = List::new(items)
        .block(pane(title, app.focus == Focus::Filtered))
        .highlight_style(highlight())
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let Some(record) = app.session.selected_record() else {
        let hint = Paragraph::new("select a packet")
            .style(Style::default().fg(Color::DarkGray))
            .block(pane(" Detail ".to_string(), false));
        f.render_widget(hint, area);
        return;
    };

    // Pretty-print when the content is JSON, otherwise show it verbatim
    let body = serde_json::from_str::<serde_json::Value>(&record.content)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| record.content.clone());

    let mut lines = vec![
        Line::from(Span::styled(record.to_string(), Style::default().fg(Color::Cyan))),
        Line::from(""),
    ];
    lines.extend(body.lines().map(|l| Line::from(l.to_string())));
    if let Some(binary) = &record.raw_binary {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("binary: {binary}"),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let detail = Paragraph::new(lines)
        .block(pane(format!(" {} ", record.type_name), false))
        .wrap(Wrap { trim: false });
    f.render_widget(detail, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    if let Some(prompt) = &app.prompt {
        let line = Line::from(vec![
            Span::styled(format!("{}: ", prompt.label()), Style::default().fg(Color::Yellow)),
            Span::raw(prompt.input.as_str()),
        ]);
        f.render_widget(Paragraph::new(line), area);
        let x = area.x + (prompt.label().len() + 2 + prompt.input.chars().count()) as u16;
        f.set_cursor(x.min(area.right().saturating_sub(1)), area.y);
        return;
    }

    let mut spans = Vec::new();
    match app.session.connection() {
        Some(connection) => {
            spans.push(Span::styled(
                format!("{} [{}]", connection.target, connection.state),
                Style::default().fg(Color::Green),
            ));
            if let Some(ts) = connection.established_at {
                spans.push(Span::raw(format!(" since {ts}")));
            }
        }
        None => spans.push(Span::styled("detached", Style::default().fg(Color::DarkGray))),
    }

    if let Some(status) = app.session.status() {
        let color = match status.level {
            StatusLevel::Info => Color::Gray,
            StatusLevel::Alert => Color::Red,
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.message.clone(), Style::default().fg(color)));
    }

    spans.push(Span::styled(
        "  tab focus  ^T source  ^R import  ^E export  ^L clear  ^O and/or  y/Y/n/i/h copy  q quit",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
