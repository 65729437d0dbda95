//! UI rendering for the TUI.
//!
//! Implements the View function of the Elm architecture - pure rendering
//! from application state to terminal frames.

use crate::tui::actions;
use crate::tui::app::App;
use mongo_move::{CopyStatus, FatalError, Mapping, Stage};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use std::sync::atomic::Ordering;
use tracing::Level;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn spinner(tick: u64) -> &'static str {
    SPINNER[(tick % SPINNER.len() as u64) as usize]
}

/// Render the entire application UI.
pub fn render(frame: &mut Frame, app: &App) {
    if let Some(fatal) = app.session.fatal() {
        render_fatal(frame, fatal);
        return;
    }

    // Main layout: status bar (top), content (middle), logs, footer (bottom)
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Status bar
            Constraint::Min(8),    // Content
            Constraint::Length(6), // Log panel
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_status_bar(frame, app, main_chunks[0]);
    render_content(frame, app, main_chunks[1]);
    render_logs(frame, app, main_chunks[2]);
    render_footer(frame, app, main_chunks[3]);

    if app.show_help {
        render_help(frame);
    }
}

/// Render the status bar at the top.
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let stage = app.session.stage();
    let stage_color = match stage {
        Stage::ChoosingSourceDb | Stage::ChoosingTargetDb => Color::Gray,
        Stage::LoadingCollections => Color::Yellow,
        Stage::MappingCollections | Stage::ReviewingMappings => Color::Cyan,
        Stage::CopyingInProgress => Color::Blue,
        Stage::Complete => Color::Green,
    };

    let mappings = app.session.mappings();
    let finished = mappings.iter().filter(|m| m.status.is_terminal()).count();

    let mut spans = vec![
        Span::styled(
            format!(" [{}] ", stage),
            Style::default().fg(stage_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "{} -> {}",
            app.session.source_db().unwrap_or("?"),
            app.session.target_db().unwrap_or("?")
        )),
        Span::raw(" | "),
        Span::raw(format!("Mappings {}/{}", finished, mappings.len())),
    ];
    if app.copy_started_at.is_some() {
        spans.push(Span::raw(" | "));
        spans.push(Span::raw(app.elapsed_formatted()));
    }

    let status_bar =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}

/// Render the stage-specific content.
fn render_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.session.stage() {
        Stage::ChoosingSourceDb | Stage::ChoosingTargetDb | Stage::MappingCollections
            if !app.revealed =>
        {
            render_loading(frame, app, area, "Loading...")
        }
        Stage::LoadingCollections => render_loading(frame, app, area, "Loading collections..."),
        Stage::ChoosingSourceDb | Stage::ChoosingTargetDb => render_pair(frame, app, area),
        Stage::MappingCollections => render_mapping(frame, app, area),
        Stage::ReviewingMappings => app.mapping_table.render(frame, area),
        Stage::CopyingInProgress => render_copy_list(frame, app, area, " Copying "),
        Stage::Complete => render_complete(frame, app, area),
    }
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect, label: &str) {
    let text = Line::from(vec![
        Span::styled(
            format!(" {} ", spinner(app.spinner_tick)),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(label.to_string()),
    ]);
    let loading = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    frame.render_widget(loading, area);
}

/// Source and target tables side by side.
fn render_pair(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    app.source_table.render(frame, columns[0]);
    app.target_table.render(frame, columns[1]);
}

/// Two pools side by side, with the pending pick underneath.
fn render_mapping(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(1)])
        .split(area);
    render_pair(frame, app, rows[0]);

    let pending = match app.session.pending() {
        Some(source) => Line::from(vec![
            Span::raw(" Mapping "),
            Span::styled(source.name.as_str(), Style::default().fg(Color::Cyan)),
            Span::raw(" -> pick a target collection"),
        ]),
        None => Line::from(Span::styled(
            format!(" {} mapping(s) so far", app.session.mappings().len()),
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(pending), rows[1]);
}

fn copy_line(mapping: &Mapping) -> Line<'_> {
    let (status, style) = match mapping.status {
        CopyStatus::NotStarted => ("Waiting".to_string(), Style::default().fg(Color::DarkGray)),
        CopyStatus::InProgress => (
            format!("{} Copying...", spinner(mapping.ticks)),
            Style::default().fg(Color::Yellow),
        ),
        CopyStatus::Done => (
            format!("✅ Done ({} documents)", mapping.copied.unwrap_or(0)),
            Style::default().fg(Color::Green),
        ),
        CopyStatus::Failed => (
            format!(
                "❌ Failed: {}",
                mapping.error_detail.as_deref().unwrap_or("unknown error")
            ),
            Style::default().fg(Color::Red),
        ),
    };
    Line::from(vec![
        Span::raw(format!(" {} -> {} - ", mapping.source.name, mapping.target.name)),
        Span::styled(status, style),
    ])
}

fn render_copy_list(frame: &mut Frame, app: &App, area: Rect, title: &str) {
    let items: Vec<ListItem> = app
        .session
        .mappings()
        .iter()
        .map(|m| ListItem::new(copy_line(m)))
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string()),
    );
    frame.render_widget(list, area);
}

fn render_complete(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    render_copy_list(frame, app, chunks[0], " Copy complete ");

    let mappings = app.session.mappings();
    let failed = mappings
        .iter()
        .filter(|m| m.status == CopyStatus::Failed)
        .count();
    let copied: u64 = mappings.iter().filter_map(|m| m.copied).sum();
    let summary = Paragraph::new(vec![
        Line::from(format!(
            " {} copied, {} failed, {} documents in {}",
            mappings.len() - failed,
            failed,
            copied,
            app.elapsed_formatted()
        )),
        Line::from(Span::styled(
            " Press r to map another pair of databases",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(summary, chunks[1]);
}

/// Render the log panel.
fn render_logs(frame: &mut Frame, app: &App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let skip = app.logs.len().saturating_sub(height);
    let log_lines: Vec<Line> = app
        .logs
        .iter()
        .skip(skip)
        .map(|line| {
            let style = match line.level {
                Level::ERROR => Style::default().fg(Color::Red),
                Level::WARN => Style::default().fg(Color::Yellow),
                Level::DEBUG | Level::TRACE => Style::default().fg(Color::DarkGray),
                _ => Style::default(),
            };
            Line::styled(line.text.as_str(), style)
        })
        .collect();

    let logs = Paragraph::new(log_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Logs ({}) ", app.logs.len())),
    );

    frame.render_widget(logs, area);
}

/// Render the key hints for the current view.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let filtering = app.filtering.load(Ordering::Relaxed);
    let spans: Vec<Span> = actions::hints(app.session.stage(), app.session.focus(), filtering)
        .into_iter()
        .flat_map(|hint| {
            [
                Span::styled(
                    format!(" {} ", hint.keys),
                    Style::default().bg(Color::DarkGray),
                ),
                Span::raw(format!(" {} ", hint.description)),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut help_text = vec![Line::from("")];
    help_text.extend(actions::all().into_iter().map(|hint| {
        Line::from(vec![
            Span::styled(
                format!("  {:<10}", hint.keys),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(hint.description),
        ])
    }));

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::DarkGray)),
    );

    frame.render_widget(help, area);
}

/// Whole-screen error view; the session accepts no further input.
fn render_fatal(frame: &mut Frame, fatal: &FatalError) {
    let text = vec![
        Line::from(Span::styled(
            format!("A fatal error occurred while {}", fatal.context),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Error Message:",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(fatal.text.as_str()),
        Line::from(""),
        Line::from(Span::styled(
            "Press q to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(" Error "))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, centered_rect(70, 50, frame.area()));
}

/// Helper to create a centered rect.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
