use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use ratatui_image::StatefulImage;

use crate::control::ControlKind;
use crate::present::letterbox_area;
use crate::session::LogLevel;

use super::{LinkState, ViewerUI};

const SIDEBAR_WIDTH: u16 = 36;

impl ViewerUI {
    pub(crate) fn ui(&mut self, f: &mut Frame) {
        if self.fullscreen {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(1)])
                .split(f.area());
            self.render_preview(f, chunks[0], false);
            self.render_status_bar(f, chunks[1]);
            return;
        }

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
            .split(f.area());

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Preview
                Constraint::Length(3), // Input
                Constraint::Length(1), // Status bar
            ])
            .split(columns[0]);

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6), // Controls
                Constraint::Length(9), // Debug
                Constraint::Min(3),    // Log
            ])
            .split(columns[1]);

        self.render_preview(f, left[0], true);
        self.render_input(f, left[1]);
        self.render_status_bar(f, left[2]);
        self.render_controls(f, sidebar[0]);
        self.render_debug(f, sidebar[1]);
        self.render_log(f, sidebar[2]);
    }

    fn render_preview(&mut self, f: &mut Frame, area: Rect, bordered: bool) {
        let inner = if bordered {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Preview ");
            let inner = block.inner(area);
            f.render_widget(block, area);
            inner
        } else {
            area
        };

        // The surface is cleared before every draw
        f.render_widget(Clear, inner);

        let target = self.preview_target(inner);
        match self.frame_protocol.as_mut() {
            Some(protocol) => {
                if target.area() > 0 {
                    f.render_stateful_widget(StatefulImage::default(), target, protocol);
                }
            }
            None => {
                let text = match self.link {
                    LinkState::Connecting => "Connecting...",
                    LinkState::Open(_) => "Waiting for frames...",
                    LinkState::Closed => "Not connected",
                };
                let waiting = Paragraph::new(text)
                    .style(Style::default().fg(Color::DarkGray))
                    .alignment(Alignment::Center);
                let y = inner.y + inner.height / 2;
                f.render_widget(waiting, Rect::new(inner.x, y, inner.width, inner.height.min(1)));
            }
        }
    }

    /// Where the frame lands inside the preview area. Uses the picker's cell
    /// size, which is also what the protocol resizes the image with.
    pub(crate) fn preview_target(&self, inner: Rect) -> Rect {
        letterbox_area(inner, self.picker.font_size(), self.frame_size)
    }

    fn render_input(&self, f: &mut Frame, area: Rect) {
        let text: String = self.input.iter().collect();
        let input = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Command (/help) "),
            )
            .style(Style::default().fg(Color::White));
        f.render_widget(input, area);

        let inner_w = area.width.saturating_sub(2).max(1);
        let cx = (self.cursor as u16).min(inner_w.saturating_sub(1));
        f.set_cursor_position((area.x + 1 + cx, area.y + 1));
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (link, link_color) = if self.link.is_open() {
            ("● live", Color::Green)
        } else {
            ("○ offline", Color::Red)
        };
        let status = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", link),
                Style::default().fg(link_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("│ "),
            Span::styled("F5", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" full │ "),
            Span::raw(self.status.as_str()),
        ]))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        f.render_widget(status, area);
    }

    fn render_controls(&self, f: &mut Frame, area: Rect) {
        let lines: Vec<Line> = ControlKind::ALL
            .into_iter()
            .map(|kind| {
                let value = self
                    .session
                    .controls()
                    .value(kind)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "—".to_string());
                Line::from(vec![
                    Span::styled(format!("{:<14}", kind.label()), Style::default().fg(Color::Cyan)),
                    Span::raw(value),
                ])
            })
            .collect();

        let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Controls "));
        f.render_widget(panel, area);
    }

    fn render_debug(&self, f: &mut Frame, area: Rect) {
        let debug = self.session.debug();
        let surface = self.session.surface();
        let format = debug
            .last_format
            .map(|p| p.to_string())
            .unwrap_or_else(|| "—".to_string());
        let device = debug
            .device_controls
            .map(|c| format!("g{} e{} r{} b{}", c.gain, c.exposure, c.wb_r, c.wb_b))
            .unwrap_or_else(|| "—".to_string());
        let capture = debug
            .capture
            .map(|c| format!("{} / {}", c.captured_frames, c.total_frames))
            .unwrap_or_else(|| "—".to_string());

        let row = |label: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{:<9}", label), Style::default().fg(Color::DarkGray)),
                Span::raw(value),
            ])
        };
        let lines = vec![
            row("frames", format!("{} ({} dropped)", debug.frames, debug.dropped)),
            row("size", format!("{}x{} {}", surface.width(), surface.height(), format)),
            row("decode", format!("{:.2} ms", debug.last_decode.as_secs_f64() * 1000.0)),
            row("expand", format!("{:.2} ms", debug.last_expand.as_secs_f64() * 1000.0)),
            row("reallocs", surface.reallocations().to_string()),
            row("device", device),
            row("capture", capture),
        ];

        let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Debug "));
        f.render_widget(panel, area);
    }

    fn render_log(&self, f: &mut Frame, area: Rect) {
        if self.session.log().is_empty() {
            let empty = Paragraph::new("No messages")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title(" Log "));
            f.render_widget(empty, area);
            return;
        }

        let lines: Vec<Line> = self
            .session
            .log()
            .entries()
            .map(|entry| {
                let color = match entry.level {
                    LogLevel::Info => Color::Gray,
                    LogLevel::Error => Color::Red,
                };
                Line::from(vec![
                    Span::styled(
                        entry.time.format("%H:%M:%S ").to_string(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(entry.text.clone(), Style::default().fg(color)),
                ])
            })
            .collect();

        let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Log "));
        f.render_widget(panel, area);
    }
}
