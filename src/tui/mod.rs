mod commands;
mod graphics;
mod render;

pub use graphics::create_picker;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{ClientEvent, ViewerClient};
use crate::control::Command;
use crate::present::Size;
use crate::session::{Effect, ViewerSession};

/// Socket messages handled per tick before drawing and polling keys again
const MAX_EVENTS_PER_TICK: usize = 8;
/// Time spent on socket messages per tick, matched to the key poll interval
const TICK_BUDGET: Duration = Duration::from_millis(30);

type Link = (
    mpsc::UnboundedSender<Command>,
    mpsc::UnboundedReceiver<ClientEvent>,
);

/// Where the server connection stands
pub(crate) enum LinkState {
    /// Connect still in flight; control values are held until it opens
    Connecting,
    Open(mpsc::UnboundedSender<Command>),
    /// Failed or disconnected, and never retried
    Closed,
}

impl LinkState {
    pub(crate) fn is_open(&self) -> bool {
        matches!(self, LinkState::Open(_))
    }
}

pub struct ViewerUI {
    pub(crate) session: ViewerSession,
    pub(crate) url: String,
    pub(crate) input: Vec<char>,
    pub(crate) cursor: usize,
    pub(crate) status: String,
    pub(crate) picker: Picker,
    /// Encoded bitmap of the latest frame; replaced, never cached
    pub(crate) frame_protocol: Option<StatefulProtocol>,
    pub(crate) frame_size: Size,
    pub(crate) fullscreen: bool,
    pub(crate) capture_frames: u32,
    pub(crate) link: LinkState,
    pub(crate) quit: bool,
}

impl ViewerUI {
    pub fn new(url: String, picker: Picker, capture_frames: u32) -> Self {
        Self {
            session: ViewerSession::new(),
            url,
            input: Vec::new(),
            cursor: 0,
            status: "Connecting...".to_string(),
            picker,
            frame_protocol: None,
            frame_size: Size::default(),
            fullscreen: false,
            capture_frames,
            link: LinkState::Connecting,
            quit: false,
        }
    }

    pub async fn run(&mut self, client: ViewerClient) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Connect in the background so control values typed meanwhile are
        // sent once the socket opens
        let connecting = tokio::spawn(async move { client.connect().await });
        let result = self.run_loop(&mut terminal, connecting).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        connecting: JoinHandle<Result<Link>>,
    ) -> Result<()> {
        let mut connecting = Some(connecting);
        let mut events_rx: Option<mpsc::UnboundedReceiver<ClientEvent>> = None;

        while !self.quit {
            terminal.draw(|f| self.ui(f))?;

            // Resize needs no handling: the preview is refitted to the new
            // viewport on the next draw and the pixel buffer is left alone
            if event::poll(TICK_BUDGET)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if connecting.as_ref().is_some_and(|h| h.is_finished()) {
                if let Some(handle) = connecting.take() {
                    match handle.await {
                        Ok(Ok((cmd_tx, rx))) => {
                            self.link = LinkState::Open(cmd_tx);
                            events_rx = Some(rx);
                            self.status = format!("Connected to {}", self.url);
                            let effects = self.session.connected(&self.url);
                            self.apply(effects);
                        }
                        Ok(Err(e)) => {
                            self.link = LinkState::Closed;
                            self.status = "Connection failed".to_string();
                            self.session.report(&format!("{:#}", e));
                        }
                        Err(e) => {
                            self.link = LinkState::Closed;
                            self.status = "Connection failed".to_string();
                            self.session.report(&e);
                        }
                    }
                }
            }

            let disconnected = match events_rx.as_mut() {
                Some(rx) => self.drain_events(rx),
                None => None,
            };
            if let Some(reason) = disconnected {
                events_rx = None;
                self.link = LinkState::Closed;
                self.status = "Disconnected".to_string();
                self.session.info(reason);
            }
        }

        Ok(())
    }

    /// Handle queued socket events one at a time, each fully applied before
    /// the next. Stops after [`MAX_EVENTS_PER_TICK`] events or
    /// [`TICK_BUDGET`] so a flood of frames cannot starve drawing and key
    /// handling; the rest waits for the next tick. Returns the disconnect
    /// reason if the connection went away.
    pub(crate) fn drain_events(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    ) -> Option<String> {
        let started = Instant::now();
        let mut redraw = false;
        let mut disconnected = None;

        for _ in 0..MAX_EVENTS_PER_TICK {
            let Ok(event) = rx.try_recv() else { break };
            match event {
                ClientEvent::Message(data) => {
                    let effects = self.session.handle_message(&data);
                    redraw |= self.apply(effects);
                }
                ClientEvent::Disconnected(reason) => {
                    disconnected = Some(reason);
                    break;
                }
            }
            if started.elapsed() >= TICK_BUDGET {
                break;
            }
        }

        if redraw {
            self.refresh_frame();
        }
        disconnected
    }

    /// Act on session effects; returns whether the surface needs a redraw.
    pub(crate) fn apply(&mut self, effects: Vec<Effect>) -> bool {
        let mut redraw = false;
        for effect in effects {
            match effect {
                Effect::Redraw { reallocated } => {
                    if reallocated {
                        log::debug!("Pixel buffer reallocated");
                    }
                    redraw = true;
                }
                Effect::Send(command) => self.send(command),
                Effect::Log(_) => {}
            }
        }
        redraw
    }

    /// Fire-and-forget. While the connect is in flight control values are
    /// only stored and go out when the socket opens.
    fn send(&mut self, command: Command) {
        match &self.link {
            LinkState::Open(tx) => {
                if tx.send(command).is_err() {
                    self.session.report(&"Send failed: connection closed");
                }
            }
            LinkState::Connecting if matches!(command, Command::Set(..)) => {
                self.status = "Not connected yet, value will be sent on connect".to_string();
            }
            LinkState::Connecting | LinkState::Closed => {
                self.session.report(&format!("Not connected, dropped {}", command.to_wire()));
            }
        }
    }

    /// Rebuild the displayed bitmap from the pixel surface
    fn refresh_frame(&mut self) {
        let surface = self.session.surface();
        let size = Size::new(surface.width(), surface.height());
        if let Some(image) = surface.to_image() {
            self.frame_size = size;
            // Drops the previous frame's protocol
            self.frame_protocol = Some(self.picker.new_resize_protocol(image));
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true;
            }
            KeyCode::Esc if self.input.is_empty() => {
                self.quit = true;
            }
            KeyCode::Esc => {
                self.input.clear();
                self.cursor = 0;
            }
            KeyCode::F(5) => {
                self.fullscreen = !self.fullscreen;
            }
            KeyCode::Char(c) => {
                self.input.insert(self.cursor, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.input.remove(self.cursor);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.input.len() {
                    self.input.remove(self.cursor);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.cursor < self.input.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.input.len();
            }
            KeyCode::Enter => {
                if !self.input.is_empty() {
                    let text: String = self.input.iter().collect();
                    self.input.clear();
                    self.cursor = 0;
                    self.handle_input(&text);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlKind, ControlValue};
    use crate::frame::PixelFormat;
    use crate::protocol::{CaptureStatus, ControlValues, PreviewPacket, ServerPacket};
    use crate::session::LogLevel;
    use ratatui::layout::Rect;

    fn viewer() -> ViewerUI {
        ViewerUI::new("ws://test/ws".to_string(), Picker::halfblocks(), 10)
    }

    fn preview(w: u32, h: u32) -> Vec<u8> {
        ServerPacket::Preview(PreviewPacket {
            w,
            h,
            pix: PixelFormat::Rgb.code(),
            img: vec![90; (w * h * 3) as usize],
            controls: ControlValues::default(),
        })
        .encode()
        .unwrap()
    }

    fn status(captured: u32) -> Vec<u8> {
        ServerPacket::CaptureStatus(CaptureStatus {
            captured_frames: captured,
            total_frames: 100,
        })
        .encode()
        .unwrap()
    }

    fn pending(rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> usize {
        std::iter::from_fn(|| rx.try_recv().ok()).count()
    }

    #[test]
    fn test_drain_stops_after_tick_limit() {
        let mut ui = viewer();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queued = MAX_EVENTS_PER_TICK * 3;
        for i in 0..queued {
            tx.send(ClientEvent::Message(status(i as u32))).unwrap();
        }

        assert_eq!(ui.drain_events(&mut rx), None);

        // The rest is left for later ticks
        let left = pending(&mut rx);
        assert!(left >= queued - MAX_EVENTS_PER_TICK);
        assert!(left < queued);
    }

    #[test]
    fn test_drain_refreshes_frame_once_per_batch() {
        let mut ui = viewer();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ClientEvent::Message(preview(4, 2))).unwrap();
        tx.send(ClientEvent::Message(preview(4, 2))).unwrap();

        ui.drain_events(&mut rx);
        assert!(ui.frame_protocol.is_some());
        assert_eq!(ui.frame_size, Size::new(4, 2));
        assert_eq!(ui.session.debug().frames, 2);
    }

    #[test]
    fn test_drain_reports_disconnect() {
        let mut ui = viewer();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ClientEvent::Message(status(1))).unwrap();
        tx.send(ClientEvent::Disconnected("Connection closed".to_string()))
            .unwrap();
        tx.send(ClientEvent::Message(status(2))).unwrap();

        assert_eq!(ui.drain_events(&mut rx), Some("Connection closed".to_string()));
        assert_eq!(ui.session.log().latest().unwrap().text, "Captured 1 / 100 frames");
    }

    #[test]
    fn test_preview_target_is_centered_in_picker_cells() {
        let mut ui = viewer();
        let (font_w, font_h) = ui.picker.font_size();
        // A square area in pixels
        let area = Rect::new(0, 0, 10 * font_h, 10 * font_w);

        ui.frame_size = Size::new(1920, 1080);
        let target = ui.preview_target(area);
        assert_eq!(target.width, area.width);
        assert!(target.height < area.height);
        assert_eq!(target.y, (area.height - target.height) / 2);

        ui.frame_size = Size::new(400, 800);
        let target = ui.preview_target(area);
        assert_eq!(target.height, area.height);
        assert_eq!(target.width, area.width / 2);
        assert_eq!(target.x, (area.width - target.width) / 2);
    }

    #[test]
    fn test_values_held_only_while_connecting() {
        let mut ui = viewer();
        ui.handle_input("/gain 150");
        assert!(ui.status.contains("sent on connect"));
        assert_eq!(
            ui.session.controls().value(ControlKind::Gain),
            Some(ControlValue::Int(150))
        );

        ui.link = LinkState::Closed;
        ui.handle_input("/gain 160");
        let entry = ui.session.log().latest().unwrap();
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.text, "Not connected, dropped SET_GAIN:160");
    }

    #[test]
    fn test_send_after_channel_closed_is_reported() {
        let mut ui = viewer();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ui.link = LinkState::Open(tx);

        ui.handle_input("/switch");
        let entry = ui.session.log().latest().unwrap();
        assert_eq!(entry.level, LogLevel::Error);
        assert!(entry.text.starts_with("Send failed"));
    }
}
