//! Viewer state and message dispatch.
//!
//! `ViewerSession` owns everything a running viewer mutates: the pixel
//! surface, the control fields, the log panel and the debug counters. Server
//! messages and user input go in, and a list of [`Effect`]s comes out for the
//! shell to act on (redraw the output surface, send a command). Nothing here
//! touches the socket or the terminal.

mod log_panel;

pub use log_panel::{LogLevel, LogPanel, LOG_CAPACITY};

use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::control::{Command, ControlKind, ControlPanel};
use crate::error::ViewerError;
use crate::frame::surface::PixelSurface;
use crate::frame::PixelFormat;
use crate::protocol::{CaptureStatus, ControlValues, PreviewPacket, ServerPacket};

/// Side effects requested by the session
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The pixel surface holds a new frame and the output must be redrawn
    Redraw { reallocated: bool },
    /// Send this command to the server
    Send(Command),
    /// A line was appended to the log panel
    Log(String),
}

/// Counters shown in the debug panel
#[derive(Debug, Clone, Default)]
pub struct DebugStats {
    pub frames: u64,
    pub dropped: u64,
    pub last_decode: Duration,
    pub last_expand: Duration,
    pub last_format: Option<PixelFormat>,
    pub device_controls: Option<ControlValues>,
    pub capture: Option<CaptureStatus>,
}

#[derive(Debug, Default)]
pub struct ViewerSession {
    surface: PixelSurface,
    controls: ControlPanel,
    log: LogPanel,
    debug: DebugStats,
}

impl ViewerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn controls(&self) -> &ControlPanel {
        &self.controls
    }

    pub fn log(&self) -> &LogPanel {
        &self.log
    }

    pub fn debug(&self) -> &DebugStats {
        &self.debug
    }

    /// Handle one binary socket message. Errors never escape: they are
    /// reported and the message is skipped.
    pub fn handle_message(&mut self, data: &[u8]) -> Vec<Effect> {
        let started = Instant::now();
        let result = ServerPacket::decode(data)
            .map_err(ViewerError::from)
            .and_then(|packet| {
                self.debug.last_decode = started.elapsed();
                self.dispatch(packet)
            });

        match result {
            Ok(effects) => effects,
            Err(err) => {
                self.debug.dropped += 1;
                vec![self.report(&err)]
            }
        }
    }

    /// Apply a decoded packet.
    pub fn dispatch(&mut self, packet: ServerPacket) -> Result<Vec<Effect>, ViewerError> {
        match packet {
            ServerPacket::Preview(preview) => self.apply_preview(preview),
            ServerPacket::CaptureStatus(status) => {
                self.debug.capture = Some(status);
                let line = format!(
                    "Captured {} / {} frames",
                    status.captured_frames, status.total_frames
                );
                Ok(vec![self.info(line)])
            }
        }
    }

    fn apply_preview(&mut self, preview: PreviewPacket) -> Result<Vec<Effect>, ViewerError> {
        let format = PixelFormat::try_from(preview.pix)?;

        let started = Instant::now();
        let update = self
            .surface
            .accept(format, preview.w, preview.h, &preview.img)?;
        self.debug.last_expand = started.elapsed();

        self.debug.frames += 1;
        self.debug.last_format = Some(format);
        self.debug.device_controls = Some(preview.controls);
        self.controls.sync_from(&preview.controls);

        if update.reallocated {
            log::info!(
                "Surface resized to {}x{} ({})",
                preview.w,
                preview.h,
                format
            );
        }

        Ok(vec![Effect::Redraw {
            reallocated: update.reallocated,
        }])
    }

    /// The socket opened: send whatever the user already filled in.
    pub fn connected(&mut self, url: &str) -> Vec<Effect> {
        let mut effects = vec![self.info(format!("Connected to {}", url))];
        effects.extend(self.controls.outstanding().into_iter().map(Effect::Send));
        effects
    }

    /// A control field changed.
    pub fn input(&mut self, kind: ControlKind, raw: &str) -> Vec<Effect> {
        match self.controls.input(kind, raw) {
            Ok(command) => vec![Effect::Send(command)],
            Err(err) => vec![self.report(&err)],
        }
    }

    pub fn command(&mut self, command: Command) -> Vec<Effect> {
        vec![Effect::Send(command)]
    }

    /// Status line from the transport or the shell
    pub fn info(&mut self, text: impl Into<String>) -> Effect {
        let text = text.into();
        log::info!("{}", text);
        self.log.push(LogLevel::Info, text.clone());
        Effect::Log(text)
    }

    /// The error sink: every recoverable failure ends up here.
    pub fn report(&mut self, err: &dyn Display) -> Effect {
        let text = err.to_string();
        log::warn!("{}", text);
        self.log.push(LogLevel::Error, text.clone());
        Effect::Log(text)
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}
