use clap::{Parser, Subcommand};

use crate::frame::PixelFormat;

#[derive(Parser)]
#[command(name = "asiview")]
#[command(about = "Terminal viewer for a WebSocket camera preview stream", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to a camera server and show its preview
    View {
        /// Server origin (host:port) or full ws:// URL
        #[arg(short, long, default_value = "localhost:3000")]
        server: String,

        /// Force a terminal graphics protocol (sixel, kitty, iterm2, halfblocks)
        #[arg(short, long)]
        graphics: Option<String>,

        /// Frames requested by /capture when no count is given
        #[arg(short, long, default_value_t = 10)]
        capture_frames: u32,

        /// Log file (the terminal is taken by the viewer)
        #[arg(short, long, default_value = "~/.asiview/viewer.log")]
        log_file: String,
    },

    /// Serve a synthetic test pattern over the same protocol
    Pattern {
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        addr: String,

        #[arg(long, default_value_t = 640)]
        width: u32,

        #[arg(long, default_value_t = 360)]
        height: u32,

        #[arg(long, default_value_t = 10)]
        fps: u32,

        /// Initial pixel format (bgr, rgb, raw8)
        #[arg(short, long, default_value = "bgr")]
        format: PixelFormat,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_defaults() {
        let cli = Cli::try_parse_from(["asiview", "view"]).unwrap();
        match cli.command {
            Commands::View {
                server,
                graphics,
                capture_frames,
                ..
            } => {
                assert_eq!(server, "localhost:3000");
                assert!(graphics.is_none());
                assert_eq!(capture_frames, 10);
            }
            _ => panic!("expected view"),
        }
    }

    #[test]
    fn test_pattern_format_parses() {
        let cli = Cli::try_parse_from(["asiview", "pattern", "--format", "raw8", "--fps", "30"]).unwrap();
        match cli.command {
            Commands::Pattern { format, fps, .. } => {
                assert_eq!(format, PixelFormat::Raw8);
                assert_eq!(fps, 30);
            }
            _ => panic!("expected pattern"),
        }
        assert!(Cli::try_parse_from(["asiview", "pattern", "--format", "yuv"]).is_err());
    }
}
