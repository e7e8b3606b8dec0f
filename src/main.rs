mod cli;
mod client;
mod control;
mod error;
mod frame;
mod pattern;
mod present;
mod protocol;
mod session;
mod tui;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::View {
            server,
            graphics,
            capture_frames,
            log_file,
        } => {
            let log_path = expand_path(&log_file);
            init_logging(Some(&log_path))?;
            start_viewer(&server, graphics.as_deref(), capture_frames).await?;
        }
        Commands::Pattern {
            addr,
            width,
            height,
            fps,
            format,
        } => {
            init_logging(None)?;
            let config = pattern::PatternConfig {
                width,
                height,
                fps,
                format,
            };
            pattern::PatternServer::new(addr, config).run().await?;
        }
    }

    Ok(())
}

async fn start_viewer(server: &str, graphics: Option<&str>, capture_frames: u32) -> Result<()> {
    let url = control::resolve_endpoint(server)?;
    println!("Connecting to {}", url);

    // Graphics detection talks to the terminal, so it runs before the TUI
    let picker = tui::create_picker(graphics);

    let client = client::ViewerClient::new(url.clone());
    let mut ui = tui::ViewerUI::new(url, picker, capture_frames);
    ui.run(client).await
}

/// `RUST_LOG` wins; otherwise info for this crate. With a path, output goes
/// to that file instead of stderr.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("asiview=info"));

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    let _ = builder.try_init();
    Ok(())
}

fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            let mut buf = PathBuf::from(home);
            buf.push(stripped);
            return buf;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/tmp/x.log"), PathBuf::from("/tmp/x.log"));
        assert_eq!(expand_path("rel/x.png"), PathBuf::from("rel/x.png"));
    }

    #[test]
    fn test_init_logging_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("viewer.log");
        init_logging(Some(&path)).unwrap();
        assert!(path.exists());
    }
}
