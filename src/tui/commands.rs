use crate::control::{Command, ControlKind};
use crate::session::Effect;

use super::ViewerUI;

const HELP: &str =
    "/gain <n> /exposure <ms> /wbr <n> /wbb <n> /switch /capture [n] /snapshot <path> /full /clear /quit";

impl ViewerUI {
    pub(crate) fn handle_input(&mut self, text: &str) {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            self.status = "Commands start with / (try /help)".to_string();
            return;
        };
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let Some((&name, args)) = parts.split_first() else {
            self.status = "Empty command".to_string();
            return;
        };

        if let Some(kind) = ControlKind::from_command(name) {
            match args.first() {
                Some(value) => {
                    let effects = self.session.input(kind, value);
                    if effects.iter().any(|e| matches!(e, Effect::Send(_))) {
                        self.status = format!("{} -> {}", kind.label(), value);
                    }
                    self.apply(effects);
                }
                None => self.status = format!("Usage: /{} <value>", name),
            }
            return;
        }

        match name {
            "switch" => {
                let effects = self.session.command(Command::SwitchOutput);
                self.apply(effects);
                self.status = "Switching output".to_string();
            }
            "capture" => {
                let frames = match args.first() {
                    Some(n) => match n.parse::<u32>() {
                        Ok(n) => n,
                        Err(_) => {
                            self.status = "Usage: /capture [frames]".to_string();
                            return;
                        }
                    },
                    None => self.capture_frames,
                };
                let effects = self.session.command(Command::StartCapture(frames));
                self.apply(effects);
                self.status = format!("Capture of {} frames requested", frames);
            }
            "snapshot" => {
                if args.is_empty() {
                    self.status = "Usage: /snapshot <path>".to_string();
                    return;
                }
                let path = crate::expand_path(&args.join(" "));
                match self.session.surface().save_snapshot(&path) {
                    Ok(()) => {
                        self.session.info(format!("Saved snapshot to {}", path.display()));
                    }
                    Err(e) => {
                        self.session.report(&format!("{:#}", e));
                    }
                }
            }
            "full" | "fullscreen" => {
                self.fullscreen = !self.fullscreen;
            }
            "clear" => {
                self.session.clear_log();
            }
            "help" => {
                self.status = HELP.to_string();
            }
            "quit" | "exit" => {
                self.quit = true;
            }
            _ => {
                self.status = format!("Unknown command: /{}", name);
            }
        }
    }
}
