use super::*;
use crossbeam_channel::unbounded;

use crate::orchestrator::{self, KnowledgeCommand, Request};

/// Outcome of parsing a /kb invocation. `Use` and `Off` only mutate local
/// state; the rest go to a worker thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum KbAction {
    Use(String),
    Off,
    Remote(KnowledgeCommand),
}

/// Strip a slash-command name, matching only at a word boundary so that
/// `/themeember` or `/kbx` fall through to the unknown-command path.
fn strip_command<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

pub(crate) fn parse_kb_command(args: &str) -> std::result::Result<KbAction, String> {
    let mut parts = args.split_whitespace();
    let sub = parts.next().unwrap_or("");
    match sub {
        "" | "list" => {
            if parts.next().is_some() {
                return Err("usage: /kb list".to_string());
            }
            Ok(KbAction::Remote(KnowledgeCommand::List))
        }
        "create" | "delete" | "info" | "use" => {
            let Some(name) = parts.next() else {
                return Err(format!("usage: /kb {sub} <name>"));
            };
            if parts.next().is_some() {
                return Err(format!("usage: /kb {sub} <name>"));
            }
            let name = name.to_string();
            Ok(match sub {
                "create" => KbAction::Remote(KnowledgeCommand::Create(name)),
                "delete" => KbAction::Remote(KnowledgeCommand::Delete(name)),
                "info" => KbAction::Remote(KnowledgeCommand::Info(name)),
                _ => KbAction::Use(name),
            })
        }
        "upload" => {
            let Some(name) = parts.next() else {
                return Err("usage: /kb upload <name> <file> [file...]".to_string());
            };
            let paths: Vec<String> = parts.map(|p| p.to_string()).collect();
            if paths.is_empty() {
                return Err("usage: /kb upload <name> <file> [file...]".to_string());
            }
            Ok(KbAction::Remote(KnowledgeCommand::Upload {
                name: name.to_string(),
                paths,
            }))
        }
        "off" | "none" => {
            if parts.next().is_some() {
                return Err("usage: /kb off".to_string());
            }
            Ok(KbAction::Off)
        }
        _ => Err("usage: /kb [list|create|delete|info|upload|use|off]".to_string()),
    }
}

impl App {
    pub(super) fn submit_current_line(&mut self) {
        let typed_line = self.input.trim().to_string();
        if typed_line.is_empty() {
            return;
        }

        if typed_line == "/exit" || typed_line == "/quit" {
            self.should_quit = true;
            return;
        }

        if self.running {
            let msg = "a request is running, wait or press Esc to cancel";
            if !self.last_system_entry_is(msg) {
                self.push_entry(EntryKind::System, msg);
            }
            return;
        }

        if typed_line == "/clear" {
            self.entries.clear();
            self.chat_turns.clear();
            self.invalidate_render_cache();
            self.needs_screen_clear = true;
            self.clear_input_buffer();
            self.last_status = "cleared".to_string();
            return;
        }

        if typed_line == "/help" {
            self.history.push(typed_line);
            self.history_pos = None;
            self.push_entry(EntryKind::System, orchestrator::help_text());
            self.clear_input_buffer();
            return;
        }

        if let Some(rest) = strip_command(&typed_line, "/theme") {
            let rest = rest.trim().to_string();
            self.handle_theme_change(&rest);
            self.clear_input_buffer();
            return;
        }

        if let Some(rest) = strip_command(&typed_line, "/kb") {
            let rest = rest.trim().to_string();
            self.history.push(typed_line.clone());
            self.history_pos = None;
            self.handle_kb_command(&typed_line, &rest);
            self.clear_input_buffer();
            return;
        }

        if typed_line.starts_with('/') {
            self.push_entry(EntryKind::Error, "unknown command. use /help");
            self.clear_input_buffer();
            return;
        }

        self.history.push(typed_line.clone());
        self.history_pos = None;

        let query = self.consume_pending_pastes(&typed_line);
        self.push_entry(EntryKind::User, typed_line);
        self.push_entry(EntryKind::Assistant, THINKING_PLACEHOLDER.to_string());
        self.assistant_idx = Some(self.entries.len() - 1);
        self.autoscroll = true;
        self.scroll = self.scroll_max();
        self.clear_input_buffer();

        let request = Request::Chat {
            query: query.clone(),
            history: self.history_payload(),
            knowledge_base: self.active_kb.clone(),
        };
        self.pending_query = Some(query);
        let run_target = self
            .active_kb
            .as_deref()
            .map(|kb| format!("chat ({kb})"))
            .unwrap_or_else(|| "chat".to_string());
        self.last_status = format!("asking {run_target}");
        self.spawn_request(request, run_target);
    }

    fn handle_kb_command(&mut self, typed_line: &str, args: &str) {
        let action = match parse_kb_command(args) {
            Ok(action) => action,
            Err(usage) => {
                self.push_entry(EntryKind::Error, usage);
                return;
            }
        };

        match action {
            KbAction::Use(name) => {
                self.active_kb = Some(name.clone());
                self.invalidate_render_cache();
                self.push_entry(EntryKind::System, format!("answering from: {name}"));
                self.last_status = format!("kb {name}");
            }
            KbAction::Off => {
                self.active_kb = None;
                self.invalidate_render_cache();
                self.push_entry(EntryKind::System, "knowledge base off, plain chat");
                self.last_status = "kb off".to_string();
            }
            KbAction::Remote(command) => {
                // Deleting the selected base also deselects it.
                if let KnowledgeCommand::Delete(name) = &command {
                    if self.active_kb.as_deref() == Some(name.as_str()) {
                        self.active_kb = None;
                    }
                }
                self.push_entry(EntryKind::User, typed_line.to_string());
                self.push_entry(EntryKind::Assistant, THINKING_PLACEHOLDER.to_string());
                self.assistant_idx = Some(self.entries.len() - 1);
                self.autoscroll = true;
                self.scroll = self.scroll_max();
                self.last_status = "knowledge request".to_string();
                self.spawn_request(Request::Knowledge(command), "knowledge".to_string());
            }
        }
    }

    fn spawn_request(&mut self, request: Request, run_target: String) {
        let cfg = self.config.clone();
        let (tx, rx) = unbounded::<WorkerEvent>();
        std::thread::spawn(move || orchestrator::execute_request(cfg, request, tx));
        self.start_running_state(run_target, rx);
    }

    pub(super) fn handle_theme_change(&mut self, target: &str) {
        if target.is_empty() {
            self.push_entry(
                EntryKind::System,
                format!(
                    "theme: {} | options: fjord, graphite, ember",
                    self.theme.as_str()
                ),
            );
            return;
        }
        let Some(theme) = ThemePreset::parse(target) else {
            self.push_entry(EntryKind::Error, "usage: /theme [fjord|graphite|ember]");
            return;
        };
        self.theme = theme;
        self.invalidate_render_cache();
        self.last_status = format!("theme {}", self.theme.as_str());
        self.push_entry(
            EntryKind::System,
            format!("theme set to {}", self.theme.as_str()),
        );
    }
}
