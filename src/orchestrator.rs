use crossbeam_channel::Sender;

use crate::api;
use crate::app::{ChatTurn, WorkerEvent};
use crate::config::Config;

/// Work handed off to a background thread. Everything that touches the
/// network goes through here; the UI thread only sends and polls.
#[derive(Clone, Debug)]
pub(crate) enum Request {
    Chat {
        query: String,
        history: Vec<ChatTurn>,
        knowledge_base: Option<String>,
    },
    Knowledge(KnowledgeCommand),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum KnowledgeCommand {
    List,
    Create(String),
    Delete(String),
    Info(String),
    Upload { name: String, paths: Vec<String> },
}

pub(crate) fn execute_request(cfg: Config, request: Request, tx: Sender<WorkerEvent>) {
    match request {
        Request::Chat {
            query,
            history,
            knowledge_base,
        } => {
            match api::chat::run_stream(&cfg, &query, &history, knowledge_base.as_deref(), &tx) {
                Ok(()) => {
                    let _ = tx.send(WorkerEvent::Done(String::new()));
                }
                Err(err) => {
                    let _ = tx.send(WorkerEvent::Error(err));
                }
            }
        }
        Request::Knowledge(command) => match execute_knowledge_command(&cfg, command, &tx) {
            Ok(text) => {
                let _ = tx.send(WorkerEvent::Done(text));
            }
            Err(err) => {
                let _ = tx.send(WorkerEvent::Error(err));
            }
        },
    }
}

fn execute_knowledge_command(
    cfg: &Config,
    command: KnowledgeCommand,
    tx: &Sender<WorkerEvent>,
) -> std::result::Result<String, String> {
    match command {
        KnowledgeCommand::List => {
            let bases = api::knowledge::list(cfg)?;
            let text = if bases.is_empty() {
                "no knowledge bases yet. create one with /kb create <name>".to_string()
            } else {
                let mut lines = vec!["knowledge bases".to_string()];
                for base in &bases {
                    lines.push(format!("  {}", base.name));
                }
                lines.join("\n")
            };
            let _ = tx.send(WorkerEvent::KnowledgeBases(bases));
            Ok(text)
        }
        KnowledgeCommand::Create(name) => api::knowledge::create(cfg, &name),
        KnowledgeCommand::Delete(name) => api::knowledge::delete(cfg, &name),
        KnowledgeCommand::Info(name) => {
            let info = api::knowledge::info(cfg, &name)?;
            Ok(format!(
                "{}\n  documents: {}\n  created: {}",
                info.name,
                info.document_count,
                format_epoch_secs(info.created_at)
            ))
        }
        KnowledgeCommand::Upload { name, paths } => api::knowledge::upload(cfg, &name, &paths),
    }
}

/// Render a backend creation time (fractional seconds since the Unix epoch)
/// as a readable UTC timestamp.
fn format_epoch_secs(secs: f64) -> String {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn help_text() -> String {
    [
        "commands",
        "",
        "conversation",
        "  /help",
        "  /clear",
        "  /exit",
        "",
        "knowledge bases",
        "  /kb list",
        "  /kb create <name>",
        "  /kb delete <name>",
        "  /kb info <name>",
        "  /kb upload <name> <file> [file...]",
        "  /kb use <name>   answer from this base",
        "  /kb off          back to plain chat",
        "",
        "visibility",
        "  /theme [fjord|graphite|ember]",
        "",
        "keys",
        "  Enter send | Shift+Enter newline | PgUp/PgDn scroll",
        "  Ctrl+R history search | Esc cancel a running reply",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_seconds_render_as_utc_timestamp() {
        assert_eq!(format_epoch_secs(1723456789.5), "2024-08-12 09:59 UTC");
        assert_eq!(format_epoch_secs(0.0), "1970-01-01 00:00 UTC");
        assert_eq!(format_epoch_secs(f64::MAX), "unknown");
    }

    #[test]
    fn help_text_covers_knowledge_commands() {
        let text = help_text();
        assert!(text.contains("/kb list"));
        assert!(text.contains("/kb upload <name> <file> [file...]"));
        assert!(text.contains("/kb off"));
    }
}
