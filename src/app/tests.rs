use super::*;
use crossbeam_channel::unbounded;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::orchestrator::KnowledgeCommand;

fn app() -> App {
    App::new(Config::default())
}

fn app_with_entries(n: usize) -> App {
    let mut app = app();
    for i in 0..n {
        app.push_entry(EntryKind::System, format!("entry {i}"));
    }
    app
}

fn start_chat_run(app: &mut App, query: &str) -> crossbeam_channel::Sender<WorkerEvent> {
    app.push_entry(EntryKind::User, query.to_string());
    app.push_entry(EntryKind::Assistant, THINKING_PLACEHOLDER.to_string());
    app.assistant_idx = Some(app.entries.len() - 1);
    app.pending_query = Some(query.to_string());
    let (tx, rx) = unbounded::<WorkerEvent>();
    app.start_running_state("chat".to_string(), rx);
    tx
}

#[test]
fn pageup_disables_autoscroll_and_moves_up() {
    let mut app = app_with_entries(40);
    let before = app.scroll;
    app.handle_key(KeyEvent::new(KeyCode::PageUp, KeyModifiers::NONE));

    assert!(!app.autoscroll);
    assert_eq!(app.scroll, before.saturating_sub(5));
}

#[test]
fn pagedown_near_bottom_reenables_autoscroll() {
    let mut app = app_with_entries(40);
    let max = app.scroll_max();
    app.autoscroll = false;
    app.scroll = max.saturating_sub(1);

    app.handle_key(KeyEvent::new(KeyCode::PageDown, KeyModifiers::NONE));

    assert_eq!(app.scroll, max);
    assert!(app.autoscroll);
}

#[test]
fn new_entries_do_not_force_scroll_when_autoscroll_off() {
    let mut app = app_with_entries(20);
    app.autoscroll = false;
    app.scroll = 3;
    app.push_entry(EntryKind::System, "extra");

    assert_eq!(app.scroll, 3);
}

#[test]
fn new_entries_follow_bottom_when_autoscroll_on() {
    let mut app = app_with_entries(20);
    app.autoscroll = true;
    app.push_entry(EntryKind::System, "extra");

    let max = app.scroll_max();
    assert_eq!(app.scroll, max);
}

#[test]
fn first_chunk_replaces_placeholder_then_appends() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "hello");

    tx.send(WorkerEvent::Chunk("The answer".to_string()))
        .expect("send first chunk");
    tx.send(WorkerEvent::Chunk(" continues".to_string()))
        .expect("send second chunk");

    assert!(app.poll_worker());
    let idx = app.assistant_idx.expect("assistant entry");
    assert_eq!(app.entries[idx].text, "The answer continues");
    assert!(app.stream_had_chunk);
    assert_eq!(app.streamed_chars, "The answer continues".chars().count());
}

#[test]
fn chunk_strips_ansi_escapes() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "hello");

    tx.send(WorkerEvent::Chunk(
        "\u{1b}[31mred\u{1b}[0m text".to_string(),
    ))
    .expect("send chunk");

    assert!(app.poll_worker());
    let idx = app.assistant_idx.expect("assistant entry");
    assert_eq!(app.entries[idx].text, "red text");
}

#[test]
fn done_without_chunks_uses_final_text() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "hello");
    let idx = app.assistant_idx.expect("assistant entry");

    tx.send(WorkerEvent::Done("full reply".to_string()))
        .expect("send done");

    assert!(app.poll_worker());
    assert_eq!(app.entries[idx].text, "full reply");
    assert!(app.entries[idx].elapsed_secs.is_some());
    assert!(!app.running);
    assert!(app.last_status.starts_with("done"));
}

#[test]
fn done_without_any_output_marks_no_output() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "hello");
    let idx = app.assistant_idx.expect("assistant entry");

    tx.send(WorkerEvent::Done(String::new()))
        .expect("send done");

    assert!(app.poll_worker());
    assert_eq!(app.entries[idx].text, "(no output)");
    assert!(app.chat_turns.is_empty());
}

#[test]
fn done_records_finished_exchange_in_context() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "what is rust");

    tx.send(WorkerEvent::Chunk("a language".to_string()))
        .expect("send chunk");
    tx.send(WorkerEvent::Done(String::new()))
        .expect("send done");

    assert!(app.poll_worker());
    assert_eq!(app.chat_turns.len(), 2);
    assert_eq!(app.chat_turns[0].role, "user");
    assert_eq!(app.chat_turns[0].content, "what is rust");
    assert_eq!(app.chat_turns[1].role, "assistant");
    assert_eq!(app.chat_turns[1].content, "a language");
}

#[test]
fn error_preserves_partial_streamed_text() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "hello");
    let idx = app.assistant_idx.expect("assistant entry");

    tx.send(WorkerEvent::Chunk("partial ".to_string()))
        .expect("send chunk");
    tx.send(WorkerEvent::Error("connection reset".to_string()))
        .expect("send error");

    assert!(app.poll_worker());
    assert_eq!(app.entries[idx].text, "partial ");
    let last = app.entries.last().expect("error entry");
    assert!(matches!(last.kind, EntryKind::Error));
    assert_eq!(last.text, "connection reset");
    assert!(!app.running);
}

#[test]
fn error_on_bare_placeholder_marks_failed() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "hello");
    let idx = app.assistant_idx.expect("assistant entry");

    tx.send(WorkerEvent::Error("server returned 500".to_string()))
        .expect("send error");

    assert!(app.poll_worker());
    assert_eq!(app.entries[idx].text, "(failed)");
    assert!(app.chat_turns.is_empty());
}

#[test]
fn disconnected_worker_marks_entry() {
    let mut app = app();
    let tx = start_chat_run(&mut app, "hello");
    let idx = app.assistant_idx.expect("assistant entry");
    drop(tx);

    assert!(app.poll_worker());
    assert_eq!(app.entries[idx].text, "(disconnected)");
    assert!(!app.running);
    assert_eq!(app.last_status, "disconnected");
}

#[test]
fn knowledge_bases_event_updates_known_list() {
    let mut app = app();
    let (tx, rx) = unbounded::<WorkerEvent>();
    app.start_running_state("knowledge".to_string(), rx);

    tx.send(WorkerEvent::KnowledgeBases(vec![
        KnowledgeBase {
            name: "notes".to_string(),
        },
        KnowledgeBase {
            name: "papers".to_string(),
        },
    ]))
    .expect("send bases");

    assert!(app.poll_worker());
    assert_eq!(app.known_bases, vec!["notes", "papers"]);
}

#[test]
fn esc_cancels_running_request() {
    let mut app = app();
    let _tx = start_chat_run(&mut app, "hello");
    let idx = app.assistant_idx.expect("assistant entry");

    app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));

    assert!(!app.running);
    assert_eq!(app.entries[idx].text, "(cancelled)");
    let last = app.entries.last().expect("cancel notice");
    assert!(matches!(last.kind, EntryKind::System));
    assert!(last.text.contains("Esc"));
}

#[test]
fn running_submit_hint_is_not_duplicated() {
    let mut app = app();
    let _tx = start_chat_run(&mut app, "first");
    app.input = "second".to_string();
    app.cursor = app.input.len();

    app.submit_current_line();
    app.input = "second".to_string();
    app.cursor = app.input.len();
    app.submit_current_line();

    let wait_count = app
        .entries
        .iter()
        .filter(|entry| {
            matches!(entry.kind, EntryKind::System)
                && entry.text.contains("a request is running")
        })
        .count();
    assert_eq!(wait_count, 1);
}

#[test]
fn clear_command_resets_transcript_and_context() {
    let mut app = app();
    app.chat_turns.push(ChatTurn::user("q"));
    app.chat_turns.push(ChatTurn::assistant("a"));
    app.input = "/clear".to_string();
    app.cursor = app.input.len();

    app.submit_current_line();

    assert!(app.entries.is_empty());
    assert!(app.chat_turns.is_empty());
    assert!(app.needs_screen_clear);
}

#[test]
fn unknown_slash_command_reports_error() {
    let mut app = app();
    app.input = "/frobnicate".to_string();
    app.cursor = app.input.len();

    app.submit_current_line();

    let last = app.entries.last().expect("error entry");
    assert!(matches!(last.kind, EntryKind::Error));
    assert!(last.text.contains("/help"));
}

#[test]
fn command_names_only_match_at_word_boundaries() {
    let mut app = app();
    app.input = "/themeember".to_string();
    app.cursor = app.input.len();
    app.submit_current_line();

    let last = app.entries.last().expect("error entry");
    assert!(matches!(last.kind, EntryKind::Error));
    assert!(last.text.contains("unknown command"));
    assert_eq!(app.theme.as_str(), "graphite");

    app.input = "/kbx".to_string();
    app.cursor = app.input.len();
    app.submit_current_line();

    let last = app.entries.last().expect("error entry");
    assert!(matches!(last.kind, EntryKind::Error));
    assert!(last.text.contains("unknown command"));
}

#[test]
fn kb_use_selects_base_locally() {
    let mut app = app();
    app.input = "/kb use notes".to_string();
    app.cursor = app.input.len();

    app.submit_current_line();

    assert_eq!(app.active_kb.as_deref(), Some("notes"));
    assert!(!app.running);
    let last = app.entries.last().expect("system entry");
    assert!(last.text.contains("notes"));
}

#[test]
fn kb_off_clears_selection() {
    let mut app = app();
    app.active_kb = Some("notes".to_string());
    app.input = "/kb off".to_string();
    app.cursor = app.input.len();

    app.submit_current_line();

    assert!(app.active_kb.is_none());
    assert!(!app.running);
}

#[test]
fn kb_delete_of_selected_base_deselects_it() {
    let mut app = app();
    app.active_kb = Some("notes".to_string());
    app.input = "/kb delete notes".to_string();
    app.cursor = app.input.len();

    app.submit_current_line();

    assert!(app.active_kb.is_none());
}

#[test]
fn chat_submit_includes_selected_base_in_target() {
    let mut app = app();
    app.active_kb = Some("notes".to_string());
    app.input = "what do my notes say".to_string();
    app.cursor = app.input.len();

    app.submit_current_line();

    assert!(app.running);
    assert_eq!(app.run_target, "chat (notes)");
    assert_eq!(app.pending_query.as_deref(), Some("what do my notes say"));
}

#[test]
fn parse_kb_command_variants() {
    assert_eq!(
        parse_kb_command(""),
        Ok(KbAction::Remote(KnowledgeCommand::List))
    );
    assert_eq!(
        parse_kb_command("list"),
        Ok(KbAction::Remote(KnowledgeCommand::List))
    );
    assert_eq!(
        parse_kb_command("create docs"),
        Ok(KbAction::Remote(KnowledgeCommand::Create(
            "docs".to_string()
        )))
    );
    assert_eq!(
        parse_kb_command("use docs"),
        Ok(KbAction::Use("docs".to_string()))
    );
    assert_eq!(parse_kb_command("off"), Ok(KbAction::Off));
    assert_eq!(
        parse_kb_command("upload docs a.txt b.txt"),
        Ok(KbAction::Remote(KnowledgeCommand::Upload {
            name: "docs".to_string(),
            paths: vec!["a.txt".to_string(), "b.txt".to_string()],
        }))
    );
}

#[test]
fn parse_kb_command_rejects_bad_usage() {
    assert!(parse_kb_command("create").is_err());
    assert!(parse_kb_command("delete one two").is_err());
    assert!(parse_kb_command("upload docs").is_err());
    assert!(parse_kb_command("bogus").is_err());
}

#[test]
fn theme_command_switches_preset() {
    let mut app = app();
    app.handle_theme_change("ember");
    assert_eq!(app.theme.as_str(), "ember");

    app.handle_theme_change("nosuch");
    assert_eq!(app.theme.as_str(), "ember");
    let last = app.entries.last().expect("usage entry");
    assert!(matches!(last.kind, EntryKind::Error));
}

#[test]
fn history_payload_clamps_to_turn_budget() {
    let config = Config {
        history_max_turns: 2,
        ..Config::default()
    };
    let mut app = App::new(config);
    for i in 0..5 {
        app.record_exchange(&format!("q{i}"), &format!("a{i}"));
    }

    let payload = app.history_payload();
    assert_eq!(payload.len(), 4);
    assert_eq!(payload[0].content, "q3");
    assert_eq!(payload[3].content, "a4");
    assert_eq!(app.chat_turns.len(), 4);
}

#[test]
fn user_entry_renders_as_full_width_block() {
    let mut app = app();
    app.entries.clear();
    app.push_entry(EntryKind::User, "hello");

    let rendered = flatten_lines_to_plain(&app.render_entries_lines(40));

    assert!(rendered[0].starts_with(" hello "));
    assert_eq!(UnicodeWidthStr::width(rendered[0].as_str()), 40);
}

#[test]
fn assistant_entry_renders_with_label_column() {
    let mut app = app();
    app.entries.clear();
    app.push_entry(EntryKind::Assistant, "answer");

    let rendered = flatten_lines_to_plain(&app.render_entries_lines(80));

    assert_eq!(rendered[0], "assistant │ answer");
}

#[test]
fn assistant_code_block_renders_fenced_delimiters() {
    let mut app = app();
    app.entries.clear();
    app.push_entry(
        EntryKind::Assistant,
        "Use this:\n```rust\nfn main() {}\n```\nDone.",
    );

    let rendered = flatten_lines_to_plain(&app.render_entries_lines(120));

    assert!(rendered.iter().any(|line| line.contains("─── rust")));
    assert!(rendered.iter().any(|line| line.contains("fn main() {}")));
    assert!(rendered
        .iter()
        .any(|line| line.trim_end().ends_with("───") && !line.contains("rust")));
    assert!(!rendered.iter().any(|line| line.contains("```")));
}

#[test]
fn unterminated_fence_renders_as_plain_text() {
    let mut app = app();
    app.entries.clear();
    app.push_entry(EntryKind::Assistant, "start\n```python\nprint(1)");

    let rendered = flatten_lines_to_plain(&app.render_entries_lines(120));

    assert!(rendered.iter().any(|line| line.contains("```python")));
    assert!(!rendered.iter().any(|line| line.contains("─── python")));
}

#[test]
fn running_flush_skips_bare_placeholder_entry() {
    let mut app = app();
    app.entries.clear();
    let _tx = start_chat_run(&mut app, "test");

    let before = flatten_lines_to_plain(&app.running_flush_log_lines(80));
    assert!(!before
        .iter()
        .any(|line| line.contains(THINKING_PLACEHOLDER)));

    // Once content arrives the entry appears in flushes.
    let idx = app.assistant_idx.expect("assistant entry");
    app.entries[idx].text = "first output line".to_string();
    app.stream_had_chunk = true;
    let after = flatten_lines_to_plain(&app.running_flush_log_lines(80));
    assert!(after.iter().any(|line| line.contains("first output line")));
}

#[test]
fn startup_banner_renders_as_card() {
    let app = app();

    let rendered = flatten_lines_to_plain(&app.render_entries_lines(80));

    assert!(rendered.iter().any(|line| line.starts_with('┌')));
    assert!(rendered
        .iter()
        .any(|line| line.starts_with("│ ") && line.contains("kbchat")));
    assert!(rendered
        .iter()
        .any(|line| line.contains("server: http://127.0.0.1:5000")));
    assert!(rendered.iter().any(|line| line.starts_with('└')));
    assert!(!rendered.iter().any(|line| line.contains("[sys]")));
}

#[test]
fn system_entries_render_multiline_text_line_by_line() {
    let mut app = app();
    app.entries.clear();
    app.push_entry(EntryKind::System, "top line\nmiddle line\nbottom line");

    let rendered = flatten_lines_to_plain(&app.render_entries_lines(80));

    assert!(rendered.iter().any(|line| line == "[sys] top line"));
    assert!(rendered.iter().any(|line| line == "      middle line"));
    assert!(rendered.iter().any(|line| line == "      bottom line"));
}

#[test]
fn large_paste_is_collapsed_and_restored_before_dispatch() {
    let mut app = app();
    let payload = "line ".repeat(220);
    app.handle_paste_event(&payload);

    assert!(app.input.starts_with("[Pasted Content "));
    assert_eq!(app.pending_pastes.len(), 1);

    let expanded = app.consume_pending_pastes(&app.input.clone());
    assert_eq!(expanded, payload);
    assert!(app.pending_pastes.is_empty());
}

#[test]
fn short_paste_keeps_plain_text() {
    let mut app = app();
    app.handle_paste_event("hello\nworld");
    assert_eq!(app.input, "hello\nworld");
    assert!(app.pending_pastes.is_empty());
}

#[test]
fn slash_hints_filter_by_prefix_and_cycle() {
    let mut app = app();
    app.input = "/kb".to_string();
    app.cursor = app.input.len();

    let hints = app.slash_hints();
    assert!(!hints.is_empty());
    assert!(hints.iter().all(|h| h.starts_with("/kb")));
    assert!(hints.len() <= 6);

    app.slash_hint_idx = 0;
    assert!(app.cycle_slash_hint_next());
    assert_eq!(app.slash_hint_idx, 1);
    assert!(app.cycle_slash_hint_prev());
    assert_eq!(app.slash_hint_idx, 0);
}

#[test]
fn slash_hints_absent_for_plain_text() {
    let mut app = app();
    app.input = "tell me about rust".to_string();
    assert!(app.slash_hints().is_empty());
}

#[test]
fn compute_append_ranges_ignores_style_only_refresh() {
    let old = vec!["user".to_string(), "assistant".to_string()];
    let new = vec!["user".to_string(), "assistant".to_string()];
    assert_eq!(
        compute_append_ranges(&old, &new),
        Vec::<(usize, usize)>::new()
    );
}

#[test]
fn compute_append_ranges_ignores_replaced_rows_even_with_new_tail() {
    let old = vec![
        "user".to_string(),
        format!("assistant {}", THINKING_PLACEHOLDER),
    ];
    let new = vec![
        "user".to_string(),
        "assistant final answer".to_string(),
        "done notice".to_string(),
    ];
    assert_eq!(
        compute_append_ranges(&old, &new),
        Vec::<(usize, usize)>::new()
    );
}

#[test]
fn compute_append_ranges_appends_tail_only() {
    // When old is a strict prefix of new, append the tail.
    let old = vec!["user".to_string(), "assistant".to_string()];
    let new = vec![
        "user".to_string(),
        "assistant".to_string(),
        "kb listing".to_string(),
        "done".to_string(),
    ];
    assert_eq!(compute_append_ranges(&old, &new), vec![(2, 4)]);
}

#[test]
fn compute_running_append_ranges_appends_from_first_difference() {
    let old = vec![
        " user question ".to_string(),
        "".to_string(),
        "assistant │ hello".to_string(),
    ];
    let new = vec![
        " user question ".to_string(),
        "".to_string(),
        "assistant │ hello world".to_string(),
        "          │ next line".to_string(),
    ];
    assert_eq!(compute_running_append_ranges(&old, &new), vec![(2, 4)]);
}

#[test]
fn compute_flush_append_ranges_uses_running_diff_on_running_to_done_transition() {
    let old = vec![
        " user question ".to_string(),
        format!("assistant │ {}", THINKING_PLACEHOLDER),
    ];
    let new = vec![
        " user question ".to_string(),
        "assistant │ final answer".to_string(),
    ];
    assert_eq!(
        compute_flush_append_ranges(&old, &new, false, true),
        vec![(1, 2)]
    );
    assert_eq!(
        compute_flush_append_ranges(&old, &new, false, false),
        Vec::<(usize, usize)>::new()
    );
}

#[test]
fn wrapped_stream_growth_keeps_tail_when_autoscroll_on() {
    let mut app = app();
    app.update_viewport(24, 12);
    app.autoscroll = true;
    app.push_entry(EntryKind::Assistant, "short line");

    let before = app.scroll_max();
    let idx = app.entries.len().saturating_sub(1);
    if let Some(entry) = app.entries.get_mut(idx) {
        entry
            .text
            .push_str(" this is a long streaming sentence that should wrap across rows");
    }
    app.follow_scroll();

    let after = app.scroll_max();
    assert!(after >= before);
    assert_eq!(app.scroll, after);
}
