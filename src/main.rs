use std::io::Stdout;

use anyhow::{Context, Result};
use crossterm::cursor;
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};
use unicode_width::UnicodeWidthChar;

mod api;
mod app;
mod config;
mod highlight;
mod orchestrator;
mod segment;

use app::{EntryKind, LogEntry};
use config::Config;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const THINKING_PLACEHOLDER: &str = "(thinking...)";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--version" | "-v" => {
                println!("kbchat {}", APP_VERSION);
                return Ok(());
            }
            unknown => {
                eprintln!("unknown argument: {}", unknown);
                std::process::exit(2);
            }
        }
    }

    let config = Config::from_env();

    let mut terminal = setup_terminal()?;
    let result = app::run_app(&mut terminal, config);
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    // ratatui::Terminal::insert_before requires at least one line above the viewport.
    // If cursor starts at row 0, move to row 1 first.
    if matches!(cursor::position(), Ok((_, 0))) {
        println!();
    }

    enable_raw_mode().context("enable raw mode")?;

    let term_height = crossterm::terminal::size().map(|(_, h)| h).unwrap_or(24);
    let term_width = crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80);
    let inline_height = compute_inline_height(term_height);

    let mut terminal = match Terminal::with_options(
        CrosstermBackend::new(std::io::stdout()),
        TerminalOptions {
            viewport: Viewport::Inline(inline_height),
        },
    ) {
        Ok(t) => t,
        Err(inline_err) => {
            // Some terminals/shell wrappers fail cursor-position query required by Inline.
            // Fall back to a fixed bottom viewport to keep app usable.
            let fallback_rect = Rect::new(
                0,
                term_height.saturating_sub(inline_height),
                term_width.max(1),
                inline_height.max(1),
            );
            Terminal::with_options(
                CrosstermBackend::new(std::io::stdout()),
                TerminalOptions {
                    viewport: Viewport::Fixed(fallback_rect),
                },
            )
            .with_context(|| format!("create terminal (inline failed: {inline_err})"))?
        }
    };

    if matches!(supports_keyboard_enhancement(), Ok(true)) {
        crossterm::execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .ok();
    }
    crossterm::execute!(std::io::stdout(), EnableBracketedPaste).ok();

    terminal.hide_cursor().ok();
    Ok(terminal)
}

fn compute_inline_height(term_height: u16) -> u16 {
    let max_allowed = term_height.saturating_sub(1).max(1);
    if let Ok(raw) = std::env::var("KBCHAT_INLINE_HEIGHT") {
        if let Ok(parsed) = raw.trim().parse::<u16>() {
            return parsed.clamp(1, max_allowed);
        }
    }

    // Compact composer viewport (activity + input + status + gaps).
    12u16.min(max_allowed).max(6)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    crossterm::execute!(std::io::stdout(), DisableBracketedPaste).ok();
    crossterm::execute!(std::io::stdout(), PopKeyboardEnhancementFlags).ok();
    disable_raw_mode().context("disable raw mode")?;
    terminal.show_cursor().context("show cursor")?;
    println!();
    Ok(())
}

fn default_commands() -> Vec<String> {
    vec![
        "/help".to_string(),
        "/kb list".to_string(),
        "/kb create".to_string(),
        "/kb delete".to_string(),
        "/kb info".to_string(),
        "/kb upload".to_string(),
        "/kb use".to_string(),
        "/kb off".to_string(),
        "/theme fjord".to_string(),
        "/theme graphite".to_string(),
        "/theme ember".to_string(),
        "/clear".to_string(),
        "/exit".to_string(),
    ]
}

fn cleaned_assistant_text(entry: &LogEntry) -> String {
    if !matches!(entry.kind, EntryKind::Assistant) {
        return entry.text.clone();
    }
    let text = entry.text.trim_end();
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == THINKING_PLACEHOLDER {
        String::new()
    } else {
        text.to_string()
    }
}

fn truncate(s: &str, n: usize) -> String {
    match s.char_indices().nth(n) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn input_cursor_position(input: &str, cursor: usize, width: u16, prompt_width: u16) -> (u16, u16) {
    let width = width.max(1) as usize;
    let mut x = prompt_width as usize;
    let mut y = 0usize;
    let mut consumed = 0usize;

    for ch in input.chars() {
        let len = ch.len_utf8();
        if consumed + len > cursor {
            break;
        }
        consumed += len;
        if ch == '\n' {
            x = prompt_width as usize;
            y += 1;
            continue;
        }
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1).max(1);
        if x + ch_width > width {
            x = 0;
            y += 1;
        }
        x += ch_width;
        if x >= width {
            x = 0;
            y += 1;
        }
    }

    (x as u16, y as u16)
}
