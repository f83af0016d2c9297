//! Keyword-level syntax highlighting for fenced code segments.
//!
//! The backend tags code blocks with whatever language name the model emits,
//! so lookup is forgiving: aliases map onto a handful of known profiles and
//! anything unrecognized (or an empty tag) renders as plain code. A render
//! must never fail because of a language tag.

use ratatui::style::Style;
use ratatui::text::Span;

struct LanguageProfile {
    keywords: &'static [&'static str],
    line_comment: Option<&'static str>,
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "self", "static", "struct", "trait", "type", "unsafe", "use", "where", "while",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "None", "not", "or", "pass", "raise", "return", "True", "False", "try", "while", "with",
    "yield",
];

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
    "delete", "do", "else", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "null", "of", "return", "static", "switch",
    "this", "throw", "true", "try", "typeof", "undefined", "var", "while", "yield",
];

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

const SHELL_KEYWORDS: &[&str] = &[
    "case", "do", "done", "elif", "else", "esac", "fi", "for", "function", "if", "in", "local",
    "return", "then", "until", "while", "export",
];

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "CREATE",
    "TABLE", "INDEX", "DROP", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "ON", "GROUP", "BY",
    "ORDER", "LIMIT", "AND", "OR", "NOT", "NULL", "AS", "select", "from", "where", "insert",
    "into", "values", "update", "set", "delete", "create", "table", "join", "on", "and", "or",
];

const JSON_KEYWORDS: &[&str] = &["true", "false", "null"];

fn profile_for(language: &str) -> Option<LanguageProfile> {
    let normalized = language.trim().to_ascii_lowercase();
    let (keywords, line_comment): (&[&str], Option<&str>) = match normalized.as_str() {
        "rust" | "rs" => (RUST_KEYWORDS, Some("//")),
        "python" | "py" | "python3" => (PYTHON_KEYWORDS, Some("#")),
        "javascript" | "js" | "typescript" | "ts" | "jsx" | "tsx" => (JS_KEYWORDS, Some("//")),
        "go" | "golang" => (GO_KEYWORDS, Some("//")),
        "c" | "cpp" | "c++" | "java" => (JS_KEYWORDS, Some("//")),
        "sh" | "bash" | "shell" | "zsh" => (SHELL_KEYWORDS, Some("#")),
        "sql" => (SQL_KEYWORDS, Some("--")),
        "json" => (JSON_KEYWORDS, None),
        "yaml" | "yml" | "toml" | "ini" => (&[], Some("#")),
        _ => return None,
    };
    Some(LanguageProfile {
        keywords,
        line_comment,
    })
}

/// Style one line of code as spans. `base` covers ordinary code text;
/// `keyword`, `literal` and `comment` are accents for recognized tokens.
pub(crate) fn highlight_line(
    line: &str,
    language: &str,
    base: Style,
    keyword: Style,
    literal: Style,
    comment: Style,
) -> Vec<Span<'static>> {
    let content = if line.is_empty() { " " } else { line };
    let Some(profile) = profile_for(language) else {
        return vec![Span::styled(content.to_string(), base)];
    };

    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut chars = content.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        // Rest of the line is a comment.
        if let Some(marker) = profile.line_comment {
            if content[idx..].starts_with(marker) {
                flush_plain(&mut spans, &mut plain, base);
                spans.push(Span::styled(content[idx..].to_string(), comment));
                return finish(spans, base);
            }
        }

        // String literal: consume to the matching quote, honouring backslash
        // escapes; an unclosed literal runs to end of line.
        if ch == '"' || ch == '\'' {
            flush_plain(&mut spans, &mut plain, base);
            let mut lit = String::from(ch);
            let mut escaped = false;
            for (_, c) in chars.by_ref() {
                lit.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == ch {
                    break;
                }
            }
            spans.push(Span::styled(lit, literal));
            continue;
        }

        // Word token: keyword or plain identifier.
        if ch.is_alphanumeric() || ch == '_' {
            let mut word = String::from(ch);
            while let Some(&(_, next)) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    word.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if profile.keywords.contains(&word.as_str()) {
                flush_plain(&mut spans, &mut plain, base);
                spans.push(Span::styled(word, keyword));
            } else if word.chars().all(|c| c.is_ascii_digit()) {
                flush_plain(&mut spans, &mut plain, base);
                spans.push(Span::styled(word, literal));
            } else {
                plain.push_str(&word);
            }
            continue;
        }

        plain.push(ch);
    }

    flush_plain(&mut spans, &mut plain, base);
    finish(spans, base)
}

fn flush_plain(spans: &mut Vec<Span<'static>>, plain: &mut String, base: Style) {
    if !plain.is_empty() {
        spans.push(Span::styled(std::mem::take(plain), base));
    }
}

fn finish(spans: Vec<Span<'static>>, base: Style) -> Vec<Span<'static>> {
    if spans.is_empty() {
        vec![Span::styled(" ".to_string(), base)]
    } else {
        spans
    }
}
