use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ThemePreset {
    Fjord,
    Graphite,
    Ember,
}

impl ThemePreset {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ThemePreset::Fjord => "fjord",
            ThemePreset::Graphite => "graphite",
            ThemePreset::Ember => "ember",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "fjord" | "nord" | "blue" => Some(ThemePreset::Fjord),
            "graphite" | "slate" | "gray" => Some(ThemePreset::Graphite),
            "ember" | "warm" | "mono" => Some(ThemePreset::Ember),
            _ => None,
        }
    }

    pub(crate) fn palette(self) -> ThemePalette {
        match self {
            ThemePreset::Fjord => ThemePalette {
                // cool blue
                prompt: Color::Rgb(100, 150, 200),
                input_text: Color::Rgb(180, 200, 220),
                muted_text: Color::Rgb(80, 100, 120),
                highlight_fg: Color::Rgb(200, 220, 240),
                highlight_bg: Color::Rgb(40, 60, 80),
                activity_text: Color::Rgb(120, 140, 160),
                status_text: Color::Rgb(90, 110, 130),
                user_fg: Color::Rgb(200, 220, 240),
                user_bg: Color::Rgb(25, 35, 45),
                assistant_label: Color::Rgb(120, 190, 220),
                processing_label: Color::Rgb(130, 160, 190),
                assistant_text: Color::Rgb(170, 190, 210),
                system_text: Color::Rgb(100, 120, 140),
                error_label: Color::Rgb(220, 100, 100),
                error_text: Color::Rgb(230, 120, 120),
                banner_title: Color::Rgb(150, 170, 190),
                panel_bg: Color::Rgb(10, 20, 30),
                panel_fg: Color::Rgb(170, 190, 210),
                code_fg: Color::Rgb(180, 200, 220),
                code_bg: Color::Rgb(5, 15, 25),
                code_keyword: Color::Rgb(130, 180, 240),
                code_literal: Color::Rgb(150, 200, 160),
                code_comment: Color::Rgb(90, 110, 130),
                inline_code_fg: Color::Rgb(160, 180, 200),
                inline_code_bg: Color::Rgb(20, 30, 40),
                bullet: Color::Rgb(110, 130, 150),
            },
            ThemePreset::Graphite => ThemePalette {
                // neutral gray
                prompt: Color::Rgb(192, 192, 192),
                input_text: Color::Rgb(224, 224, 224),
                muted_text: Color::Rgb(128, 128, 128),
                highlight_fg: Color::Rgb(255, 255, 255),
                highlight_bg: Color::Rgb(64, 64, 64),
                activity_text: Color::Rgb(160, 160, 160),
                status_text: Color::Rgb(140, 140, 140),
                user_fg: Color::Rgb(255, 255, 255),
                user_bg: Color::Rgb(25, 25, 25),
                assistant_label: Color::Rgb(200, 200, 200),
                processing_label: Color::Rgb(180, 180, 180),
                assistant_text: Color::Rgb(210, 210, 210),
                system_text: Color::Rgb(160, 160, 160),
                error_label: Color::Rgb(220, 100, 100),
                error_text: Color::Rgb(230, 120, 120),
                banner_title: Color::Rgb(200, 200, 200),
                panel_bg: Color::Rgb(10, 10, 10),
                panel_fg: Color::Rgb(210, 210, 210),
                code_fg: Color::Rgb(220, 220, 220),
                code_bg: Color::Rgb(5, 5, 5),
                code_keyword: Color::Rgb(235, 205, 140),
                code_literal: Color::Rgb(170, 210, 170),
                code_comment: Color::Rgb(120, 120, 120),
                inline_code_fg: Color::Rgb(190, 190, 190),
                inline_code_bg: Color::Rgb(20, 20, 20),
                bullet: Color::Rgb(150, 150, 150),
            },
            ThemePreset::Ember => ThemePalette {
                // warm copper
                prompt: Color::Rgb(214, 168, 120),
                input_text: Color::Rgb(238, 226, 214),
                muted_text: Color::Rgb(150, 130, 115),
                highlight_fg: Color::Rgb(255, 255, 255),
                highlight_bg: Color::Rgb(80, 60, 45),
                activity_text: Color::Rgb(190, 165, 140),
                status_text: Color::Rgb(170, 150, 130),
                user_fg: Color::Rgb(255, 250, 240),
                user_bg: Color::Rgb(32, 26, 20),
                assistant_label: Color::Rgb(230, 160, 100),
                processing_label: Color::Rgb(195, 170, 145),
                assistant_text: Color::Rgb(225, 212, 198),
                system_text: Color::Rgb(175, 155, 135),
                error_label: Color::Rgb(220, 100, 100),
                error_text: Color::Rgb(230, 120, 120),
                banner_title: Color::Rgb(220, 190, 160),
                panel_bg: Color::Rgb(16, 12, 9),
                panel_fg: Color::Rgb(225, 212, 198),
                code_fg: Color::Rgb(232, 222, 210),
                code_bg: Color::Rgb(10, 8, 6),
                code_keyword: Color::Rgb(235, 175, 110),
                code_literal: Color::Rgb(185, 205, 150),
                code_comment: Color::Rgb(140, 125, 110),
                inline_code_fg: Color::Rgb(205, 192, 178),
                inline_code_bg: Color::Rgb(28, 22, 17),
                bullet: Color::Rgb(180, 155, 130),
            },
        }
    }
}

pub(crate) fn default_theme() -> ThemePreset {
    ThemePreset::Graphite
}

#[derive(Clone, Copy)]
pub(crate) struct ThemePalette {
    pub(crate) prompt: Color,
    pub(crate) input_text: Color,
    pub(crate) muted_text: Color,
    pub(crate) highlight_fg: Color,
    pub(crate) highlight_bg: Color,
    pub(crate) activity_text: Color,
    pub(crate) status_text: Color,
    pub(crate) user_fg: Color,
    pub(crate) user_bg: Color,
    pub(crate) assistant_label: Color,
    pub(crate) processing_label: Color,
    pub(crate) assistant_text: Color,
    pub(crate) system_text: Color,
    pub(crate) error_label: Color,
    pub(crate) error_text: Color,
    pub(crate) banner_title: Color,
    pub(crate) panel_bg: Color,
    pub(crate) panel_fg: Color,
    pub(crate) code_fg: Color,
    pub(crate) code_bg: Color,
    pub(crate) code_keyword: Color,
    pub(crate) code_literal: Color,
    pub(crate) code_comment: Color,
    pub(crate) inline_code_fg: Color,
    pub(crate) inline_code_bg: Color,
    pub(crate) bullet: Color,
}

impl ThemePalette {
    pub(crate) fn prompt_style(self) -> Style {
        Style::default()
            .fg(self.prompt)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn title_style(self) -> Style {
        Style::default()
            .fg(self.banner_title)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn body_style(self) -> Style {
        Style::default().fg(self.assistant_text)
    }

    pub(crate) fn secondary_style(self) -> Style {
        Style::default().fg(self.system_text)
    }

    pub(crate) fn muted_style(self) -> Style {
        Style::default().fg(self.muted_text)
    }

    pub(crate) fn status_style(self) -> Style {
        Style::default().fg(self.status_text)
    }

    pub(crate) fn panel_surface_style(self) -> Style {
        Style::default().bg(self.panel_bg).fg(self.panel_fg)
    }

    pub(crate) fn panel_border_style(self) -> Style {
        Style::default().fg(self.highlight_bg)
    }

    pub(crate) fn input_surface_style(self) -> Style {
        Style::default().fg(self.input_text)
    }

    pub(crate) fn hint_selected_style(self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn code_style(self) -> Style {
        Style::default().bg(self.code_bg).fg(self.code_fg)
    }

    pub(crate) fn code_keyword_style(self) -> Style {
        Style::default()
            .bg(self.code_bg)
            .fg(self.code_keyword)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn code_literal_style(self) -> Style {
        Style::default().bg(self.code_bg).fg(self.code_literal)
    }

    pub(crate) fn code_comment_style(self) -> Style {
        Style::default()
            .bg(self.code_bg)
            .fg(self.code_comment)
            .add_modifier(Modifier::ITALIC)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub(crate) enum EntryKind {
    User,
    Assistant,
    System,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct LogEntry {
    pub(crate) kind: EntryKind,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) elapsed_secs: Option<u64>,
}

/// One prior exchange message, serialized as-is into the request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChatTurn {
    pub(crate) role: String,
    pub(crate) content: String,
}

impl ChatTurn {
    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub(crate) fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KnowledgeBase {
    pub(crate) name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct KnowledgeBaseInfo {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) document_count: u64,
    /// Creation time as fractional seconds since the Unix epoch, the way
    /// the backend reports filesystem ctimes.
    #[serde(default)]
    pub(crate) created_at: f64,
}

#[derive(Debug)]
pub(crate) enum WorkerEvent {
    /// One streamed fragment of the assistant reply.
    Chunk(String),
    /// Request finished; non-empty text is the final output for
    /// non-streaming requests.
    Done(String),
    /// Fresh knowledge-base listing from the backend.
    KnowledgeBases(Vec<KnowledgeBase>),
    Error(String),
}
