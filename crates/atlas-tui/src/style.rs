use atlas_core::status::TaskStatus;
use crossterm::style::Stylize;
use ratatui::style::{Color, Modifier, Style};

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;

pub(crate) const ATTENTION_MARKER: &str = "(!)";
pub(crate) const STALE_MARKER: &str = "(?)";

pub(crate) fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "○",
        TaskStatus::Running => "●",
        TaskStatus::Validating => "◐",
        TaskStatus::ValidationFailed => "✗",
        TaskStatus::AwaitingApproval => "⚠",
        TaskStatus::Completed => "✓",
        TaskStatus::Rejected | TaskStatus::Abandoned => "⊘",
        TaskStatus::GhFailed | TaskStatus::CiFailed => "✗",
        TaskStatus::CiTimeout => "◷",
    }
}

pub(crate) fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Gray,
        TaskStatus::Running | TaskStatus::Validating => Color::Blue,
        TaskStatus::AwaitingApproval => Color::Yellow,
        TaskStatus::ValidationFailed
        | TaskStatus::GhFailed
        | TaskStatus::CiFailed
        | TaskStatus::CiTimeout => Color::Red,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Rejected | TaskStatus::Abandoned => DIM,
    }
}

/// Styles for both the ratatui screen and plain-text output. With color off
/// every style is the default one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Theme {
    pub color: bool,
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, style: Style) -> Style {
        if self.color {
            style
        } else {
            Style::default()
        }
    }

    pub fn dim(&self) -> Style {
        self.paint(Style::default().fg(DIM))
    }

    pub fn header(&self) -> Style {
        self.paint(Style::default().fg(DIM).add_modifier(Modifier::BOLD))
    }

    pub fn accent(&self) -> Style {
        self.paint(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
    }

    pub fn warning(&self) -> Style {
        self.paint(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }

    pub fn error(&self) -> Style {
        self.paint(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    }

    pub fn status(&self, status: TaskStatus) -> Style {
        let style = Style::default().fg(status_color(status));
        if status.needs_attention() {
            self.paint(style.add_modifier(Modifier::BOLD))
        } else {
            self.paint(style)
        }
    }

    /// `text` wrapped in the escape codes for `style`, for line-oriented output.
    pub fn ansi(&self, text: &str, style: Style) -> String {
        if !self.color || style == Style::default() {
            return text.to_string();
        }
        let mut styled = crossterm::style::style(text);
        if let Some(fg) = style.fg {
            styled = styled.with(fg.into());
        }
        if style.add_modifier.contains(Modifier::BOLD) {
            styled = styled.bold();
        }
        styled.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::status::ALL_STATUSES;

    #[test]
    fn plain_theme_never_emits_escape_codes() {
        let theme = Theme::new(false);
        for status in ALL_STATUSES {
            assert_eq!(theme.status(status), Style::default());
            let text = theme.ansi(status.as_str(), theme.status(status));
            assert_eq!(text, status.as_str());
        }
        assert_eq!(theme.ansi("ATLAS", theme.accent()), "ATLAS");
        assert_eq!(theme.dim(), Style::default());
    }

    #[test]
    fn color_theme_wraps_text_in_ansi() {
        let theme = Theme::new(true);
        let text = theme.ansi("ci_failed", theme.status(TaskStatus::CiFailed));
        assert!(text.contains('\u{1b}'));
        assert!(text.contains("ci_failed"));
        assert_eq!(theme.status(TaskStatus::Running).fg, Some(Color::Blue));
        assert!(theme
            .status(TaskStatus::AwaitingApproval)
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn every_status_has_a_single_char_icon() {
        for status in ALL_STATUSES {
            assert_eq!(status_icon(status).chars().count(), 1, "{status}");
        }
    }
}
