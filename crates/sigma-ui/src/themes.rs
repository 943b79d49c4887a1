use ratatui::style::{Color, Modifier, Style};
use sigma_core::models::Status;
use sigma_core::statistics::CellClass;
use sigma_core::summary::TotalClass;

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
    Unknown,
}

/// Detect terminal background type from `COLORFGBG` (`"fg;bg"`).
///
/// Background values 0–6 are dark, 7–15 light. Absent or unparseable
/// values yield `Dark`.
pub fn detect_background() -> BackgroundType {
    if let Ok(val) = std::env::var("COLORFGBG") {
        if let Some(bg) = val.split(';').next_back() {
            if let Ok(bg_num) = bg.parse::<u8>() {
                return if bg_num <= 6 {
                    BackgroundType::Dark
                } else {
                    BackgroundType::Light
                };
            }
        }
    }
    BackgroundType::Dark
}

/// Every style used by the validation screen.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Header ───────────────────────────────────────────────────────────────
    pub header: Style,
    pub separator: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub label: Style,
    pub value: Style,

    // ── Status ───────────────────────────────────────────────────────────────
    pub status_ok: Style,
    pub status_warn: Style,
    pub status_danger: Style,
    pub status_na: Style,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: Style,
    pub table_border: Style,
    pub table_row: Style,
    pub table_row_alt: Style,
    /// Month column under validation.
    pub reference_column: Style,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Dark-background theme (default).
    pub fn dark() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            label: Style::default().fg(Color::Gray),
            value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),

            status_ok: Style::default().fg(Color::Green),
            status_warn: Style::default().fg(Color::Yellow),
            status_danger: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            status_na: Style::default().fg(Color::DarkGray),

            table_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),
            reference_column: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Light-background theme with dark text.
    pub fn light() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            separator: Style::default().fg(Color::Gray),

            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            label: Style::default().fg(Color::DarkGray),
            value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),

            status_ok: Style::default().fg(Color::Green),
            status_warn: Style::default().fg(Color::Magenta),
            status_danger: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            status_na: Style::default().fg(Color::Gray),

            table_header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::Gray),
            table_row: Style::default().fg(Color::Black),
            table_row_alt: Style::default().fg(Color::DarkGray),
            reference_column: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Basic 8-colour palette, no modifiers.
    pub fn classic() -> Self {
        Self {
            header: Style::default().fg(Color::Cyan),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            label: Style::default().fg(Color::Gray),
            value: Style::default().fg(Color::White),

            status_ok: Style::default().fg(Color::Green),
            status_warn: Style::default().fg(Color::Yellow),
            status_danger: Style::default().fg(Color::Red),
            status_na: Style::default().fg(Color::DarkGray),

            table_header: Style::default().fg(Color::Cyan),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),
            reference_column: Style::default().fg(Color::Yellow),
        }
    }

    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Construct a theme by name, auto-detecting for unknown names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            "classic" => Self::classic(),
            _ => Self::auto_detect(),
        }
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    pub fn status_style(&self, status: Status) -> Style {
        match status {
            Status::Acceptable => self.status_ok,
            Status::Warning => self.status_warn,
            Status::OutOfRange => self.status_danger,
            Status::NoHistory => self.status_na,
        }
    }

    /// Style of a month cell classified against its group baseline.
    pub fn cell_style(&self, class: CellClass) -> Style {
        match class {
            CellClass::Ok => self.table_row,
            CellClass::Warn => self.status_warn,
            CellClass::Danger => self.status_danger,
            CellClass::Na => self.dim,
        }
    }

    pub fn total_style(&self, class: TotalClass) -> Style {
        match class {
            TotalClass::Ok => self.value,
            TotalClass::Warn => self.status_warn,
            TotalClass::Na => self.dim,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_known_themes() {
        assert_eq!(Theme::from_name("dark").header.fg, Some(Color::Cyan));
        assert_eq!(Theme::from_name("light").header.fg, Some(Color::Blue));
        assert!(Theme::from_name("classic")
            .header
            .add_modifier
            .is_empty());
    }

    #[test]
    fn test_status_styles_are_distinct() {
        let t = Theme::dark();
        assert_eq!(t.status_style(Status::Acceptable).fg, Some(Color::Green));
        assert_eq!(t.status_style(Status::Warning).fg, Some(Color::Yellow));
        assert_eq!(t.status_style(Status::OutOfRange).fg, Some(Color::Red));
        assert_eq!(t.status_style(Status::NoHistory).fg, Some(Color::DarkGray));
    }

    #[test]
    fn test_cell_and_total_styles() {
        let t = Theme::classic();
        assert_eq!(t.cell_style(CellClass::Danger), t.status_danger);
        assert_eq!(t.cell_style(CellClass::Na), t.dim);
        assert_eq!(t.total_style(TotalClass::Warn), t.status_warn);
    }
}
