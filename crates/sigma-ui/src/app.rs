//! Interactive terminal view over a [`ValidationSession`].
//!
//! [`App`] owns the session while the view is open, maps key presses to
//! session parameter changes and redraws after each one.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span, Text},
    widgets::Paragraph,
    Frame, Terminal,
};

use sigma_core::filter::{SortKey, SortState, SortDirection};
use sigma_core::models::Status;
use sigma_core::statistics::reference_index;
use sigma_runtime::session::ValidationSession;

use crate::components::header::{Header, HeaderInfo};
use crate::components::totals::MonthTotalsBar;
use crate::table_view::{self, TableLayout};
use crate::themes::Theme;

/// Rows moved by PgUp / PgDn.
pub const PAGE_SIZE: usize = 10;

const HELP: &str =
    "q sair | ↑↓ PgUp PgDn rolar | s ordenar | S inverter | f status | z zeros | [ ] mês ref | + - janela";

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    pub theme: Theme,
    pub session: ValidationSession,
    /// First visible row.
    pub offset: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(theme_name: &str, session: ValidationSession) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            session,
            offset: 0,
            should_quit: false,
        }
    }

    /// Run until `q` / `Ctrl+C`, then hand the session back.
    pub fn run(mut self) -> io::Result<ValidationSession> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }
            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }
            if self.should_quit {
                break Ok(());
            }
        };

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result.map(|_| self.session)
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Down => self.scroll_by(1),
            KeyCode::Up => self.scroll_back(1),
            KeyCode::PageDown => self.scroll_by(PAGE_SIZE),
            KeyCode::PageUp => self.scroll_back(PAGE_SIZE),
            KeyCode::Char('s') => self.next_sort_key(),
            KeyCode::Char('S') => self.flip_sort_direction(),
            KeyCode::Char('f') => self.cycle_status_filter(),
            KeyCode::Char('z') => {
                let ignore = !self.session.params().ignore_zeros;
                self.session.set_ignore_zeros(ignore);
            }
            KeyCode::Char('[') => self.move_reference(-1),
            KeyCode::Char(']') => self.move_reference(1),
            KeyCode::Char('+') => self.grow_window(),
            KeyCode::Char('-') => self.shrink_window(),
            _ => {}
        }
        self.clamp_offset();
    }

    fn scroll_by(&mut self, n: usize) {
        self.offset = self.offset.saturating_add(n);
    }

    fn scroll_back(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    fn clamp_offset(&mut self) {
        let last = self.session.rows().len().saturating_sub(1);
        self.offset = self.offset.min(last);
    }

    /// Advance to the next fixed sort key, ascending.
    fn next_sort_key(&mut self) {
        let keys = SortKey::FIXED;
        let next = match &self.session.sort().key {
            Some(current) => keys
                .iter()
                .position(|k| k == current)
                .map(|i| keys[(i + 1) % keys.len()].clone())
                .unwrap_or_else(|| keys[0].clone()),
            None => keys[0].clone(),
        };
        self.session
            .set_sort(SortState::new(next, SortDirection::Ascending));
    }

    fn flip_sort_direction(&mut self) {
        if let Some(key) = self.session.sort().key.clone() {
            self.session.toggle_sort(key);
        }
    }

    /// None → each status in turn → None.
    fn cycle_status_filter(&mut self) {
        let mut filters = self.session.filters().clone();
        filters.status = match filters.status {
            None => Some(Status::ALL[0]),
            Some(s) => Status::ALL
                .iter()
                .position(|x| *x == s)
                .and_then(|i| Status::ALL.get(i + 1).copied()),
        };
        self.session.set_filters(filters);
    }

    fn move_reference(&mut self, delta: isize) {
        let months = self.session.months();
        let Some(current) = reference_index(months, self.session.params().reference.as_deref()) else {
            return;
        };
        let target = current
            .saturating_add_signed(delta)
            .min(months.len().saturating_sub(1));
        let label = months[target].label.clone();
        self.session.set_reference(Some(label));
    }

    /// Widen the window by one month; past the available history it becomes
    /// unbounded.
    fn grow_window(&mut self) {
        let max = self.session.months().len().saturating_sub(1);
        let next = match self.session.params().effective_window() {
            Some(n) if n + 1 < max => Some(n + 1),
            _ => None,
        };
        self.session.set_window(next);
    }

    fn shrink_window(&mut self) {
        let max = self.session.months().len().saturating_sub(1);
        let next = match self.session.params().effective_window() {
            Some(n) => n.saturating_sub(1).max(2),
            None => max.saturating_sub(1).max(2),
        };
        self.session.set_window(Some(next));
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    pub fn header_info(&self) -> HeaderInfo {
        let s = &self.session;
        let meta = s.dataset().map(|d| &d.meta);
        HeaderInfo {
            source_file: meta.and_then(|m| m.source_file.clone()),
            sheet: meta.and_then(|m| m.sheet.clone()),
            metric: s.metric().map(str::to_string),
            reference: s.reference_label(),
            window: s.params().effective_window(),
            ignore_zeros: s.params().ignore_zeros,
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        let info = self.header_info();
        let kpis = self.session.kpis();
        let header = Header::new(&info, &kpis, &self.theme).to_lines();
        frame.render_widget(Paragraph::new(Text::from(header)), chunks[0]);

        let totals = self.session.month_totals();
        let totals_lines = MonthTotalsBar::new(&totals, &self.theme).to_lines();
        frame.render_widget(Paragraph::new(Text::from(totals_lines)), chunks[1]);

        if !self.session.has_data() {
            table_view::render_no_data(frame, chunks[2], "Nenhum dado carregado", &self.theme);
        } else if self.session.rows().is_empty() {
            table_view::render_no_data(frame, chunks[2], "Nenhuma linha com os filtros atuais", &self.theme);
        } else {
            let layout = TableLayout {
                months: self.session.months(),
                visible: self.session.visible(),
                reference: reference_index(
                    self.session.months(),
                    self.session.params().reference.as_deref(),
                ),
                offset: self.offset,
            };
            let title = format!("Verbas ({})", self.session.rows().len());
            table_view::render_table_view(
                frame,
                chunks[2],
                &title,
                self.session.rows(),
                &layout,
                &self.theme,
            );
        }

        let sort = match &self.session.sort().key {
            Some(k) => {
                let arrow = match self.session.sort().direction {
                    SortDirection::Ascending => "↑",
                    SortDirection::Descending => "↓",
                };
                format!(" | ordem: {} {}", k, arrow)
            }
            None => String::new(),
        };
        let footer = Line::from(vec![
            Span::styled(HELP, self.theme.dim),
            Span::styled(sort, self.theme.label),
        ]);
        frame.render_widget(Paragraph::new(footer), chunks[3]);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use sigma_core::models::CellValue;
    use sigma_data::import::DatasetImporter;
    use sigma_data::reader::SheetGrid;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn app() -> App {
        let header = [
            "Código", "Descrição", "Empresa", "JAN/25 - Valor", "FEV/25 - Valor", "MAR/25 - Valor",
            "ABR/25 - Valor", "MAI/25 - Valor",
        ];
        let mut rows = vec![header.iter().map(|h| CellValue::from(*h)).collect::<Vec<_>>()];
        for i in 0..15 {
            let code = format!("{:03}", i);
            let last = if i == 0 { "900" } else { "100" };
            rows.push(
                [code.as_str(), "VERBA", "ACME", "100", "0", "102", "98", last]
                    .iter()
                    .map(|c| CellValue::from(*c))
                    .collect(),
            );
        }
        let grid = SheetGrid {
            name: "Dados".to_string(),
            rows,
        };
        let dataset = DatasetImporter::with_defaults()
            .import_grid(&grid, None, None)
            .unwrap();
        let mut session = ValidationSession::in_memory();
        session.import_dataset(dataset);
        App::new("dark", session)
    }

    #[test]
    fn test_quit_keys() {
        let mut a = app();
        a.handle_key(key('q'));
        assert!(a.should_quit);

        let mut a = app();
        a.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(a.should_quit);
    }

    #[test]
    fn test_scrolling_is_clamped() {
        let mut a = app();
        a.handle_key(KeyEvent::new(KeyCode::PageDown, KeyModifiers::NONE));
        assert_eq!(a.offset, PAGE_SIZE);
        a.handle_key(KeyEvent::new(KeyCode::PageDown, KeyModifiers::NONE));
        assert_eq!(a.offset, 14);
        a.handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(a.offset, 13);
        a.handle_key(KeyEvent::new(KeyCode::PageUp, KeyModifiers::NONE));
        a.handle_key(KeyEvent::new(KeyCode::PageUp, KeyModifiers::NONE));
        assert_eq!(a.offset, 0);
    }

    #[test]
    fn test_sort_keys() {
        let mut a = app();
        a.handle_key(key('s'));
        assert_eq!(a.session.sort().key, Some(SortKey::FIXED[0].clone()));
        a.handle_key(key('s'));
        assert_eq!(a.session.sort().key, Some(SortKey::FIXED[1].clone()));
        a.handle_key(key('S'));
        assert_eq!(a.session.sort().direction, SortDirection::Descending);
    }

    #[test]
    fn test_status_filter_cycles_back_to_none() {
        let mut a = app();
        for expected in Status::ALL {
            a.handle_key(key('f'));
            assert_eq!(a.session.filters().status, Some(expected));
        }
        a.handle_key(key('f'));
        assert_eq!(a.session.filters().status, None);
        assert_eq!(a.session.rows().len(), 15);
    }

    #[test]
    fn test_zero_toggle_and_reference_moves() {
        let mut a = app();
        assert_eq!(a.session.kpis().out_of_range, 1);
        a.handle_key(key('z'));
        assert!(a.session.params().ignore_zeros);

        a.handle_key(key('['));
        assert_eq!(a.session.reference_label().as_deref(), Some("ABR/25"));
        a.handle_key(key(']'));
        a.handle_key(key(']'));
        assert_eq!(a.session.reference_label().as_deref(), Some("MAI/25"));
    }

    #[test]
    fn test_window_keys() {
        let mut a = app();
        assert_eq!(a.session.params().effective_window(), None);
        a.handle_key(key('-'));
        assert_eq!(a.session.params().effective_window(), Some(3));
        a.handle_key(key('-'));
        a.handle_key(key('-'));
        assert_eq!(a.session.params().effective_window(), Some(2));
        a.handle_key(key('+'));
        assert_eq!(a.session.params().effective_window(), Some(3));
        a.handle_key(key('+'));
        assert_eq!(a.session.params().effective_window(), None);
    }

    #[test]
    fn test_render_does_not_panic() {
        let a = app();
        let mut terminal = Terminal::new(TestBackend::new(200, 30)).unwrap();
        terminal.draw(|frame| a.render(frame)).unwrap();

        let empty = App::new("light", ValidationSession::in_memory());
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| empty.render(frame)).unwrap();
    }
}
