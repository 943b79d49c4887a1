use crate::themes::Theme;
use ratatui::text::{Line, Span};
use sigma_core::formatting::format_number;
use sigma_core::summary::MonthTotals;

/// One line per series: all rows and warning rows, each month coloured by
/// its [`TotalClass`](sigma_core::summary::TotalClass).
pub struct MonthTotalsBar<'a> {
    pub totals: &'a MonthTotals,
    pub theme: &'a Theme,
}

impl<'a> MonthTotalsBar<'a> {
    pub fn new(totals: &'a MonthTotals, theme: &'a Theme) -> Self {
        Self { totals, theme }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let t = self.totals;
        vec![
            self.series_line("Totais  ", &t.all, &t.all_classes()),
            self.series_line("Alertas ", &t.warning, &t.warning_classes()),
        ]
    }

    fn series_line(
        &self,
        title: &'static str,
        values: &[f64],
        classes: &[sigma_core::summary::TotalClass],
    ) -> Line<'a> {
        let mut spans = vec![Span::styled(title, self.theme.label)];
        for ((label, v), class) in self.totals.labels.iter().zip(values).zip(classes) {
            spans.push(Span::styled(format!("{} ", label), self.theme.dim));
            spans.push(Span::styled(
                format!("{}  ", format_number(*v, 2)),
                self.theme.total_style(*class),
            ));
        }
        Line::from(spans)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
