//! Validation table for the terminal view.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per computed
//! group: identification, the visible descriptive columns, the statistics
//! and one cell per month coloured against the group's baseline.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use sigma_core::formatting::{format_fixed_opt, format_money, format_number};
use sigma_core::models::{ComputedRow, MonthColumn};
use sigma_core::statistics::classify_value;

use crate::themes::Theme;

/// What the table shows besides the rows themselves.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout<'a> {
    pub months: &'a [MonthColumn],
    pub visible: &'a [String],
    /// Index of the reference month in `months`.
    pub reference: Option<usize>,
    /// First row to draw.
    pub offset: usize,
}

/// Header labels, in column order. The reference month carries a `*`.
pub fn header_labels(layout: &TableLayout) -> Vec<String> {
    let mut labels: Vec<String> = vec!["Verba".into(), "Grupo".into()];
    labels.extend(layout.visible.iter().cloned());
    labels.extend(
        ["Ref", "Média", "σ", "LCL", "UCL", "Z", "Status"]
            .iter()
            .map(|s| s.to_string()),
    );
    labels.extend(layout.months.iter().enumerate().map(|(i, m)| {
        if Some(i) == layout.reference {
            format!("{}*", m.label)
        } else {
            m.label.clone()
        }
    }));
    labels
}

/// Render `rows` starting at `layout.offset` into `area`.
pub fn render_table_view(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[ComputedRow],
    layout: &TableLayout,
    theme: &Theme,
) {
    let fixed_cols = 2 + layout.visible.len();
    let header_cells = header_labels(layout).into_iter().enumerate().map(|(i, h)| {
        let is_ref = layout
            .reference
            .is_some_and(|r| i == fixed_cols + 7 + r);
        Cell::from(h).style(if is_ref {
            theme.reference_column
        } else {
            theme.table_header
        })
    });
    let header = Row::new(header_cells).height(1);

    let data_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .skip(layout.offset)
        .map(|(i, row)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            let mut cells = vec![
                Cell::from(row.verba_key().to_string()),
                Cell::from(row.group_label.clone()),
            ];
            cells.extend(
                layout
                    .visible
                    .iter()
                    .map(|c| Cell::from(row.descriptive(c).to_string())),
            );
            cells.push(Cell::from(format_money(Some(row.ref_val))));
            cells.push(Cell::from(format_money(row.mean)));
            cells.push(Cell::from(format_money(row.sigma)));
            cells.push(Cell::from(format_money(row.lcl)));
            cells.push(Cell::from(format_money(row.ucl)));
            cells.push(Cell::from(format_fixed_opt(row.z, 2)));
            cells.push(Cell::from(row.status.label()).style(theme.status_style(row.status)));
            cells.extend((0..layout.months.len()).map(|m| {
                let value = row.month_values.get(m).copied().flatten();
                let class = classify_value(value, row.mean, row.sigma);
                Cell::from(format_number(value.unwrap_or(0.0), 2)).style(theme.cell_style(class))
            }));
            Row::new(cells).style(style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(28), Constraint::Length(20)];
    widths.extend(layout.visible.iter().map(|_| Constraint::Length(14)));
    widths.extend([
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(7),
        Constraint::Length(14),
    ]);
    widths.extend(layout.months.iter().map(|_| Constraint::Length(11)));

    let table = Table::new(data_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Placeholder shown when nothing is loaded or every row was filtered out.
pub fn render_no_data(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.status_warn)),
        Line::from(""),
        Line::from(Span::styled(
            "Importe uma planilha com colunas 'Código', 'Descrição' e meses (ex.: 'JUN/25 - Valor').",
            theme.dim,
        )),
        Line::from(Span::styled("Pressione 'q' ou Ctrl+C para sair", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text))
            .block(Block::default().borders(Borders::ALL).title(" Verba Sigma ")),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use sigma_core::models::{Group, Status};
    use std::collections::BTreeMap;

    fn months() -> Vec<MonthColumn> {
        ["JAN/25", "FEV/25", "MAR/25"]
            .iter()
            .map(|l| MonthColumn {
                key: l.to_string(),
                label: l.to_string(),
                month: 1,
                year: 2025,
                header: None,
            })
            .collect()
    }

    fn rows() -> Vec<ComputedRow> {
        let group = Group {
            key: "001 - SALARIO|ACME".to_string(),
            verba_key: "001 - SALARIO".to_string(),
            code: "001".to_string(),
            description: "SALARIO".to_string(),
            group_by: vec!["Empresa".to_string()],
            group_parts: vec!["ACME".to_string()],
            extras: BTreeMap::from([("Nome".to_string(), "Ana".to_string())]),
            values: BTreeMap::new(),
        };
        vec![ComputedRow {
            group_label: group.label(),
            group,
            month_values: vec![Some(100.0), Some(102.0), Some(500.0)],
            ref_val: 500.0,
            mean: Some(101.0),
            sigma: Some(1.414),
            lcl: Some(96.8),
            ucl: Some(105.2),
            z: Some(282.1),
            status: Status::OutOfRange,
        }]
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_header_labels_mark_reference() {
        let m = months();
        let visible = vec!["Nome".to_string()];
        let layout = TableLayout {
            months: &m,
            visible: &visible,
            reference: Some(2),
            offset: 0,
        };
        let labels = header_labels(&layout);
        assert_eq!(labels[2], "Nome");
        assert_eq!(labels[3], "Ref");
        assert_eq!(labels.last().map(String::as_str), Some("MAR/25*"));
        assert_eq!(labels.len(), 3 + 7 + 3);
    }

    #[test]
    fn test_render_table_view_shows_rows() {
        let backend = TestBackend::new(220, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let m = months();
        let visible = vec!["Nome".to_string()];
        let layout = TableLayout {
            months: &m,
            visible: &visible,
            reference: Some(2),
            offset: 0,
        };
        let r = rows();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_table_view(frame, area, "Verbas", &r, &layout, &theme);
            })
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("001 - SALARIO"));
        assert!(text.contains("Fora"));
        assert!(text.contains("MAR/25*"));
    }

    #[test]
    fn test_render_table_view_offset_past_end_does_not_panic() {
        let backend = TestBackend::new(120, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::light();
        let m = months();
        let layout = TableLayout {
            months: &m,
            visible: &[],
            reference: None,
            offset: 50,
        };
        let r = rows();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_table_view(frame, area, "Verbas", &r, &layout, &theme);
            })
            .unwrap();
    }

    #[test]
    fn test_render_no_data_does_not_panic() {
        let backend = TestBackend::new(100, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::classic();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_no_data(frame, area, "Nenhum dado carregado", &theme);
            })
            .unwrap();
        assert!(buffer_text(&terminal).contains("Nenhum dado carregado"));
    }
}
