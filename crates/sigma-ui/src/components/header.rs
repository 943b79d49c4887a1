use crate::themes::Theme;
use ratatui::text::{Line, Span};
use sigma_core::formatting::format_fixed_opt;
use sigma_core::summary::Kpis;

/// Title shown on the first header line.
pub const TITLE: &str = "VERBA SIGMA | VALIDAÇÃO DE FOLHA POR VERBA";

/// Context line values.
#[derive(Debug, Clone, Default)]
pub struct HeaderInfo {
    pub source_file: Option<String>,
    pub sheet: Option<String>,
    pub metric: Option<String>,
    pub reference: Option<String>,
    pub window: Option<usize>,
    pub ignore_zeros: bool,
}

/// Dashboard header rendering five lines:
///
/// 1. Title.
/// 2. A 60-column `=` separator.
/// 3. `[ file | sheet | metric | ref | window | zeros ]`.
/// 4. KPI counters.
/// 5. An empty line.
pub struct Header<'a> {
    pub info: &'a HeaderInfo,
    pub kpis: &'a Kpis,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(info: &'a HeaderInfo, kpis: &'a Kpis, theme: &'a Theme) -> Self {
        Self { info, kpis, theme }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let t = self.theme;
        let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        let window = match self.info.window {
            Some(n) => format!("janela: {}", n),
            None => "janela: todos".to_string(),
        };
        let zeros = if self.info.ignore_zeros {
            "zeros: ignorados"
        } else {
            "zeros: incluídos"
        };

        let mut context: Vec<Span<'a>> = vec![Span::styled("[ ", t.label)];
        let parts = [
            or_dash(&self.info.source_file),
            or_dash(&self.info.sheet),
            or_dash(&self.info.metric),
            format!("ref: {}", or_dash(&self.info.reference)),
            window,
            zeros.to_string(),
        ];
        for (i, p) in parts.into_iter().enumerate() {
            if i > 0 {
                context.push(Span::styled(" | ", t.label));
            }
            context.push(Span::styled(p, t.value));
        }
        context.push(Span::styled(" ]", t.label));

        let k = self.kpis;
        let counter = |label: &'static str, n: usize, style| {
            vec![
                Span::styled(label, t.label),
                Span::styled(n.to_string(), style),
                Span::raw("  "),
            ]
        };
        let mut kpi_line: Vec<Span<'a>> = Vec::new();
        kpi_line.extend(counter("Total: ", k.total, t.value));
        kpi_line.extend(counter("Aceitável: ", k.acceptable, t.status_ok));
        kpi_line.extend(counter("Alerta: ", k.warning, t.status_warn));
        kpi_line.extend(counter("Fora: ", k.out_of_range, t.status_danger));
        kpi_line.extend(counter("Sem histórico: ", k.no_history, t.status_na));
        kpi_line.push(Span::styled("z médio: ", t.label));
        let mean_z = format_fixed_opt(k.mean_z, 2);
        kpi_line.push(Span::styled(
            if mean_z.is_empty() { "-".to_string() } else { mean_z },
            t.value,
        ));

        vec![
            Line::from(Span::styled(TITLE, t.header)),
            Line::from(Span::styled("=".repeat(60), t.separator)),
            Line::from(context),
            Line::from(kpi_line),
            Line::from(""),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn kpis() -> Kpis {
        Kpis {
            total: 4,
            acceptable: 1,
            warning: 1,
            out_of_range: 1,
            no_history: 1,
            mean_z: Some(1.5),
        }
    }

    #[test]
    fn test_header_line_count_and_title() {
        let theme = Theme::dark();
        let info = HeaderInfo::default();
        let k = kpis();
        let lines = Header::new(&info, &k, &theme).to_lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(text(&lines[0]), TITLE);
        assert_eq!(text(&lines[1]).chars().count(), 60);
        assert!(text(&lines[4]).is_empty());
    }

    #[test]
    fn test_header_context_line() {
        let theme = Theme::dark();
        let info = HeaderInfo {
            source_file: Some("folha.xlsx".to_string()),
            sheet: None,
            metric: Some("Valor".to_string()),
            reference: Some("JUN/25".to_string()),
            window: Some(6),
            ignore_zeros: true,
        };
        let k = kpis();
        let lines = Header::new(&info, &k, &theme).to_lines();
        assert_eq!(
            text(&lines[2]),
            "[ folha.xlsx | - | Valor | ref: JUN/25 | janela: 6 | zeros: ignorados ]"
        );
    }

    #[test]
    fn test_header_kpi_line() {
        let theme = Theme::dark();
        let info = HeaderInfo::default();
        let k = kpis();
        let lines = Header::new(&info, &k, &theme).to_lines();
        let kpi = text(&lines[3]);
        assert!(kpi.starts_with("Total: 4"));
        assert!(kpi.contains("Fora: 1"));
        assert!(kpi.ends_with("z médio: 1,50"));

        let empty = Kpis::default();
        let lines = Header::new(&info, &empty, &theme).to_lines();
        assert!(text(&lines[3]).ends_with("z médio: -"));
    }
}
