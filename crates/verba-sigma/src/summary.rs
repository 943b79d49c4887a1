//! Plain-text summary printed by `--view summary`.

use sigma_core::formatting::{format_fixed_opt, format_number};
use sigma_core::summary::{Diagnostics, Kpis, MonthTotals};

/// KPI counters, per-month totals and the diagnostics block.
pub fn render_summary(kpis: &Kpis, totals: &MonthTotals, diag: &Diagnostics) -> String {
    let mut lines: Vec<String> = Vec::new();

    let mean_z = format_fixed_opt(kpis.mean_z, 2);
    lines.push("Resumo".to_string());
    lines.push("-".repeat(40));
    lines.push(format!("Linhas:         {}", kpis.total));
    lines.push(format!("Aceitável:      {}", kpis.acceptable));
    lines.push(format!("Alerta:         {}", kpis.warning));
    lines.push(format!("Fora:           {}", kpis.out_of_range));
    lines.push(format!("Sem histórico:  {}", kpis.no_history));
    lines.push(format!(
        "Z médio:        {}",
        if mean_z.is_empty() { "-" } else { mean_z.as_str() }
    ));

    if !totals.labels.is_empty() {
        lines.push(String::new());
        lines.push(format!("{:<10} {:>16} {:>16} {:>16}", "Mês", "Total", "Fora", "Alerta"));
        let at = |series: &[f64], i: usize| format_number(series.get(i).copied().unwrap_or(0.0), 2);
        for (i, label) in totals.labels.iter().enumerate() {
            lines.push(format!(
                "{:<10} {:>16} {:>16} {:>16}",
                label,
                at(&totals.all, i),
                at(&totals.out_of_range, i),
                at(&totals.warning, i),
            ));
        }
    }

    lines.push(String::new());
    lines.push("Diagnóstico".to_string());
    lines.push("-".repeat(40));
    lines.push(format!("Grupos:              {}", diag.group_count));
    lines.push(format!("Meses:               {}", diag.month_count));
    let group_by = if diag.group_by.is_empty() {
        "-".to_string()
    } else {
        diag.group_by.join(", ")
    };
    lines.push(format!("Agrupado por:        {}", group_by));
    lines.push(format!(
        "Colunas descritivas: {} ({} visíveis)",
        diag.descriptive_count, diag.visible_count
    ));
    lines.push(format!("Sem histórico:       {}", diag.no_history));
    lines.push(format!("Fora:                {}", diag.out_of_range));

    if !diag.top_out_of_range.is_empty() {
        lines.push(String::new());
        lines.push("Verbas com mais linhas fora:".to_string());
        lines.extend(
            diag.top_out_of_range
                .iter()
                .map(|r| format!("  {} - {} de {}", r.verba_key, r.out_of_range, r.total)),
        );
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
