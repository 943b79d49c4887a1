mod bootstrap;
mod summary;

use anyhow::{anyhow, Result};
use chrono::Local;
use sigma_core::error::SigmaError;
use sigma_core::settings::Settings;
use sigma_data::export::{txt_file_name, xlsx_file_name};
use sigma_data::store::StateStore;
use sigma_runtime::session::ValidationSession;
use sigma_ui::app::App;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Verba Sigma v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("View: {}, Theme: {}", settings.view, settings.theme);

    let store = StateStore::new(settings.resolved_state_dir());
    let mut session = ValidationSession::new(Some(store));

    if settings.clear {
        session.clear().map_err(user_error)?;
        tracing::info!("Saved configuration and persisted import cleared");
        if settings.file.is_none() {
            println!("Configuração e importação salvas foram apagadas.");
            return Ok(());
        }
    }

    match &settings.file {
        Some(path) => {
            tracing::info!(file = %path.display(), "Importing spreadsheet");
            session
                .import_file(path, settings.sheet.as_deref())
                .map_err(user_error)?;
        }
        None => {
            if session.restore().map_err(user_error)? {
                tracing::info!("Restored the persisted import");
            }
        }
    }

    if !session.has_data() && settings.view != "tui" {
        eprintln!("Nenhum dado carregado. Informe uma planilha: verba-sigma <ARQUIVO>");
        return Ok(());
    }

    apply_selections(&mut session, &settings)?;

    let session = match settings.view.as_str() {
        "table" => {
            print!("{}", session.render_report());
            session
        }
        "summary" => {
            print!(
                "{}",
                summary::render_summary(
                    &session.kpis(),
                    &session.month_totals(),
                    &session.diagnostics()
                )
            );
            session
        }
        "tui" => App::new(&settings.theme, session).run()?,
        other => {
            eprintln!("Unknown view mode: {}", other);
            session
        }
    };

    run_exports(&session, &settings)?;

    Ok(())
}

/// Push the command-line selections into the session.
fn apply_selections(session: &mut ValidationSession, settings: &Settings) -> Result<()> {
    if !session.has_data() {
        return Ok(());
    }
    if let Some(metric) = &settings.metric {
        session.set_metric(metric).map_err(user_error)?;
    }
    if !settings.group_by.is_empty() {
        session.set_group_by(&settings.group_by);
    }
    if !settings.visible.is_empty() {
        session.set_visible(&settings.visible);
    }
    session.set_params(settings.statistics_params());
    session.set_filters(settings.row_filters().map_err(user_error)?);
    session.set_sort(settings.sort_state().map_err(user_error)?);

    tracing::debug!(
        groups = session.groups().len(),
        rows = session.rows().len(),
        months = session.months().len(),
        "Selections applied"
    );
    Ok(())
}

fn run_exports(session: &ValidationSession, settings: &Settings) -> Result<()> {
    if settings.export_txt.is_none() && settings.export_xlsx.is_none() {
        return Ok(());
    }
    if !session.has_data() {
        return Err(anyhow!("Nada para exportar: nenhum dado carregado"));
    }
    let today = Local::now().date_naive();

    if let Some(target) = &settings.export_txt {
        let path = bootstrap::export_target(target, &txt_file_name(today));
        session.export_txt(&path).map_err(user_error)?;
        tracing::info!(path = %path.display(), "Text report written");
        eprintln!("Relatório salvo em {}", path.display());
    }
    if let Some(target) = &settings.export_xlsx {
        let path = bootstrap::export_target(target, &xlsx_file_name(session.metric(), today));
        session.export_tabular(&path).map_err(user_error)?;
        tracing::info!(path = %path.display(), "Tabular export written");
        eprintln!("Planilha salva em {}", path.display());
    }
    Ok(())
}

fn user_error(e: SigmaError) -> anyhow::Error {
    tracing::error!(error = %e, "Operation failed");
    anyhow!(e.user_message())
}
