//! `plancheck list` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use plancheck_core::config::{PlancheckConfig, normalize_path};

use crate::commands::resolve_root;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
pub async fn execute(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "listing cases");

    let config = PlancheckConfig::load(config_path).await?;
    let report = build_list_report(config_path, &config).await;

    writer.render(&report)?;
    Ok(())
}

async fn build_list_report(config_path: &Path, config: &PlancheckConfig) -> CaseListReport {
    let root = resolve_root(config_path, &config.suite.root);

    let mut cases = Vec::with_capacity(config.suite.cases.len());
    for (name, entry) in &config.suite.cases {
        let path = entry.path_or(name);
        let resolved = normalize_path(&root.join(path));
        let exists = tokio::fs::metadata(&resolved)
            .await
            .is_ok_and(|m| m.is_dir());
        cases.push(CaseListEntry {
            name: name.clone(),
            path: path.to_owned(),
            resolved: resolved.display().to_string(),
            enabled: entry.is_enabled(),
            exists,
        });
    }

    CaseListReport {
        source: config_path.display().to_string(),
        root: root.display().to_string(),
        enabled: cases.iter().filter(|c| c.enabled).count(),
        total: cases.len(),
        cases,
    }
}

#[derive(Serialize)]
pub struct CaseListReport {
    pub source: String,
    pub root: String,
    pub enabled: usize,
    pub total: usize,
    pub cases: Vec<CaseListEntry>,
}

#[derive(Serialize)]
pub struct CaseListEntry {
    pub name: String,
    pub path: String,
    pub resolved: String,
    pub enabled: bool,
    pub exists: bool,
}

impl Render for CaseListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Cases in {} (root: {})", self.source.bold(), self.root)?;
        writeln!(w)?;

        if self.cases.is_empty() {
            writeln!(w, "  (no cases declared)")?;
            return Ok(());
        }

        let width = self.cases.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for case in &self.cases {
            let flag = if case.enabled {
                "on ".green()
            } else {
                "off".dimmed()
            };
            let missing = if case.exists {
                String::new()
            } else {
                format!("  {}", "(missing)".red())
            };
            writeln!(w, "  [{}] {:<width$}  {}{}", flag, case.name, case.path, missing)?;
        }

        writeln!(w)?;
        writeln!(w, "{} of {} cases enabled", self.enabled, self.total)?;
        Ok(())
    }
}
