//! Migrate command orchestrator
//!
//! Resolves the two ids (arguments or prompts), shows the migration plan,
//! asks for confirmation and runs the batch with a progress bar.

use crate::auth;
use crate::config::AppConfig;
use crate::terminal;
use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use multihol_core::catalog::{CatalogService, HttpCatalogClient};
use multihol_core::error::ValidationError;
use multihol_core::ids::{IdRules, validate_bib_id, validate_holding_id};
use multihol_core::{BackupWriter, BatchController, BatchReport, MigrationPlan, MoveOutcome};
use std::sync::Arc;

/// Options of one `migrate` invocation
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub bib_id: Option<String>,
    pub holding_id: Option<String>,
    /// Stop after the backup, change nothing
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
}

/// How a run ended
#[derive(Debug)]
pub enum MigrationStatus {
    DryRun(MigrationPlan),
    NothingToMove(MigrationPlan),
    Cancelled(MigrationPlan),
    Completed(BatchReport),
}

impl MigrationStatus {
    pub fn has_failures(&self) -> bool {
        matches!(self, Self::Completed(report) if report.has_failures())
    }
}

/// Runs the `migrate` command against the configured catalog
pub async fn migrate_command(config: &AppConfig, options: MigrateOptions) -> Result<MigrationStatus> {
    let bib_id = resolve_id(options.bib_id.clone(), "Bib (MMS) id", &config.ids, validate_bib_id)?;
    let holding_id = resolve_id(
        options.holding_id.clone(),
        "Target holding id",
        &config.ids,
        validate_holding_id,
    )?;

    let api_key = auth::api_key(&config.credentials.account).await?;
    let client = HttpCatalogClient::new(config.catalog_config(), &api_key)
        .context("Failed to create catalog client")?;

    let orchestrator = MigrateOrchestrator::new(Arc::new(client), config)?
        .with_progress(terminal::should_show_progress_by_default());
    orchestrator.run(&bib_id, &holding_id, &options).await
}

/// Use `given` if present, otherwise prompt until the id passes `validate`
pub fn resolve_id(
    given: Option<String>,
    prompt: &str,
    rules: &IdRules,
    validate: fn(&str, &IdRules) -> Result<(), ValidationError>,
) -> Result<String> {
    if let Some(id) = given {
        let id = id.trim().to_string();
        validate(&id, rules)?;
        return Ok(id);
    }

    if !terminal::can_prompt() {
        anyhow::bail!("{prompt} is required when not running in a terminal");
    }

    let rules = rules.clone();
    let id = Input::<String>::new()
        .with_prompt(prompt)
        .validate_with(move |input: &String| {
            validate(input.trim(), &rules).map_err(|e| e.to_string())
        })
        .interact_text()
        .with_context(|| format!("Failed to read {prompt}"))?;

    Ok(id.trim().to_string())
}

/// Drives one migration and renders it
pub struct MigrateOrchestrator {
    controller: BatchController,
    show_progress: bool,
}

impl MigrateOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogService>, config: &AppConfig) -> Result<Self> {
        let controller = BatchController::new(
            catalog,
            config.move_config()?,
            BackupWriter::new(&config.backup.directory),
        );

        Ok(Self {
            controller,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn run(
        &self,
        bib_id: &str,
        holding_id: &str,
        options: &MigrateOptions,
    ) -> Result<MigrationStatus> {
        debug!("Preparing migration of {bib_id} into {holding_id}");

        let plan = self
            .controller
            .prepare(bib_id, holding_id)
            .await
            .with_context(|| format!("Failed to prepare migration of {bib_id}"))?;

        print_plan(&plan);

        if plan.candidates.is_empty() {
            eprintln!("{}", "No items to move.".yellow());
            return Ok(MigrationStatus::NothingToMove(plan));
        }

        if options.dry_run {
            eprintln!("{}", "Dry run: no items were changed.".yellow());
            return Ok(MigrationStatus::DryRun(plan));
        }

        if !options.assume_yes && !confirm(&plan)? {
            eprintln!("Cancelled.");
            return Ok(MigrationStatus::Cancelled(plan));
        }

        let progress = self.progress_bar(plan.candidates.len() as u64);
        let report = self
            .controller
            .execute(plan, |result| {
                if let Some(pb) = &progress {
                    pb.inc(1);
                    pb.set_message(result.barcode.clone());
                }
                if let MoveOutcome::Failed { .. } = result.outcome {
                    let line = format!("✗ {}: {}", result.barcode, result.outcome)
                        .red()
                        .to_string();
                    match &progress {
                        Some(pb) => pb.println(line),
                        None => eprintln!("{line}"),
                    }
                }
            })
            .await;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        print_summary(&report);
        Ok(MigrationStatus::Completed(report))
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        Some(pb)
    }
}

fn confirm(plan: &MigrationPlan) -> Result<bool> {
    if !terminal::can_prompt() {
        anyhow::bail!("Refusing to move items without confirmation; pass --yes");
    }

    Confirm::new()
        .with_prompt(format!(
            "Move {} item(s) into holding {}?",
            plan.candidates.len(),
            plan.target_holding_id
        ))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

fn print_plan(plan: &MigrationPlan) {
    eprintln!("{}", "Migration plan".bold().blue());
    eprintln!("  Bib record:     {}", plan.bib_id);
    eprintln!("  Target holding: {} ({})", plan.target_holding_id, plan.descriptor);
    eprintln!("  Items fetched:  {}", plan.fetched);
    eprintln!("  Items to move:  {}", plan.candidates.len());
    eprintln!("  Backup:         {}", plan.backup_path.display());

    if !plan.candidates.is_empty() {
        eprintln!();
        for item in &plan.candidates {
            println!(
                "{}\t{}\t{}\t{}",
                item.barcode(),
                item.holding_id(),
                item.call_number(),
                item.alternative_call_number()
            );
        }
        eprintln!();
    }
}

fn print_summary(report: &BatchReport) {
    eprintln!("{}", "Summary".bold().green());
    eprintln!("  Moved:  {}", report.moved().to_string().green());

    if report.has_failures() {
        eprintln!("  Failed: {}", report.failed().to_string().red());
    } else {
        eprintln!("  Failed: 0");
    }

    let orphaned: Vec<_> = report.orphaned().collect();
    if !orphaned.is_empty() {
        eprintln!();
        eprintln!(
            "{}",
            "Deleted but not recreated, restore from the backup:"
                .red()
                .bold()
        );
        for result in orphaned {
            eprintln!("  {} (was in holding {})", result.barcode, result.source_holding_id);
        }
        eprintln!("  Backup: {}", report.backup_path.display());
    }
}
