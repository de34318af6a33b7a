//! # CLI Command Implementations
//!
//! Reports and listings go to stdout; diagnostics go through `tracing`.

use super::{Context, ExtractField, ImportOptions};
use portkit_core::{CacheWrite, Catalog, ImportMode, ImportOutcome, Module, PortkitError, Report};
use std::path::{Path, PathBuf};

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn load_catalog(ctx: &Context) -> Result<Catalog, PortkitError> {
    ctx.importer(ctx.project_root.clone())
        .catalog(&ctx.config.local_dirs)
}

// =============================================================================
// LIST / FIND
// =============================================================================

/// List all modules.
pub fn cmd_list(ctx: &Context) -> Result<(), PortkitError> {
    let catalog = load_catalog(ctx)?;

    if ctx.json {
        let names: Vec<&str> = catalog.names().collect();
        print_json(&serde_json::json!({ "modules": names }));
        return Ok(());
    }

    for name in catalog.names() {
        println!("{name}");
    }
    Ok(())
}

/// Find the modules that list each of `files`.
pub fn cmd_find(ctx: &Context, files: &[String]) -> Result<(), PortkitError> {
    let catalog = load_catalog(ctx)?;

    if ctx.json {
        let found: serde_json::Map<String, serde_json::Value> = files
            .iter()
            .map(|file| {
                let owners: Vec<&str> = catalog.find_by_file(file).map(Module::name).collect();
                (file.clone(), serde_json::json!(owners))
            })
            .collect();
        print_json(&serde_json::Value::Object(found));
        return Ok(());
    }

    for file in files {
        let mut owners = catalog.find_by_file(file).peekable();
        if owners.peek().is_none() {
            tracing::warn!(file = %file, "no module contains this file");
        }
        for module in owners {
            println!("{}", module.name());
        }
    }
    Ok(())
}

// =============================================================================
// IMPORT FAMILY
// =============================================================================

/// Run `import`, `add-import`, `remove-import` or `update`.
pub fn cmd_import(
    ctx: &Context,
    mode: ImportMode,
    modules: Vec<String>,
    options: &ImportOptions,
) -> Result<(), PortkitError> {
    let overrides = options.overrides(modules, ctx.config.local_dirs.clone());
    let outcome = ctx
        .importer(ctx.project_root.clone())
        .with_links(options.links())
        .dry_run(options.dry_run)
        .run(mode, &overrides)?;
    print_outcome(ctx, &outcome);
    Ok(())
}

/// Create a scratch package under `testdir`. Local dirs stay relative to
/// the invoking project, not to the new directory.
pub fn cmd_create_testdir(
    ctx: &Context,
    testdir: PathBuf,
    modules: Vec<String>,
    options: &ImportOptions,
) -> Result<(), PortkitError> {
    let local_dirs = ctx
        .config
        .local_dirs
        .iter()
        .map(|dir| {
            let dir = ctx.project_root.join(dir);
            std::path::absolute(&dir).map_err(|e| PortkitError::io(&dir, e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let overrides = options.overrides(modules, local_dirs);
    let outcome = ctx
        .importer(testdir)
        .with_links(options.links())
        .dry_run(options.dry_run)
        .create_testdir(&overrides)?;
    print_outcome(ctx, &outcome);
    Ok(())
}

fn print_outcome(ctx: &Context, outcome: &ImportOutcome) {
    if ctx.json {
        print_json(&serde_json::json!({
            "mode": outcome.mode,
            "modules": outcome.closure.full,
            "main": outcome.closure.main,
            "test_only": outcome.closure.test_only,
            "report": outcome.report,
            "cache": outcome.cache,
            "cache_path": outcome.cache_path,
        }));
        return;
    }
    if ctx.quiet {
        return;
    }

    print_modules(outcome);
    print_report(&outcome.report);
    let cache = outcome.cache_path.display();
    match outcome.cache {
        CacheWrite::Created => println!("Creating {cache}"),
        CacheWrite::Updated => println!("Updating {cache}"),
        CacheWrite::Skipped => println!("Would write {cache}"),
    }
}

fn print_modules(outcome: &ImportOutcome) {
    println!("Module list with included dependencies (indented):");
    for name in &outcome.closure.full {
        let marker = if outcome.settings.modules.contains(name) {
            ""
        } else {
            "  "
        };
        println!("  {marker}{name}");
    }
    if !outcome.closure.test_only.is_empty() {
        println!("Test-only modules:");
        for name in &outcome.closure.test_only {
            println!("  {name}");
        }
    }
}

fn print_report(report: &Report) {
    for line in report.lines() {
        println!("{line}");
    }
}

// =============================================================================
// EXTRACT
// =============================================================================

/// Print `field` for each of `modules`.
pub fn cmd_extract(
    ctx: &Context,
    field: ExtractField,
    modules: &[String],
) -> Result<(), PortkitError> {
    let catalog = load_catalog(ctx)?;

    let mut values = Vec::with_capacity(modules.len());
    for name in modules {
        let module = catalog.require(name)?;
        values.push((name.as_str(), extract(&catalog, module, field)));
    }

    if ctx.json {
        let map: serde_json::Map<String, serde_json::Value> = values
            .into_iter()
            .map(|(name, value)| (name.to_string(), serde_json::Value::String(value)))
            .collect();
        print_json(&serde_json::Value::Object(map));
        return Ok(());
    }

    for (_, value) in values {
        print!("{value}");
    }
    Ok(())
}

/// Text of `field` for `module`, newline-terminated unless empty.
#[must_use]
pub fn extract(catalog: &Catalog, module: &Module, field: ExtractField) -> String {
    let lines = |items: Vec<String>| -> String {
        items.into_iter().map(|l| format!("{l}\n")).collect()
    };
    let snippets = module.snippets();
    match field {
        ExtractField::Description => snippets.description.clone(),
        ExtractField::Comment => snippets.comment.clone(),
        ExtractField::Status => match module.status() {
            portkit_core::ModuleStatus::Normal => String::new(),
            status => format!("{}\n", status.as_str()),
        },
        ExtractField::Notice => snippets.notice.clone(),
        ExtractField::Applicability => format!("{}\n", module.applicability().as_str()),
        ExtractField::Filelist => lines(module.files().iter().cloned().collect()),
        ExtractField::Dependencies => {
            lines(module.dependencies().iter().map(ToString::to_string).collect())
        }
        ExtractField::AutoconfEarly => snippets.autoconf_early.clone(),
        ExtractField::Autoconf => snippets.autoconf.clone(),
        ExtractField::Automake => snippets.automake.clone(),
        ExtractField::Include => snippets.include.clone(),
        ExtractField::Link => snippets.link.clone(),
        ExtractField::License => {
            let licenses: Vec<&str> = module.licenses().iter().map(String::as_str).collect();
            format!("{}\n", licenses.join(" or "))
        }
        ExtractField::Maintainer => snippets.maintainer.clone(),
        ExtractField::TestsModule => catalog
            .tests_module_of(module.name())
            .map(|m| format!("{}\n", m.name()))
            .unwrap_or_default(),
    }
}

// =============================================================================
// COPY FILE
// =============================================================================

/// Copy one file into the project.
pub fn cmd_copy_file(
    ctx: &Context,
    file: &str,
    dest: Option<&Path>,
    dry_run: bool,
) -> Result<(), PortkitError> {
    let record = ctx
        .importer(ctx.project_root.clone())
        .dry_run(dry_run)
        .copy_file(file, dest, &ctx.config.local_dirs)?;

    if ctx.json {
        print_json(&serde_json::json!(record));
        return Ok(());
    }
    if !ctx.quiet {
        if let Some(line) = record.action.describe(&record.destination, dry_run) {
            println!("{line}");
        }
    }
    Ok(())
}
