//! # portkit CLI Module
//!
//! ## Available Commands
//!
//! - `list` - List all modules
//! - `find` - Find the modules that contain a file
//! - `import` / `add-import` / `remove-import` / `update` - Import modules
//! - `create-testdir` - Create a scratch package with modules and their tests
//! - `extract` - Print one field of module descriptions
//! - `copy-file` - Copy a single file into the project

mod commands;

use crate::config::{Config, Environment, FileConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use portkit_core::{
    ImportMode, Importer, LgplVersion, LinkMode, LinkPolicy, PatchTool, PortkitError,
    SettingsOverrides,
};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// portkit - import portable source modules into autoconf projects
///
/// Resolves the modules you name together with everything they depend on,
/// and keeps the project's copy of their files up to date.
#[derive(Parser, Debug)]
#[command(name = "portkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project directory
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Canonical module source tree
    #[arg(long, global = true)]
    pub source_dir: Option<PathBuf>,

    /// Local override tree (repeatable, highest priority first)
    #[arg(long = "local-dir", global = true)]
    pub local_dirs: Vec<PathBuf>,

    /// Configuration file (default: <dir>/portkit.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all modules
    List,

    /// Find the modules that contain the given files
    Find {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Import modules, replacing the cached module list
    Import {
        #[arg(required = true)]
        modules: Vec<String>,

        #[command(flatten)]
        options: ImportOptions,
    },

    /// Add modules to the cached module list
    AddImport {
        #[arg(required = true)]
        modules: Vec<String>,

        #[command(flatten)]
        options: ImportOptions,
    },

    /// Remove modules from the cached module list
    RemoveImport {
        #[arg(required = true)]
        modules: Vec<String>,

        #[command(flatten)]
        options: ImportOptions,
    },

    /// Re-run the cached import
    Update {
        #[command(flatten)]
        options: ImportOptions,
    },

    /// Create a scratch package with the given modules and their tests
    CreateTestdir {
        /// Directory to create (must not exist)
        #[arg(long)]
        testdir: PathBuf,

        #[arg(required = true)]
        modules: Vec<String>,

        #[command(flatten)]
        options: ImportOptions,
    },

    /// Print one field of module descriptions
    Extract {
        #[arg(value_enum)]
        field: ExtractField,

        #[arg(required = true)]
        modules: Vec<String>,
    },

    /// Copy a single file into the project
    CopyFile {
        /// Logical file name, e.g. lib/strdup.c
        file: String,

        /// Destination file or directory
        dest: Option<PathBuf>,

        /// Show what would happen without writing
        #[arg(long)]
        dry_run: bool,
    },
}

/// Options shared by the import family.
#[derive(Args, Debug, Clone, Default)]
pub struct ImportOptions {
    /// Directory for source files
    #[arg(long)]
    pub source_base: Option<String>,

    /// Directory for autoconf macros
    #[arg(long)]
    pub m4_base: Option<String>,

    /// Directory for documentation
    #[arg(long)]
    pub doc_base: Option<String>,

    /// Directory for unit tests
    #[arg(long)]
    pub tests_base: Option<String>,

    /// Directory for auxiliary build tools
    #[arg(long)]
    pub aux_dir: Option<String>,

    /// Include unit tests
    #[arg(long)]
    pub with_tests: bool,

    /// Include obsolete modules
    #[arg(long)]
    pub with_obsolete: bool,

    /// Include unit tests written in C++
    #[arg(long = "with-c++-tests")]
    pub with_cxx_tests: bool,

    /// Include very long-running unit tests
    #[arg(long)]
    pub with_longrunning_tests: bool,

    /// Include unit tests that need root privileges
    #[arg(long)]
    pub with_privileged_tests: bool,

    /// Include unit tests that fail on some platforms
    #[arg(long)]
    pub with_unportable_tests: bool,

    /// Never include this module (repeatable)
    #[arg(long = "avoid", value_name = "MODULE")]
    pub avoid: Vec<String>,

    /// Require modules usable under the LGPL (2, 3 or 3orGPLv2)
    #[arg(
        long,
        value_name = "VERSION",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "3",
        value_parser = parse_lgpl
    )]
    pub lgpl: Option<LgplVersion>,

    /// Show what would happen without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Symlink canonical files instead of copying
    #[arg(long, conflicts_with = "hardlink")]
    pub symlink: bool,

    /// Hard-link canonical files instead of copying
    #[arg(long)]
    pub hardlink: bool,

    /// Symlink files from local override trees
    #[arg(long, conflicts_with = "local_hardlink")]
    pub local_symlink: bool,

    /// Hard-link files from local override trees
    #[arg(long)]
    pub local_hardlink: bool,
}

fn parse_lgpl(value: &str) -> Result<LgplVersion, String> {
    value.parse()
}

impl ImportOptions {
    /// Overrides for `modules` under these options.
    #[must_use]
    pub fn overrides(&self, modules: Vec<String>, local_dirs: Vec<PathBuf>) -> SettingsOverrides {
        SettingsOverrides {
            modules,
            avoid: self.avoid.clone(),
            local_dirs,
            source_base: self.source_base.clone(),
            m4_base: self.m4_base.clone(),
            doc_base: self.doc_base.clone(),
            tests_base: self.tests_base.clone(),
            aux_dir: self.aux_dir.clone(),
            tests: self.with_tests,
            obsolete: self.with_obsolete,
            cxx_tests: self.with_cxx_tests,
            longrunning_tests: self.with_longrunning_tests,
            privileged_tests: self.with_privileged_tests,
            unportable_tests: self.with_unportable_tests,
            lgpl: self.lgpl,
        }
    }

    #[must_use]
    pub const fn links(&self) -> LinkPolicy {
        const fn mode(symlink: bool, hardlink: bool) -> LinkMode {
            if symlink {
                LinkMode::Symlink
            } else if hardlink {
                LinkMode::Hardlink
            } else {
                LinkMode::Copy
            }
        }
        LinkPolicy {
            canonical: mode(self.symlink, self.hardlink),
            local: mode(self.local_symlink, self.local_hardlink),
        }
    }
}

/// Fields `extract` can print.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractField {
    Description,
    Comment,
    Status,
    Notice,
    Applicability,
    Filelist,
    Dependencies,
    AutoconfEarly,
    Autoconf,
    Automake,
    Include,
    Link,
    License,
    Maintainer,
    TestsModule,
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Per-invocation state shared by all commands.
#[derive(Debug, Clone)]
pub struct Context {
    pub project_root: PathBuf,
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

impl Context {
    /// An importer for `project_root` with the configured sources.
    #[must_use]
    pub fn importer(&self, project_root: PathBuf) -> Importer {
        Importer::new(project_root, &self.config.source_dir)
            .with_patch_tool(PatchTool::new(&self.config.patch_program))
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), PortkitError> {
    let file = FileConfig::load(&cli.dir, cli.config.as_deref())?;
    let config = Config::layer(cli.source_dir, cli.local_dirs, Environment::from_env(), file)?;
    let ctx = Context {
        project_root: cli.dir,
        config,
        json: cli.json,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::List => cmd_list(&ctx),
        Commands::Find { files } => cmd_find(&ctx, &files),
        Commands::Import { modules, options } => {
            cmd_import(&ctx, ImportMode::Import, modules, &options)
        }
        Commands::AddImport { modules, options } => {
            cmd_import(&ctx, ImportMode::AddImport, modules, &options)
        }
        Commands::RemoveImport { modules, options } => {
            cmd_import(&ctx, ImportMode::RemoveImport, modules, &options)
        }
        Commands::Update { options } => cmd_import(&ctx, ImportMode::Update, Vec::new(), &options),
        Commands::CreateTestdir {
            testdir,
            modules,
            options,
        } => cmd_create_testdir(&ctx, testdir, modules, &options),
        Commands::Extract { field, modules } => cmd_extract(&ctx, field, &modules),
        Commands::CopyFile {
            file,
            dest,
            dry_run,
        } => cmd_copy_file(&ctx, &file, dest.as_deref(), dry_run),
    }
}
