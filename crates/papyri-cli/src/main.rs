//! Papyri CLI - documentation generator for Papyrus scripts

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use papyri_core::config::{Mode, SqlDialect};
use papyri_core::diagnostics::Severity;
use papyri_core::{Pipeline, RunConfig, RunReport};

mod logger;

#[derive(Parser)]
#[command(name = "papyri")]
#[command(version = papyri_core::VERSION)]
#[command(about = "Generate wiki documentation from Papyrus scripts", long_about = None)]
struct Cli {
    /// A .psc file or a directory scanned recursively
    scan_root: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Output renderer: wiki, sql, zip or xml
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Also emit the index page and the sidebar
    #[arg(long)]
    index: bool,

    /// Database connection: a file path, or a connection string for client-server
    #[arg(long, value_name = "CONN")]
    db_conn: Option<String>,

    /// Database dialect: embedded or client-server
    #[arg(long, value_name = "DIALECT")]
    db_dialect: Option<SqlDialect>,

    /// Schema for client-server databases
    #[arg(long, value_name = "SCHEMA")]
    db_schema: Option<String>,

    /// JSON file of types documented elsewhere
    #[arg(long, value_name = "FILE")]
    user_types: Option<PathBuf>,

    /// Project name used in the index and archive names
    #[arg(long)]
    project_name: Option<String>,

    /// Do not stamp pages with a generation marker
    #[arg(long)]
    no_marker: bool,

    /// Stamp the generation marker to the minute only
    #[arg(long)]
    no_marker_seconds: bool,

    /// Syntax highlight language: normal, fallback or a highlighter name
    #[arg(long, value_name = "LANG")]
    syntax_language: Option<String>,

    /// Prepare an XML export for documentation hosting (forces xml)
    #[arg(long)]
    hosting: bool,

    /// Site name in the XML export
    #[arg(long, value_name = "NAME")]
    wiki_name: Option<String>,

    /// Base URL in the XML export
    #[arg(long, value_name = "URL")]
    wiki_base: Option<String>,

    /// Contributor name in the XML export
    #[arg(long, value_name = "USER")]
    wiki_user: Option<String>,

    /// TOML configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Parser threads (0 = one per core)
    #[arg(short = 'j', long, value_name = "N")]
    parallel: Option<usize>,

    /// Write the run report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Configuration file values with flags applied on top
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_path(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(root) = &self.scan_root {
            config.scan_root.clone_from(root);
        }
        if let Some(out) = &self.out {
            config.output_root.clone_from(out);
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(conn) = &self.db_conn {
            config.sql.connection = Some(conn.clone());
        }
        if let Some(dialect) = self.db_dialect {
            config.sql.dialect = dialect;
        }
        if let Some(schema) = &self.db_schema {
            config.sql.schema = Some(schema.clone());
        }
        if let Some(path) = &self.user_types {
            config.user_types = Some(path.clone());
        }
        if let Some(name) = &self.project_name {
            config.project_name.clone_from(name);
        }
        if let Some(language) = &self.syntax_language {
            config.syntax_language.clone_from(language);
        }
        if let Some(name) = &self.wiki_name {
            config.site.name.clone_from(name);
        }
        if let Some(base) = &self.wiki_base {
            config.site.base_url.clone_from(base);
        }
        if let Some(user) = &self.wiki_user {
            config.site.contributor.clone_from(user);
        }
        if let Some(threads) = self.parallel {
            config.parallel = threads;
        }
        config.index |= self.index;
        config.hosting |= self.hosting;
        if self.no_marker {
            config.marker.enabled = false;
        }
        if self.no_marker_seconds {
            config.marker.seconds = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose, cli.quiet, cli.no_color);

    let config = cli.run_config()?;
    let report = Pipeline::new(&config)
        .run()
        .context("Documentation run failed")?;

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report '{}'", path.display()))?;
    }

    if !cli.quiet {
        print_summary(&config, &report);
    }

    if report.is_fatal() {
        eprintln!("Error: nothing was documented");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(config: &RunConfig, report: &RunReport) {
    println!(
        "Documented {} script(s) from {} file(s), {} excluded",
        report.scripts, report.files_scanned, report.files_excluded
    );
    for sink in &report.sinks {
        match &sink.error {
            None => println!("  {}: written to {}", sink.name, config.output_root.display()),
            Some(e) => println!("  {}: failed: {e}", sink.name),
        }
    }

    let errors = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = report.diagnostics.len() - errors;
    if errors + warnings > 0 {
        println!("{errors} error(s), {warnings} warning(s)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["papyri"]).unwrap();
        let config = cli.run_config().unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "papyri",
            "scripts",
            "--out",
            "docs",
            "--mode",
            "ZIP",
            "--index",
            "--project-name",
            "Starfield",
            "--no-marker-seconds",
            "-j",
            "4",
        ])
        .unwrap();
        let config = cli.run_config().unwrap();
        assert_eq!(config.scan_root, PathBuf::from("scripts"));
        assert_eq!(config.output_root, PathBuf::from("docs"));
        assert_eq!(config.mode, Mode::Zip);
        assert!(config.index);
        assert_eq!(config.archive_name(), "Starfield.zip");
        assert!(config.marker.enabled);
        assert!(!config.marker.seconds);
        assert_eq!(config.parallel, 4);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["papyri", "--mode", "pdf"]).is_err());
    }

    #[test]
    fn test_sql_mode_needs_connection() {
        let cli = Cli::try_parse_from(["papyri", "--mode", "sql"]).unwrap();
        assert!(cli.run_config().is_err());

        let cli = Cli::try_parse_from([
            "papyri",
            "--mode",
            "sql",
            "--db-conn",
            "host=localhost user=docs",
            "--db-dialect",
            "postgres",
        ])
        .unwrap();
        let config = cli.run_config().unwrap();
        assert_eq!(config.sql.dialect, SqlDialect::ClientServer);
    }

    #[test]
    fn test_hosting_forces_xml() {
        let cli = Cli::try_parse_from(["papyri", "--hosting", "--mode", "wiki"]).unwrap();
        let config = cli.run_config().unwrap();
        assert_eq!(config.effective_mode(), Mode::Xml);
        assert_eq!(config.archive_name(), "PapyrusDocs.xml");
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papyri.toml");
        std::fs::write(
            &path,
            "mode = \"xml\"\nproject_name = \"FromFile\"\n\n[site]\nname = \"Docs\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "papyri",
            "--config",
            path.to_str().unwrap(),
            "--project-name",
            "FromFlag",
        ])
        .unwrap();
        let config = cli.run_config().unwrap();
        assert_eq!(config.mode, Mode::Xml);
        assert_eq!(config.project_name, "FromFlag");
        assert_eq!(config.site.name, "Docs");
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["papyri", "-v", "-q"]).is_err());
    }
}
