//! Run configuration (`papyri.toml`) parsing and validation.
//!
//! [`RunConfig`] is the resolved configuration the pipeline consumes. Every
//! field has a default, so a config file only needs the values it changes;
//! the CLI layers its own flags on top.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Archive name used when preparing documentation for hosting
pub const HOSTING_ARCHIVE: &str = "PapyrusDocs.xml";

/// Errors that can occur when loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("sql mode requires a connection string")]
    MissingConnection,

    #[error("invalid connection '{0}': {1}")]
    InvalidConnection(String, &'static str),

    #[error("unknown mode '{0}', expected one of: wiki, sql, zip, xml")]
    UnknownMode(String),

    #[error("unknown sql dialect '{0}', expected one of: embedded, client-server")]
    UnknownDialect(String),

    #[error("project name must not be empty")]
    EmptyProjectName,
}

/// Primary output renderer of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Wiki,
    Sql,
    Zip,
    Xml,
}

impl Mode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wiki => "wiki",
            Self::Sql => "sql",
            Self::Zip => "zip",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wiki" => Ok(Self::Wiki),
            "sql" => Ok(Self::Sql),
            "zip" => Ok(Self::Zip),
            "xml" => Ok(Self::Xml),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// SQL backend family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SqlDialect {
    /// File-based database (SQLite)
    #[default]
    #[serde(alias = "sqlite")]
    Embedded,
    /// Database server (PostgreSQL)
    #[serde(alias = "postgres")]
    ClientServer,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::ClientServer => f.write_str("client-server"),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" | "sqlite" => Ok(Self::Embedded),
            "client-server" | "postgres" | "postgresql" => Ok(Self::ClientServer),
            _ => Err(ConfigError::UnknownDialect(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqlConfig {
    /// Database file path or server connection string
    pub connection: Option<String>,
    pub dialect: SqlDialect,
    /// Table prefix schema for the client/server backend
    pub schema: Option<String>,
}

/// Invisible generation marker appended to wiki pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    pub enabled: bool,
    /// Seconds precision; minutes otherwise
    pub seconds: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seconds: true,
        }
    }
}

/// Identity of the target wiki, used by the XML export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    pub contributor: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Papyrus Docs Wiki".to_string(),
            base_url: "http://papyruswiki.localhost/wiki/Main_Page".to_string(),
            contributor: "papyri".to_string(),
        }
    }
}

/// The complete configuration of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// A `.psc` file or a directory scanned recursively
    pub scan_root: PathBuf,
    pub output_root: PathBuf,
    pub mode: Mode,
    /// Emit the index and navigation artifacts
    pub index: bool,
    /// Prepare an XML export for documentation hosting
    pub hosting: bool,
    pub sql: SqlConfig,
    pub user_types: Option<PathBuf>,
    pub project_name: String,
    pub marker: MarkerConfig,
    /// `normal`, `fallback` or a highlighter language name
    pub syntax_language: String,
    pub site: SiteConfig,
    /// Parse worker threads; 0 uses the global pool
    pub parallel: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scan_root: PathBuf::from("."),
            output_root: PathBuf::from("output"),
            mode: Mode::default(),
            index: false,
            hosting: false,
            sql: SqlConfig::default(),
            user_types: None,
            project_name: "PapyrusDocs".to_string(),
            marker: MarkerConfig::default(),
            syntax_language: "normal".to_string(),
            site: SiteConfig::default(),
            parallel: 0,
        }
    }
}

impl RunConfig {
    /// Load a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the values are inconsistent.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can drive a run.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::EmptyProjectName);
        }
        if self.effective_mode() != Mode::Sql {
            return Ok(());
        }
        let connection = self
            .sql
            .connection
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::MissingConnection)?;
        match self.sql.dialect {
            SqlDialect::Embedded => {
                if Path::new(connection).is_dir() {
                    return Err(ConfigError::InvalidConnection(
                        connection.to_string(),
                        "embedded database path is a directory",
                    ));
                }
            }
            SqlDialect::ClientServer => {
                if !connection.contains('=') && !connection.starts_with("postgres") {
                    return Err(ConfigError::InvalidConnection(
                        connection.to_string(),
                        "expected 'key=value' pairs or a postgres:// URL",
                    ));
                }
            }
        }
        Ok(())
    }

    /// The renderer actually used; hosting preparation always exports XML
    #[must_use]
    pub fn effective_mode(&self) -> Mode {
        if self.hosting {
            Mode::Xml
        } else {
            self.mode
        }
    }

    /// File name of the single-file archive for zip and xml modes
    #[must_use]
    pub fn archive_name(&self) -> String {
        match self.effective_mode() {
            Mode::Xml if self.hosting => HOSTING_ARCHIVE.to_string(),
            Mode::Xml => format!("{}.xml", self.project_name),
            _ => format!("{}.zip", self.project_name),
        }
    }

    /// Highlighter language for `syntaxhighlight` blocks
    #[must_use]
    pub fn highlight_language(&self) -> String {
        match self.syntax_language.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => "papyrus".to_string(),
            "fallback" => "AutoIt".to_string(),
            other => other.to_string(),
        }
    }
}
