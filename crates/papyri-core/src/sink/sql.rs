//! Relational output
//!
//! Scripts are normalized into `script`, `property`, `function` and
//! `parameter` rows; the index and the sidebar are stored in `misc_page`.
//! Each script is written in its own transaction. Tables are created when
//! missing and emptied when the sink opens, so a re-run over the same
//! corpus yields the same rows.

use crate::config::{SqlConfig, SqlDialect};
use crate::doc::{Function, LinkContext, Resolution, ScriptDecl};

use super::wiki::{Page, WikiOptions, WikiRenderer};
use super::{EmitContext, Sink, SinkError};

/// One `property` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub name: String,
    pub type_ref: String,
    pub auto_kind: String,
    pub default: Option<String>,
    pub description: Option<String>,
    pub flags: String,
    pub group_name: Option<String>,
}

/// One `parameter` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRow {
    pub name: String,
    pub type_ref: String,
    pub default: Option<String>,
    pub position: i32,
}

/// One `function` row and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRow {
    pub name: String,
    pub return_type_ref: Option<String>,
    pub description: Option<String>,
    pub flags: String,
    /// Owning state for state overrides
    pub state: Option<String>,
    pub is_event: bool,
    pub params: Vec<ParameterRow>,
}

/// Every row of one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRows {
    pub name: String,
    pub extends_ref: Option<String>,
    pub description: Option<String>,
    pub properties: Vec<PropertyRow>,
    pub functions: Vec<FunctionRow>,
}

fn description(doc: Option<&crate::doc::DocComment>) -> Option<String> {
    doc.map(crate::doc::DocComment::text)
        .filter(|text| !text.is_empty())
}

fn function_row(function: &Function, state: Option<&str>) -> FunctionRow {
    let flags: Vec<&str> = function
        .flags
        .iter()
        .filter(|f| *f != crate::doc::Flag::Event)
        .map(crate::doc::Flag::as_str)
        .collect();
    FunctionRow {
        name: function.name.clone(),
        return_type_ref: function.return_type.as_ref().map(ToString::to_string),
        description: description(function.doc.as_ref()),
        flags: flags.join(" "),
        state: state.map(String::from),
        is_event: function.is_event(),
        params: function
            .params
            .iter()
            .zip(0..)
            .map(|(param, position)| ParameterRow {
                name: param.name.clone(),
                type_ref: param.ty.to_string(),
                default: param.default.clone(),
                position,
            })
            .collect(),
    }
}

impl ScriptRows {
    /// Flatten a script; the extends reference is stored as its link target
    pub fn from_script(script: &ScriptDecl, links: &LinkContext) -> Self {
        let extends_ref = script.extends.as_ref().map(|ty| match links.resolve(ty) {
            Resolution::Internal(target) | Resolution::External(target) => target.page.clone(),
            Resolution::Unknown => ty.to_string(),
        });
        let properties = script
            .properties
            .iter()
            .map(|p| PropertyRow {
                name: p.name.clone(),
                type_ref: p.ty.to_string(),
                auto_kind: p.auto_kind.as_str().to_string(),
                default: p.default.clone(),
                description: description(p.doc.as_ref()),
                flags: p.flags.to_string(),
                group_name: p.group.clone(),
            })
            .collect();
        let functions = script
            .functions
            .iter()
            .map(|f| function_row(f, None))
            .chain(script.states.iter().flat_map(|state| {
                state
                    .functions
                    .iter()
                    .map(move |f| function_row(f, Some(&state.name)))
            }))
            .collect();
        Self {
            name: script.name.clone(),
            extends_ref,
            description: description(script.doc.as_ref()),
            properties,
            functions,
        }
    }
}

/// A database the sink can write to
pub trait SqlBackend: Send {
    /// Create missing tables and empty existing ones
    ///
    /// # Errors
    ///
    /// Returns an error if the statements fail.
    fn prepare(&mut self) -> Result<(), SinkError>;

    /// Insert one script and everything it owns in a single transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing of it is kept.
    fn write_script(&mut self, rows: &ScriptRows) -> Result<(), SinkError>;

    /// Store free-standing pages such as the index
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    fn write_pages(&mut self, pages: &[Page]) -> Result<(), SinkError>;
}

const SQLITE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS script (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    extends_ref TEXT,
    description TEXT
);
CREATE TABLE IF NOT EXISTS property (
    id INTEGER PRIMARY KEY,
    script_id INTEGER NOT NULL REFERENCES script(id),
    name TEXT NOT NULL,
    type_ref TEXT NOT NULL,
    auto_kind TEXT NOT NULL,
    "default" TEXT,
    description TEXT,
    flags TEXT NOT NULL,
    group_name TEXT
);
CREATE TABLE IF NOT EXISTS "function" (
    id INTEGER PRIMARY KEY,
    script_id INTEGER NOT NULL REFERENCES script(id),
    name TEXT NOT NULL,
    return_type_ref TEXT,
    description TEXT,
    flags TEXT NOT NULL,
    state TEXT,
    is_event INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS parameter (
    id INTEGER PRIMARY KEY,
    function_id INTEGER NOT NULL REFERENCES "function"(id),
    name TEXT NOT NULL,
    type_ref TEXT NOT NULL,
    "default" TEXT,
    position INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS misc_page (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL
);
DELETE FROM parameter;
DELETE FROM "function";
DELETE FROM property;
DELETE FROM script;
DELETE FROM misc_page;
"#;

/// Embedded database file via `rusqlite`
pub struct SqliteBackend {
    conn: rusqlite::Connection,
}

impl SqliteBackend {
    /// Open or create the database file; `:memory:` opens a scratch database
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: &str) -> Result<Self, SinkError> {
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(path)?
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }
}

impl SqlBackend for SqliteBackend {
    fn prepare(&mut self) -> Result<(), SinkError> {
        self.conn.execute_batch(SQLITE_SCHEMA)?;
        Ok(())
    }

    fn write_script(&mut self, rows: &ScriptRows) -> Result<(), SinkError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO script (name, extends_ref, description) VALUES (?1, ?2, ?3)",
            rusqlite::params![rows.name, rows.extends_ref, rows.description],
        )?;
        let script_id = tx.last_insert_rowid();

        for p in &rows.properties {
            tx.execute(
                r#"INSERT INTO property
                   (script_id, name, type_ref, auto_kind, "default", description, flags, group_name)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                rusqlite::params![
                    script_id,
                    p.name,
                    p.type_ref,
                    p.auto_kind,
                    p.default,
                    p.description,
                    p.flags,
                    p.group_name
                ],
            )?;
        }

        for f in &rows.functions {
            tx.execute(
                r#"INSERT INTO "function"
                   (script_id, name, return_type_ref, description, flags, state, is_event)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                rusqlite::params![
                    script_id,
                    f.name,
                    f.return_type_ref,
                    f.description,
                    f.flags,
                    f.state,
                    f.is_event
                ],
            )?;
            let function_id = tx.last_insert_rowid();
            for param in &f.params {
                tx.execute(
                    r#"INSERT INTO parameter (function_id, name, type_ref, "default", position)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    rusqlite::params![
                        function_id,
                        param.name,
                        param.type_ref,
                        param.default,
                        param.position
                    ],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_pages(&mut self, pages: &[Page]) -> Result<(), SinkError> {
        let tx = self.conn.transaction()?;
        for page in pages {
            tx.execute(
                "INSERT INTO misc_page (title, kind, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![page.title, page.kind.as_str(), page.text],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Database server via `postgres`
pub struct PostgresBackend {
    client: postgres::Client,
    /// Table name prefix, `schema.` or empty
    prefix: String,
}

impl PostgresBackend {
    /// Connect with a `key=value` string or a `postgres://` URL
    ///
    /// # Errors
    ///
    /// Returns an error if the schema name is invalid or the connection fails.
    pub fn connect(connection: &str, schema: Option<&str>) -> Result<Self, SinkError> {
        let prefix = match schema {
            Some(name) => {
                let valid = !name.is_empty()
                    && !name.starts_with(|c: char| c.is_ascii_digit())
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if !valid {
                    return Err(SinkError::InvalidSchema(name.to_string()));
                }
                format!("{name}.")
            }
            None => String::new(),
        };
        let client = postgres::Client::connect(connection, postgres::NoTls)?;
        Ok(Self { client, prefix })
    }

    fn table(&self, name: &str) -> String {
        format!("{}\"{name}\"", self.prefix)
    }
}

impl SqlBackend for PostgresBackend {
    fn prepare(&mut self) -> Result<(), SinkError> {
        let mut batch = String::new();
        if let Some(schema) = self.prefix.strip_suffix('.') {
            batch.push_str(&format!("CREATE SCHEMA IF NOT EXISTS {schema};\n"));
        }
        let (script, property, function, parameter, misc) = (
            self.table("script"),
            self.table("property"),
            self.table("function"),
            self.table("parameter"),
            self.table("misc_page"),
        );
        batch.push_str(&format!(
            r#"
CREATE TABLE IF NOT EXISTS {script} (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    extends_ref TEXT,
    description TEXT
);
CREATE TABLE IF NOT EXISTS {property} (
    id BIGSERIAL PRIMARY KEY,
    script_id BIGINT NOT NULL REFERENCES {script}(id),
    name TEXT NOT NULL,
    type_ref TEXT NOT NULL,
    auto_kind TEXT NOT NULL,
    "default" TEXT,
    description TEXT,
    flags TEXT NOT NULL,
    group_name TEXT
);
CREATE TABLE IF NOT EXISTS {function} (
    id BIGSERIAL PRIMARY KEY,
    script_id BIGINT NOT NULL REFERENCES {script}(id),
    name TEXT NOT NULL,
    return_type_ref TEXT,
    description TEXT,
    flags TEXT NOT NULL,
    state TEXT,
    is_event BOOLEAN NOT NULL
);
CREATE TABLE IF NOT EXISTS {parameter} (
    id BIGSERIAL PRIMARY KEY,
    function_id BIGINT NOT NULL REFERENCES {function}(id),
    name TEXT NOT NULL,
    type_ref TEXT NOT NULL,
    "default" TEXT,
    position INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS {misc} (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL
);
TRUNCATE {parameter}, {function}, {property}, {script}, {misc} RESTART IDENTITY;
"#
        ));
        self.client.batch_execute(&batch)?;
        Ok(())
    }

    fn write_script(&mut self, rows: &ScriptRows) -> Result<(), SinkError> {
        let insert_script = format!(
            "INSERT INTO {} (name, extends_ref, description) VALUES ($1, $2, $3) RETURNING id",
            self.table("script")
        );
        let insert_property = format!(
            r#"INSERT INTO {} (script_id, name, type_ref, auto_kind, "default", description, flags, group_name)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            self.table("property")
        );
        let insert_function = format!(
            r#"INSERT INTO {} (script_id, name, return_type_ref, description, flags, state, is_event)
               VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"#,
            self.table("function")
        );
        let insert_parameter = format!(
            r#"INSERT INTO {} (function_id, name, type_ref, "default", position)
               VALUES ($1, $2, $3, $4, $5)"#,
            self.table("parameter")
        );

        let mut tx = self.client.transaction()?;
        let script_id: i64 = tx
            .query_one(
                insert_script.as_str(),
                &[&rows.name, &rows.extends_ref, &rows.description],
            )?
            .get(0);
        for p in &rows.properties {
            tx.execute(
                insert_property.as_str(),
                &[
                    &script_id,
                    &p.name,
                    &p.type_ref,
                    &p.auto_kind,
                    &p.default,
                    &p.description,
                    &p.flags,
                    &p.group_name,
                ],
            )?;
        }
        for f in &rows.functions {
            let function_id: i64 = tx
                .query_one(
                    insert_function.as_str(),
                    &[
                        &script_id,
                        &f.name,
                        &f.return_type_ref,
                        &f.description,
                        &f.flags,
                        &f.state,
                        &f.is_event,
                    ],
                )?
                .get(0);
            for param in &f.params {
                tx.execute(
                    insert_parameter.as_str(),
                    &[
                        &function_id,
                        &param.name,
                        &param.type_ref,
                        &param.default,
                        &param.position,
                    ],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_pages(&mut self, pages: &[Page]) -> Result<(), SinkError> {
        let insert = format!(
            "INSERT INTO {} (title, kind, content) VALUES ($1, $2, $3)",
            self.table("misc_page")
        );
        let mut tx = self.client.transaction()?;
        for page in pages {
            tx.execute(insert.as_str(), &[&page.title, &page.kind.as_str(), &page.text])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Writes the corpus into a database
pub struct SqlSink {
    backend: Box<dyn SqlBackend>,
    renderer: WikiRenderer,
    scripts: usize,
    finalized: bool,
}

impl SqlSink {
    /// Open the configured backend and prepare its tables
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is configured or the database
    /// cannot be reached.
    pub fn open(config: &SqlConfig, options: WikiOptions) -> Result<Self, SinkError> {
        let connection = config
            .connection
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(SinkError::MissingConnection)?;
        let backend: Box<dyn SqlBackend> = match config.dialect {
            SqlDialect::Embedded => Box::new(SqliteBackend::open(connection)?),
            SqlDialect::ClientServer => Box::new(PostgresBackend::connect(
                connection,
                config.schema.as_deref(),
            )?),
        };
        Self::with_backend(backend, options)
    }

    /// Use an already opened backend
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be prepared.
    pub fn with_backend(
        mut backend: Box<dyn SqlBackend>,
        options: WikiOptions,
    ) -> Result<Self, SinkError> {
        backend.prepare()?;
        Ok(Self {
            backend,
            renderer: WikiRenderer::new(options),
            scripts: 0,
            finalized: false,
        })
    }
}

impl Sink for SqlSink {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn emit_script(&mut self, script: &ScriptDecl, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized("sql"));
        }
        self.backend
            .write_script(&ScriptRows::from_script(script, ctx.links))?;
        self.scripts += 1;
        Ok(())
    }

    fn emit_index(&mut self, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized("sql"));
        }
        let pages = self.renderer.index_pages(ctx.index)?;
        self.backend.write_pages(&pages)
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized("sql"));
        }
        self.finalized = true;
        tracing::info!(scripts = self.scripts, "sql rows written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::doc::Index;
    use crate::testutil::link_corpus;

    const SOURCE: &str = "\
{Represents my custom quest}
ScriptName MyQuest extends Quest
int Property Stage Auto
Group Tuning
    Float Property Speed = 1.5 Auto Hidden
EndGroup
Function DoThing(int a, bool b = true) native
Auto State Waiting
    Event OnBegin()
    EndEvent
EndState
";

    fn emit_into(db: &str, sources: &[(&str, &str)]) {
        let (corpus, links) = link_corpus(sources).unwrap();
        let index = Index::build(&corpus, &links, &mut Diagnostics::new());
        let ctx = EmitContext {
            links: &links,
            index: &index,
        };
        let config = SqlConfig {
            connection: Some(db.to_string()),
            dialect: SqlDialect::Embedded,
            schema: None,
        };
        let mut sink = SqlSink::open(&config, WikiOptions::default()).unwrap();
        for script in &corpus {
            sink.emit_script(script, &ctx).unwrap();
        }
        sink.emit_index(&ctx).unwrap();
        sink.finalize().unwrap();
    }

    #[test]
    fn rows_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("docs.db");
        let db = db.to_str().unwrap();
        emit_into(db, &[("MyQuest.psc", SOURCE), ("Quest.psc", "ScriptName Quest\n")]);

        let conn = rusqlite::Connection::open(db).unwrap();
        let (extends, description): (Option<String>, Option<String>) = conn
            .query_row(
                "SELECT extends_ref, description FROM script WHERE name = 'MyQuest'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(extends.as_deref(), Some("Quest Script"));
        assert_eq!(description.as_deref(), Some("Represents my custom quest"));

        let speed: (String, Option<String>, String, Option<String>) = conn
            .query_row(
                r#"SELECT auto_kind, "default", flags, group_name FROM property WHERE name = 'Speed'"#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(
            speed,
            (
                "auto".to_string(),
                Some("1.5".to_string()),
                "Hidden".to_string(),
                Some("Tuning".to_string())
            )
        );

        let params: Vec<(String, String, Option<String>, i32)> = conn
            .prepare(
                r#"SELECT p.name, p.type_ref, p."default", p.position
                   FROM parameter p JOIN "function" f ON f.id = p.function_id
                   WHERE f.name = 'DoThing' ORDER BY p.position"#,
            )
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            params,
            vec![
                ("a".to_string(), "int".to_string(), None, 0),
                ("b".to_string(), "bool".to_string(), Some("true".to_string()), 1),
            ]
        );

        let state: (Option<String>, bool) = conn
            .query_row(
                r#"SELECT state, is_event FROM "function" WHERE name = 'OnBegin'"#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(state, (Some("Waiting".to_string()), true));

        let index: String = conn
            .query_row(
                "SELECT title FROM misc_page WHERE kind = 'index'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index, "Category:Papyrus");
    }

    #[test]
    fn reruns_replace_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("docs.db");
        let db = db.to_str().unwrap();
        emit_into(db, &[("MyQuest.psc", SOURCE)]);
        emit_into(db, &[("MyQuest.psc", SOURCE)]);

        let conn = rusqlite::Connection::open(db).unwrap();
        let scripts: i64 = conn
            .query_row("SELECT COUNT(*) FROM script", [], |row| row.get(0))
            .unwrap();
        let first_id: i64 = conn
            .query_row("SELECT MIN(id) FROM script", [], |row| row.get(0))
            .unwrap();
        assert_eq!((scripts, first_id), (1, 1));
    }

    #[test]
    fn missing_connection_is_an_error() {
        let result = SqlSink::open(&SqlConfig::default(), WikiOptions::default());
        assert!(matches!(result, Err(SinkError::MissingConnection)));
    }

    #[test]
    fn invalid_schema_is_rejected_before_connecting() {
        let result = PostgresBackend::connect("host=localhost", Some("docs; DROP"));
        assert!(matches!(result, Err(SinkError::InvalidSchema(_))));
    }
}
