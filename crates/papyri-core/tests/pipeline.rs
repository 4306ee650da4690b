//! Integration tests for whole documentation runs

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use papyri_core::config::{MarkerConfig, Mode, SqlConfig, SqlDialect};
use papyri_core::decompile::DecompileError;
use papyri_core::diagnostics::DiagnosticKind;
use papyri_core::sink::{Sink, WikiOptions, WikiSink, XmlSink};
use papyri_core::{Pipeline, RunConfig, RunReport};
use tempfile::TempDir;

const MY_QUEST: &str = "\
{Represents my custom quest}
ScriptName MyQuest extends Quest

int Property Stage Auto

Function DoThing(int a, bool b = true)
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            let path = dir.path().join("scripts").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        Self { dir }
    }

    fn scan_root(&self) -> PathBuf {
        self.dir.path().join("scripts")
    }

    fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self, mode: Mode, out: &str) -> RunConfig {
        RunConfig {
            scan_root: self.scan_root(),
            output_root: self.out(out),
            mode,
            index: true,
            marker: MarkerConfig {
                enabled: false,
                seconds: true,
            },
            ..RunConfig::default()
        }
    }

    fn run(&self, config: &RunConfig) -> RunReport {
        Pipeline::new(config).run().unwrap()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

/// Every file in a directory by name
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().to_string_lossy().into_owned(),
                fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_end_to_end_script_page() {
    let ws = Workspace::new(&[("MyQuest.psc", MY_QUEST)]);
    let report = ws.run(&ws.config(Mode::Wiki, "out"));
    assert!(!report.is_fatal());
    assert_eq!(report.scripts, 1);

    let page = read(&ws.out("out").join("MyQuest Script.wiki"));
    assert!(page.contains("Represents my custom quest"));
    assert!(page.contains("'''Extends:''' Quest\n"));
    assert!(page.contains("*int Stage [Auto]"));
    assert!(page.contains("(int a, bool b = true)"));

    let function = read(&ws.out("out").join("DoThing - MyQuest.wiki"));
    assert!(function.contains("Function DoThing(int a, bool b = true)"));
}

#[test]
fn test_extends_links_when_parent_is_documented() {
    let ws = Workspace::new(&[("MyQuest.psc", MY_QUEST), ("Quest.psc", "ScriptName Quest\n")]);
    let report = ws.run(&ws.config(Mode::Wiki, "out"));
    assert!(!report.is_fatal());

    let page = read(&ws.out("out").join("MyQuest Script.wiki"));
    assert!(page.contains("'''Extends:''' [[Quest Script|Quest]]"));
    assert_eq!(report.diagnostics.count(DiagnosticKind::UnresolvedTypeRef), 0);
}

#[test]
fn test_type_resolution_ignores_case() {
    let ws = Workspace::new(&[
        (
            "A.psc",
            "ScriptName A\nObjectReference Property Target Auto\nobjectreference Function Find()\n",
        ),
        ("ObjectReference.psc", "ScriptName ObjectReference\n"),
    ]);
    ws.run(&ws.config(Mode::Wiki, "out"));

    let page = read(&ws.out("out").join("A Script.wiki"));
    assert!(page.contains("*[[ObjectReference Script|ObjectReference]] Target"));
    assert!(page.contains("*[[ObjectReference Script|objectreference]] Function"));
}

#[test]
fn test_empty_parameter_list_renders_none() {
    let ws = Workspace::new(&[("A.psc", "ScriptName A\nFunction Reset() native\n")]);
    ws.run(&ws.config(Mode::Wiki, "out"));

    let page = read(&ws.out("out").join("Reset - A.wiki"));
    assert!(page.contains("== Parameters ==\nNone.\n"));
}

#[test]
fn test_duplicate_script_name_keeps_later_file() {
    let ws = Workspace::new(&[
        ("a/ScriptFoo.psc", "ScriptName ScriptFoo\nInt Property FromA Auto\n"),
        ("b/ScriptFoo.psc", "ScriptName ScriptFoo\nInt Property FromB Auto\n"),
    ]);
    let report = ws.run(&ws.config(Mode::Wiki, "out"));
    assert!(!report.is_fatal());
    assert_eq!(report.scripts, 1);
    assert_eq!(report.diagnostics.count(DiagnosticKind::DuplicateScriptName), 1);

    let pages: Vec<String> = snapshot(&ws.out("out"))
        .into_keys()
        .filter(|name| name.starts_with("ScriptFoo Script"))
        .collect();
    assert_eq!(pages, vec!["ScriptFoo Script.wiki"]);
    let page = read(&ws.out("out").join("ScriptFoo Script.wiki"));
    assert!(page.contains("FromB"));
    assert!(!page.contains("FromA"));
}

#[test]
fn test_malformed_file_is_excluded() {
    let ws = Workspace::new(&[
        ("Broken.psc", "ScriptName Broken\nFunction F()\n  int x = 1\nFunction G()\nEndFunction\n"),
        ("Good.psc", "ScriptName Good\nFunction Go()\nEndFunction\n"),
    ]);
    let report = ws.run(&ws.config(Mode::Wiki, "out"));
    assert!(!report.is_fatal());
    assert_eq!(report.scripts, 1);
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_excluded, 1);
    assert!(report.diagnostics.count(DiagnosticKind::SyntaxError) >= 1);
    assert_eq!(report.diagnostics.count(DiagnosticKind::FileExcluded), 1);

    let files = snapshot(&ws.out("out"));
    assert!(files.contains_key("Good Script.wiki"));
    assert!(files.contains_key("Go - Good.wiki"));
    assert!(!files.keys().any(|name| name.contains("Broken")));
    let index = read(&ws.out("out").join("Category_Papyrus.wiki"));
    assert!(index.contains("[[Good Script|Good]]"));
    assert!(!index.contains("Broken"));
}

#[test]
fn test_cyclic_extends_is_truncated() {
    let ws = Workspace::new(&[
        ("A.psc", "ScriptName A extends B\n"),
        ("B.psc", "ScriptName B extends A\n"),
    ]);
    let report = ws.run(&ws.config(Mode::Wiki, "out"));
    assert!(!report.is_fatal());
    assert_eq!(report.diagnostics.count(DiagnosticKind::DataIntegrityWarning), 2);

    let index = read(&ws.out("out").join("Category_Papyrus.wiki"));
    assert!(index.contains("* [[A Script|A]] ''extends'' [[B Script|B]] ''(cyclic)''"));
}

#[test]
fn test_wiki_runs_are_idempotent() {
    let files = [
        ("MyQuest.psc", MY_QUEST),
        ("Quest.psc", "ScriptName Quest\nEvent OnInit()\nEndEvent\n"),
        ("Ns/Door.psc", "ScriptName Ns:Door extends ObjectReference\n"),
    ];
    let ws = Workspace::new(&files);
    ws.run(&ws.config(Mode::Wiki, "first"));
    ws.run(&ws.config(Mode::Wiki, "second"));
    let first = snapshot(&ws.out("first"));
    assert!(first.contains_key("MediaWiki_Sidebar.wiki"));
    assert_eq!(first, snapshot(&ws.out("second")));
}

#[test]
fn test_archives_are_idempotent() {
    let ws = Workspace::new(&[("MyQuest.psc", MY_QUEST), ("Quest.psc", "ScriptName Quest\n")]);
    for mode in [Mode::Zip, Mode::Xml] {
        ws.run(&ws.config(mode, "first"));
        ws.run(&ws.config(mode, "second"));
    }
    assert_eq!(snapshot(&ws.out("first")), snapshot(&ws.out("second")));
}

#[test]
fn test_generation_marker_is_stamped() {
    let ws = Workspace::new(&[("A.psc", "ScriptName A\n")]);
    let mut config = ws.config(Mode::Wiki, "out");
    config.marker.enabled = true;
    config.marker.seconds = false;
    let at = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:30:45Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let report = Pipeline::new(&config).generated_at(at).run().unwrap();
    assert!(!report.is_fatal());

    let page = read(&ws.out("out").join("A Script.wiki"));
    assert!(page.contains("<!-- Generated by papyri at 2024-05-01T12:30 UTC -->"));
}

#[test]
fn test_zip_leaves_only_the_archive() {
    let ws = Workspace::new(&[("MyQuest.psc", MY_QUEST)]);
    let mut config = ws.config(Mode::Zip, "out");
    config.project_name = "Docs".into();
    let report = ws.run(&config);
    assert_eq!(report.sinks.len(), 1);
    assert!(report.sinks[0].ok);

    let files: Vec<String> = snapshot(&ws.out("out")).into_keys().collect();
    assert_eq!(files, vec!["Docs.zip"]);

    let file = fs::File::open(ws.out("out").join("Docs.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut page = String::new();
    archive
        .by_name("MyQuest Script.wiki")
        .unwrap()
        .read_to_string(&mut page)
        .unwrap();
    assert!(page.contains("Represents my custom quest"));
    assert!(archive.by_name("Category_Papyrus.wiki").is_ok());
}

#[test]
fn test_hosting_forces_xml_export() {
    let ws = Workspace::new(&[("MyQuest.psc", MY_QUEST)]);
    let mut config = ws.config(Mode::Wiki, "out");
    config.hosting = true;
    let report = ws.run(&config);
    assert_eq!(report.sinks[0].name, "xml");

    let files: Vec<String> = snapshot(&ws.out("out")).into_keys().collect();
    assert_eq!(files, vec!["PapyrusDocs.xml"]);
    let xml = read(&ws.out("out").join("PapyrusDocs.xml"));
    assert!(xml.contains("<title>MyQuest Script</title>"));
    assert!(xml.contains("<title>DoThing - MyQuest</title>"));
    assert!(xml.contains("<title>Category:Papyrus</title>"));
    assert!(xml.contains("<base>http://papyruswiki.localhost/wiki/Main_Page</base>"));
}

#[test]
fn test_sql_rows_are_normalized() {
    let ws = Workspace::new(&[("MyQuest.psc", MY_QUEST), ("Quest.psc", "ScriptName Quest\n")]);
    let db = ws.out("docs.db");
    let mut config = ws.config(Mode::Sql, "out");
    config.sql = SqlConfig {
        connection: Some(db.to_string_lossy().into_owned()),
        dialect: SqlDialect::Embedded,
        schema: None,
    };
    // twice, so a re-run does not duplicate rows
    ws.run(&config);
    let report = ws.run(&config);
    assert!(!report.is_fatal());

    let conn = rusqlite::Connection::open(&db).unwrap();
    let scripts: i64 = conn
        .query_row("SELECT COUNT(*) FROM script", [], |row| row.get(0))
        .unwrap();
    assert_eq!(scripts, 2);

    let (extends, description): (String, String) = conn
        .query_row(
            "SELECT extends_ref, description FROM script WHERE name = 'MyQuest'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(extends, "Quest Script");
    assert_eq!(description, "Represents my custom quest");

    let mut stmt = conn
        .prepare(
            "SELECT p.name, p.type_ref, p.\"default\" FROM parameter p \
             JOIN \"function\" f ON f.id = p.function_id \
             WHERE f.name = 'DoThing' ORDER BY p.position",
        )
        .unwrap();
    let params: Vec<(String, String, Option<String>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(
        params,
        vec![
            ("a".to_string(), "int".to_string(), None),
            ("b".to_string(), "bool".to_string(), Some("true".to_string())),
        ]
    );

    let index_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM misc_page WHERE kind = 'index'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(index_rows, 1);
}

#[test]
fn test_zero_scripts_is_fatal() {
    let ws = Workspace::new(&[("Broken.psc", "Int Property X Auto\n")]);
    let report = ws.run(&ws.config(Mode::Wiki, "out"));
    assert!(report.is_fatal());
    assert_eq!(report.scripts, 0);
    assert!(report.sinks.is_empty());
    assert!(!ws.out("out").exists());
}

#[test]
fn test_failed_sink_is_reported() {
    let ws = Workspace::new(&[("A.psc", "ScriptName A\n")]);
    // the output root is a file, so the wiki sink cannot create it
    fs::write(ws.out("blocked"), "").unwrap();
    let report = ws.run(&ws.config(Mode::Wiki, "blocked"));
    assert!(report.is_fatal());
    assert_eq!(report.scripts, 1);
    assert!(!report.sinks[0].ok);
    assert_eq!(report.diagnostics.count(DiagnosticKind::SinkIoError), 1);
}

#[test]
fn test_several_sinks_run_independently() {
    let ws = Workspace::new(&[("MyQuest.psc", MY_QUEST)]);
    let config = ws.config(Mode::Wiki, "wiki");
    let options = WikiOptions::from_config(&config, chrono::Utc::now());
    let sinks: Vec<Box<dyn Sink>> = vec![
        Box::new(WikiSink::create(&ws.out("wiki"), options.clone()).unwrap()),
        Box::new(
            XmlSink::create(
                &ws.out("xml"),
                "Docs.xml",
                config.site.clone(),
                options,
            )
            .unwrap(),
        ),
    ];
    let report = Pipeline::new(&config).run_with_sinks(sinks).unwrap();
    let names: Vec<&str> = report.sinks.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["wiki", "xml"]);
    assert!(report.sinks.iter().all(|s| s.ok));
    assert!(ws.out("wiki").join("MyQuest Script.wiki").is_file());
    assert!(ws.out("xml").join("Docs.xml").is_file());
}

#[test]
fn test_user_types_take_precedence() {
    let ws = Workspace::new(&[
        ("MyQuest.psc", MY_QUEST),
        ("Quest.psc", "ScriptName Quest\n"),
    ]);
    let types = ws.out("types.json");
    fs::write(&types, r#"{"quest": "https://example.org/Quest"}"#).unwrap();
    let mut config = ws.config(Mode::Wiki, "out");
    config.user_types = Some(types);
    ws.run(&config);

    let page = read(&ws.out("out").join("MyQuest Script.wiki"));
    assert!(page.contains("'''Extends:''' [https://example.org/Quest Quest]"));
}

#[test]
fn test_decompiled_sources_join_the_corpus() {
    let ws = Workspace::new(&[("Quest.psc", "ScriptName Quest\n")]);
    fs::write(ws.scan_root().join("Quest.pex"), "compiled").unwrap();
    fs::write(ws.scan_root().join("Door.pex"), "compiled").unwrap();
    fs::write(ws.scan_root().join("Bad.pex"), "compiled").unwrap();

    let decompiled = ws.out("decompiled");
    fs::create_dir_all(&decompiled).unwrap();
    let target = decompiled.clone();
    let decompiler = move |compiled: &Path| -> Result<PathBuf, DecompileError> {
        let stem = compiled.file_stem().unwrap().to_string_lossy().into_owned();
        if stem == "Bad" {
            return Err(DecompileError::Failed {
                path: compiled.to_path_buf(),
                message: "unsupported version".into(),
            });
        }
        let source = target.join(format!("{stem}.psc"));
        fs::write(&source, format!("ScriptName {stem}\n"))?;
        Ok(source)
    };

    let config = ws.config(Mode::Wiki, "out");
    let report = Pipeline::new(&config)
        .with_decompiler(&decompiler)
        .run()
        .unwrap();
    // Quest.pex has a source next to it and is neither decompiled nor counted
    assert_eq!(report.scripts, 2);
    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.files_excluded, 1);
    assert_eq!(report.diagnostics.count(DiagnosticKind::DecompileError), 1);
    assert!(ws.out("out").join("Door Script.wiki").is_file());
}

#[test]
fn test_scan_root_with_brackets() {
    let ws = Workspace::new(&[]);
    let root = ws.out("mods[1]");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("MyQuest.psc"), MY_QUEST).unwrap();

    let mut config = ws.config(Mode::Wiki, "out");
    config.scan_root = root;
    let report = ws.run(&config);
    assert!(!report.is_fatal());
    assert_eq!(report.scripts, 1);
    assert!(ws.out("out").join("MyQuest Script.wiki").is_file());
}

#[test]
fn test_single_file_scan_root() {
    let ws = Workspace::new(&[("A.psc", "ScriptName A\n"), ("B.psc", "ScriptName B\n")]);
    let mut config = ws.config(Mode::Wiki, "out");
    config.scan_root = ws.scan_root().join("A.psc");
    let report = ws.run(&config);
    assert_eq!(report.scripts, 1);
    assert!(!ws.out("out").join("B Script.wiki").exists());
}

#[test]
fn test_dedicated_parser_threads() {
    let files: Vec<(String, String)> = (0..12)
        .map(|i| (format!("S{i:02}.psc"), format!("ScriptName S{i:02}\n")))
        .collect();
    let borrowed: Vec<(&str, &str)> = files
        .iter()
        .map(|(name, text)| (name.as_str(), text.as_str()))
        .collect();
    let ws = Workspace::new(&borrowed);
    let mut config = ws.config(Mode::Wiki, "out");
    config.parallel = 3;
    let report = ws.run(&config);
    assert_eq!(report.scripts, 12);

    let sidebar = read(&ws.out("out").join("MediaWiki_Sidebar.wiki"));
    let order: Vec<&str> = sidebar
        .lines()
        .filter_map(|line| line.strip_prefix("** S"))
        .collect();
    assert_eq!(order.len(), 12);
    assert!(order.windows(2).all(|w| w[0] < w[1]));
}
