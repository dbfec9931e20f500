//! Syntax-tree extraction through an external analyzer process
//!
//! The analyzer is invoked as `<program> [args...] <file>` and must print a
//! JSON document on stdout, in either of two shapes:
//!
//! ```text
//! { "symbols": [ { "symbol_name": ..., "symbol_kind": ..., ... } ] }
//! { "decisions": { "classes": [...], "methods": [...], ... } }
//! ```
//!
//! Anything printed before the first `{` is ignored.

use crate::symbol::Symbol;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Extraction failure for a single file; never fatal for a run
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to start extractor {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed waiting for extractor: {0}")]
    Wait(std::io::Error),

    #[error("Extractor exited with {}: {stderr}", exit_label(.code))]
    Exit { code: Option<i32>, stderr: String },

    #[error("Extractor timed out after {:.1}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Malformed extractor output: {0}")]
    Malformed(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("status {}", code),
        None => "signal".to_string(),
    }
}

/// Produces the symbols declared in a source file
pub trait SymbolExtractor: Send + Sync {
    /// Extract symbols, giving up once `timeout` has elapsed
    fn extract(&self, file: &Path, timeout: Duration) -> Result<Vec<Symbol>, ExtractionError>;
}

/// Runs the analyzer binary as a child process
#[derive(Debug, Clone)]
pub struct ProcessExtractor {
    program: PathBuf,
    args: Vec<String>,
    poll_interval: Duration,
}

impl ProcessExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Arguments passed before the file path
    pub fn with_args(mut self, args: &[String]) -> Self {
        self.args = args.to_vec();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the analyzer and return its stdout
    fn run(&self, file: &Path, timeout: Duration) -> Result<String, ExtractionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExtractionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Drain both pipes so a chatty child never blocks on a full buffer
        let stdout_handle = child.stdout.take().map(drain);
        let stderr_handle = child.stderr.take().map(drain);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() >= timeout {
                        reap(&mut child);
                        return Err(ExtractionError::Timeout(timeout));
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    reap(&mut child);
                    return Err(ExtractionError::Wait(e));
                }
            }
        };

        let stdout = collect(stdout_handle);
        let stderr = collect(stderr_handle);

        if !status.success() {
            return Err(ExtractionError::Exit {
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl SymbolExtractor for ProcessExtractor {
    fn extract(&self, file: &Path, timeout: Duration) -> Result<Vec<Symbol>, ExtractionError> {
        let output = self.run(file, timeout)?;
        parse_output(&output)
    }
}

/// Kill the child and collect its exit status
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = stream.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct ExtractorDocument {
    #[serde(default)]
    symbols: Option<Vec<Symbol>>,

    #[serde(default)]
    decisions: Option<Decisions>,
}

/// Symbols grouped by declaration category
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Decisions {
    #[serde(default)]
    classes: Vec<Symbol>,
    #[serde(default)]
    structs: Vec<Symbol>,
    #[serde(default)]
    enums: Vec<Symbol>,
    #[serde(default)]
    protocols: Vec<Symbol>,
    #[serde(default)]
    methods: Vec<Symbol>,
    #[serde(default)]
    properties: Vec<Symbol>,
    #[serde(default)]
    variables: Vec<Symbol>,
    #[serde(default)]
    enum_cases: Vec<Symbol>,
    #[serde(default)]
    initializers: Vec<Symbol>,
    #[serde(default)]
    deinitializers: Vec<Symbol>,
    #[serde(default)]
    subscripts: Vec<Symbol>,
    #[serde(default)]
    extensions: Vec<Symbol>,
}

impl Decisions {
    fn flatten(self) -> Vec<Symbol> {
        [
            self.classes,
            self.structs,
            self.enums,
            self.protocols,
            self.methods,
            self.properties,
            self.variables,
            self.enum_cases,
            self.initializers,
            self.deinitializers,
            self.subscripts,
            self.extensions,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Parse analyzer stdout into symbols
pub fn parse_output(output: &str) -> Result<Vec<Symbol>, ExtractionError> {
    let start = output
        .find('{')
        .ok_or_else(|| ExtractionError::Malformed("no JSON object in output".to_string()))?;

    let document: ExtractorDocument = serde_json::from_str(output[start..].trim_end())
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    match (document.decisions, document.symbols) {
        (Some(decisions), _) => Ok(decisions.flatten()),
        (None, Some(symbols)) => Ok(symbols),
        (None, None) => Err(ExtractionError::Malformed(
            "expected a 'symbols' or 'decisions' key".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_symbols_document() {
        let output = r#"{"symbols": [
            {"symbol_name": "viewDidLoad", "symbol_kind": "method", "modifiers": ["override"]},
            {"symbol_name": "User", "symbol_kind": "struct"}
        ]}"#;
        let symbols = parse_output(output).unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].modifiers, vec!["override"]);
        assert_eq!(symbols[1].kind, SymbolKind::Struct);
    }

    #[test]
    fn test_unknown_access_level_keeps_file() {
        let output = r#"{"symbols": [
            {"symbol_name": "helper", "symbol_kind": "method", "access_level": "default"},
            {"symbol_name": "render", "symbol_kind": "method", "access_level": "open"}
        ]}"#;
        let symbols = parse_output(output).unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].access_level, None);
        assert_eq!(symbols[1].access_level, Some(crate::symbol::AccessLevel::Open));
    }

    #[test]
    fn test_parse_skips_preamble() {
        let output = "Analyzing ViewController.swift...\nDone.\n{\"symbols\": []}\n";
        assert!(parse_output(output).unwrap().is_empty());
    }

    #[test]
    fn test_parse_decisions_document() {
        let output = r#"{"decisions": {
            "methods": [{"symbol_name": "fetchData", "symbol_kind": "method"}],
            "classes": [{"symbol_name": "NetworkService", "symbol_kind": "class"}],
            "enumCases": [{"symbol_name": "loading", "symbol_kind": "enumCase"}]
        }}"#;
        let names: Vec<String> = parse_output(output)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        // Category order, not document order
        assert_eq!(names, vec!["NetworkService", "fetchData", "loading"]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_output("segmentation fault"), Err(ExtractionError::Malformed(_))));
        assert!(matches!(parse_output("{not json"), Err(ExtractionError::Malformed(_))));
        assert!(matches!(parse_output("{\"files\": []}"), Err(ExtractionError::Malformed(_))));
        assert!(matches!(
            parse_output(r#"{"symbols": [{"symbol_kind": "method"}]}"#),
            Err(ExtractionError::Malformed(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        let exit = ExtractionError::Exit {
            code: Some(2),
            stderr: "no such file".to_string(),
        };
        assert_eq!(exit.to_string(), "Extractor exited with status 2: no such file");

        let timeout = ExtractionError::Timeout(Duration::from_secs(30));
        assert_eq!(timeout.to_string(), "Extractor timed out after 30.0s");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let extractor = ProcessExtractor::new("/nonexistent/analyzer-binary");
        let result = extractor.extract(Path::new("Foo.swift"), Duration::from_secs(1));
        assert!(matches!(result, Err(ExtractionError::Spawn { .. })));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("analyzer.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_successful_run_receives_file_path() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(
                dir.path(),
                r#"echo "{\"symbols\": [{\"symbol_name\": \"$1\", \"symbol_kind\": \"class\"}]}""#,
            );
            let symbols = ProcessExtractor::new(program)
                .extract(Path::new("Model.swift"), Duration::from_secs(10))
                .unwrap();
            assert_eq!(symbols.len(), 1);
            assert_eq!(symbols[0].name, "Model.swift");
        }

        #[test]
        fn test_args_precede_file() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(
                dir.path(),
                r#"echo "{\"symbols\": [{\"symbol_name\": \"$1-$2\", \"symbol_kind\": \"class\"}]}""#,
            );
            let symbols = ProcessExtractor::new(program)
                .with_args(&["--json".to_string()])
                .extract(Path::new("A.swift"), Duration::from_secs(10))
                .unwrap();
            assert_eq!(symbols[0].name, "--json-A.swift");
        }

        #[test]
        fn test_nonzero_exit() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "echo 'parse failure' >&2\nexit 3");
            let err = ProcessExtractor::new(program)
                .extract(Path::new("A.swift"), Duration::from_secs(10))
                .unwrap_err();
            match err {
                ExtractionError::Exit { code, stderr } => {
                    assert_eq!(code, Some(3));
                    assert_eq!(stderr, "parse failure");
                }
                other => panic!("unexpected error: {}", other),
            }
        }

        #[test]
        fn test_reap_leaves_no_zombie() {
            let mut child = Command::new("sleep").arg("10").spawn().unwrap();
            reap(&mut child);
            assert!(child.try_wait().unwrap().is_some());
        }

        #[test]
        fn test_timeout_kills_child() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "exec sleep 10");
            let started = Instant::now();
            let err = ProcessExtractor::new(program)
                .extract(Path::new("A.swift"), Duration::from_millis(200))
                .unwrap_err();
            assert!(matches!(err, ExtractionError::Timeout(_)));
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
