//! Minimal CLI: check documents against a built-in schema, or print one.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;

use crate::descriptor::Descriptor;
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// check decoded JSON documents against Cargo manifest shapes
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate each input document and print one verdict per document
    Check(CheckOut),
    /// print the JSON-schema-ish view of a built-in schema
    Schema(SchemaOut),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SchemaName {
    Manifest,
    Package,
    Dependency,
    Lib,
    Bin,
    Target,
    Workspace,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select a subnode in each document (e.g. /package)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema to check against
    #[arg(long, value_enum, default_value_t = SchemaName::Manifest)]
    schema: SchemaName,

    /// print verdicts as a JSON array
    #[arg(long)]
    json: bool,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    /// schema to print
    #[arg(long, value_enum, default_value_t = SchemaName::Manifest)]
    schema: SchemaName,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Serialize, Debug)]
struct Verdict<'a> {
    path: &'a str,
    valid: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaName {
    fn descriptor(self) -> &'static Descriptor {
        use crate::manifest::*;
        match self {
            SchemaName::Manifest => &MANIFEST,
            SchemaName::Package => &PACKAGE,
            SchemaName::Dependency => &DEPENDENCY_V,
            SchemaName::Lib => &LIB_TARGET,
            SchemaName::Bin => &BUILD_TARGET,
            SchemaName::Target => &TARGET,
            SchemaName::Workspace => &WORKSPACE,
        }
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<(String, Value)>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut out = Vec::with_capacity(source_paths.len());
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let value = crate::decode::from_str_with_path(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
            let value = match self.json_pointer.as_deref() {
                None => value,
                Some(pointer) => crate::decode::select_pointer(&value, pointer)
                    .cloned()
                    .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {source_path_str}"))?,
            };
            out.push((source_path_str, value));
        }
        Ok(out)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when some document failed its check.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => {
                let check = crate::validate::compile(target.schema.descriptor());
                let documents = target.input_settings.load_documents()?;

                let verdicts: Vec<Verdict<'_>> = documents
                    .par_iter()
                    .map(|(path, value)| {
                        let valid = check.check(value);
                        tracing::debug!(path = %path, valid, "checked document");
                        Verdict { path, valid }
                    })
                    .collect();

                if target.json {
                    println!("{}", serde_json::to_string_pretty(&verdicts)?);
                } else {
                    for verdict in &verdicts {
                        let mark = if verdict.valid { "ok".green() } else { "invalid".red() };
                        println!("{mark:>7}  {}", verdict.path);
                    }
                }
                Ok(verdicts.iter().all(|v| v.valid))
            }
            Command::Schema(target) => {
                let schema = target.schema.descriptor().to_json();
                let schema_src = serde_json::to_string_pretty(&schema)?;
                match target.out.as_ref() {
                    Some(out) => write_output(out, &schema_src)?,
                    None => println!("{schema_src}"),
                }
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["Cargo.json", "a/b.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("Cargo.json"), PathBuf::from("a/b.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        let err = resolve_file_path_patterns(["/definitely/not/here/*.json"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn check_arguments_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "shape-check", "check", "--schema", "dependency", "--json", "-i", "a.json", "b.json",
        ])
        .unwrap();
        let Command::Check(check) = cli.cmd else { panic!("expected check") };
        assert!(check.json);
        assert!(matches!(check.schema, SchemaName::Dependency));
        assert_eq!(check.input_settings.input, vec!["a.json", "b.json"]);
    }

    #[test]
    fn check_reports_verdicts_from_files() {
        let dir = std::env::temp_dir().join(format!("shape-check-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("good.json");
        let bad = dir.join("bad.json");
        std::fs::write(&good, r#"{"package": {"name": "x", "version": "0.1.0"}}"#).unwrap();
        std::fs::write(&bad, r#"{"package": {"name": 1, "version": "0.1.0"}}"#).unwrap();

        let run = |path: &Path| {
            CommandLineInterface::try_parse_from(["shape-check", "check", "-i", path.to_str().unwrap()])
                .unwrap()
                .run()
                .unwrap()
        };
        assert!(run(&good));
        assert!(!run(&bad));

        let package = CommandLineInterface::try_parse_from([
            "shape-check", "check", "--schema", "package", "--json-pointer", "/package",
            "-i", good.to_str().unwrap(),
        ])
        .unwrap();
        assert!(package.run().unwrap());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
