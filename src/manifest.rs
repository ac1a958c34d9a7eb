// src/manifest.rs
//! Cargo manifest shapes.
//!
//! Raw tables are declared as open keyed records: unknown keys are tolerated
//! so that newer Cargo features do not break loading, while every key we do
//! know about must have the right shape. `Package` and `Dependency` are the
//! nominal records a loader populates, one verified field at a time.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::decode::{self, DecodeError};
use crate::descriptor::{Descriptor, TypedRecordBuilder};
use crate::fields::field_validators;
use crate::reflect::Record;
use crate::validate::{compile, Predicate};
use crate::value::{Nominal, ScalarType, Value};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{path}: invalid value for field `{field}` of {record}")]
    InvalidField { path: String, record: String, field: String },
    #[error("{path}: expected a table for {record}, found {found}")]
    NotATable { path: String, record: String, found: &'static str },
    #[error("{path}: document does not have the shape of a Cargo manifest")]
    InvalidDocument { path: String },
    #[error("{path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },
}

// ————————————————————————————————————————————————————————————————————————————
// RAW SCHEMAS
// ————————————————————————————————————————————————————————————————————————————

fn str_() -> Descriptor {
    Descriptor::Scalar(ScalarType::Str)
}

fn bool_() -> Descriptor {
    Descriptor::Scalar(ScalarType::Bool)
}

fn strs() -> Descriptor {
    Descriptor::list(str_())
}

fn str_or_bool() -> Descriptor {
    Descriptor::Union(vec![str_(), bool_()])
}

fn declared(builder: TypedRecordBuilder) -> Descriptor {
    builder.build().unwrap_or_else(|e| panic!("malformed built-in schema: {e}"))
}

/// `{ workspace = true }` in place of a `[package]` value.
pub static FROM_WORKSPACE: Lazy<Descriptor> =
    Lazy::new(|| declared(TypedRecordBuilder::closed("from workspace").required("workspace", bool_())));

/// A `[package]` field that a member may take from `[workspace.package]`.
fn inheritable(descriptor: Descriptor) -> Descriptor {
    Descriptor::Union(vec![descriptor, Descriptor::clone(&FROM_WORKSPACE)])
}

pub static EDITION: Lazy<Descriptor> = Lazy::new(|| Descriptor::literal(["2015", "2018", "2021", "2024"]));

pub static CRATE_TYPE: Lazy<Descriptor> = Lazy::new(|| {
    Descriptor::literal(["bin", "lib", "dylib", "staticlib", "cdylib", "rlib", "proc-macro"])
});

pub static PACKAGE: Lazy<Descriptor> = Lazy::new(|| {
    declared(
        TypedRecordBuilder::open("package")
            .required("name", str_())
            .required("version", inheritable(str_()))
            .field("authors", inheritable(strs()))
            .field("edition", inheritable(Descriptor::clone(&EDITION)))
            .field("rust-version", inheritable(str_()))
            .field("description", inheritable(str_()))
            .field("documentation", inheritable(str_()))
            .field("homepage", inheritable(str_()))
            .field("repository", inheritable(str_()))
            .field("readme", inheritable(str_or_bool()))
            .field("license", inheritable(str_()))
            .field("license-file", inheritable(str_()))
            .field("keywords", inheritable(strs()))
            .field("categories", inheritable(strs()))
            .field("workspace", str_())
            .field("build", str_or_bool())
            .field("links", str_())
            .field("include", inheritable(strs()))
            .field("exclude", inheritable(strs()))
            .field("publish", inheritable(Descriptor::Union(vec![bool_(), strs()])))
            .field("metadata", Descriptor::mapping(str_(), Descriptor::Any))
            .field("default-run", str_())
            .field("autolib", bool_())
            .field("autobins", bool_())
            .field("autoexamples", bool_())
            .field("autotests", bool_())
            .field("autobenches", bool_()),
    )
});

pub static DEPENDENCY: Lazy<Descriptor> = Lazy::new(|| {
    declared(
        TypedRecordBuilder::open("dependency")
            .field("version", str_())
            .field("registry", str_())
            .field("git", str_())
            .field("branch", str_())
            .field("tag", str_())
            .field("rev", str_())
            .field("path", str_())
            .field("optional", bool_())
            .field("package", str_())
            .field("default-features", bool_())
            .field("features", strs())
            .field("workspace", bool_()),
    )
});

/// `foo = "1.0"` or `foo = { version = "1.0", ... }`.
pub static DEPENDENCY_V: Lazy<Descriptor> =
    Lazy::new(|| Descriptor::Union(vec![str_(), Descriptor::clone(&DEPENDENCY)]));

fn dependency_table() -> Descriptor {
    Descriptor::mapping(str_(), Descriptor::clone(&DEPENDENCY_V))
}

fn target_fields(builder: TypedRecordBuilder) -> TypedRecordBuilder {
    builder
        .field("crate-type", Descriptor::list(Descriptor::clone(&CRATE_TYPE)))
        .field("path", str_())
        .field("test", bool_())
        .field("doctest", bool_())
        .field("bench", bool_())
        .field("doc", bool_())
        .field("harness", bool_())
        .field("edition", Descriptor::clone(&EDITION))
        .field("required-features", strs())
        .field("plugin", bool_())
        .field("proc-macro", bool_())
        .field("doc-scrape-examples", bool_())
}

pub static LIB_TARGET: Lazy<Descriptor> =
    Lazy::new(|| declared(target_fields(TypedRecordBuilder::open("lib").field("name", str_()))));

/// `[[bin]]`, `[[test]]`, `[[bench]]` and `[[example]]` entries.
pub static BUILD_TARGET: Lazy<Descriptor> =
    Lazy::new(|| declared(target_fields(TypedRecordBuilder::open("target").required("name", str_()))));

/// `[target.'cfg(...)']` tables.
pub static TARGET: Lazy<Descriptor> = Lazy::new(|| {
    declared(
        TypedRecordBuilder::open("platform target")
            .field("dependencies", dependency_table())
            .field("dev-dependencies", dependency_table())
            .field("build-dependencies", dependency_table()),
    )
});

pub static WORKSPACE: Lazy<Descriptor> = Lazy::new(|| {
    declared(
        TypedRecordBuilder::open("workspace")
            .field("members", strs())
            .field("exclude", strs())
            .field("default-members", strs())
            .field("resolver", str_())
            .field("package", Descriptor::mapping(str_(), Descriptor::Any))
            .field("dependencies", dependency_table())
            .field("metadata", Descriptor::untyped_mapping()),
    )
});

pub static MANIFEST: Lazy<Descriptor> = Lazy::new(|| {
    let targets = Descriptor::list(Descriptor::clone(&BUILD_TARGET));
    declared(
        TypedRecordBuilder::open("manifest")
            .required("package", Descriptor::clone(&PACKAGE))
            .field("badges", Descriptor::mapping(str_(), Descriptor::mapping(str_(), str_())))
            .field("dependencies", dependency_table())
            .field("dev-dependencies", dependency_table())
            .field("build-dependencies", dependency_table())
            .field("lib", Descriptor::clone(&LIB_TARGET))
            .field("bin", targets.clone())
            .field("test", targets.clone())
            .field("bench", targets.clone())
            .field("example", targets)
            .field("features", Descriptor::mapping(str_(), strs()))
            .field("target", Descriptor::mapping(str_(), Descriptor::clone(&TARGET)))
            .field("workspace", Descriptor::clone(&WORKSPACE))
            .field("lints", Descriptor::untyped_mapping())
            .field("patch", Descriptor::mapping(str_(), dependency_table())),
    )
});

// ————————————————————————————————————————————————————————————————————————————
// RECORDS
// ————————————————————————————————————————————————————————————————————————————

/// `[package]` as a loader populates it.
pub struct Package;

/// One entry of a dependency table, in its table form.
pub struct Dependency;

static PACKAGE_TYPE: Lazy<Nominal> = Lazy::new(|| Nominal::new("Package"));
static DEPENDENCY_TYPE: Lazy<Nominal> = Lazy::new(|| Nominal::new("Dependency"));

impl Record for Package {
    fn nominal() -> Nominal {
        Nominal::clone(&PACKAGE_TYPE)
    }

    fn fields() -> Vec<(&'static str, Descriptor)> {
        vec![
            ("name", str_()),
            ("version", inheritable(str_())),
            ("authors", inheritable(strs())),
            ("edition", inheritable(Descriptor::clone(&EDITION))),
            ("rust_version", inheritable(str_())),
            ("description", inheritable(str_())),
            ("documentation", inheritable(str_())),
            ("homepage", inheritable(str_())),
            ("repository", inheritable(str_())),
            ("readme", inheritable(str_or_bool())),
            ("license", inheritable(str_())),
            ("license_file", inheritable(str_())),
            ("keywords", inheritable(strs())),
            ("categories", inheritable(strs())),
            ("workspace", str_()),
            ("build", str_or_bool()),
            ("links", str_()),
            ("include", inheritable(strs())),
            ("exclude", inheritable(strs())),
            ("publish", inheritable(Descriptor::Union(vec![bool_(), strs()]))),
            ("metadata", Descriptor::mapping(str_(), Descriptor::Any)),
            ("default_run", str_()),
            ("autolib", bool_()),
            ("autobins", bool_()),
            ("autoexamples", bool_()),
            ("autotests", bool_()),
            ("autobenches", bool_()),
        ]
    }
}

impl Record for Dependency {
    fn nominal() -> Nominal {
        Nominal::clone(&DEPENDENCY_TYPE)
    }

    fn fields() -> Vec<(&'static str, Descriptor)> {
        vec![
            ("version", str_()),
            ("registry", str_()),
            ("git", str_()),
            ("branch", str_()),
            ("tag", str_()),
            ("rev", str_()),
            ("path", str_()),
            ("optional", bool_()),
            ("package", str_()),
            ("default_features", bool_()),
            ("features", strs()),
            ("workspace", bool_()),
        ]
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

/// Manifest keys use dashes, record fields use underscores.
pub fn fixup_key(key: &str) -> String {
    key.replace('-', "_")
}

/// Verified fields of a raw table destined for record `T`. Unknown keys are
/// dropped with a warning; the first ill-shaped field is an error.
pub fn raw_to_fields<T: Record>(path: &str, raw: &Value) -> Result<IndexMap<String, Value>, ManifestError> {
    let table = field_validators::<T>();
    let Value::Mapping(mapping) = raw else {
        return Err(ManifestError::NotATable {
            path: path.to_owned(),
            record: table.record_name().to_owned(),
            found: raw.type_name(),
        });
    };

    let mut out = IndexMap::with_capacity(mapping.len());
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            tracing::warn!(path, record = table.record_name(), key = key.type_name(), "ignoring non-string key");
            continue;
        };
        let name = fixup_key(key);
        match table.check(&name, value) {
            None => {
                tracing::warn!(path, record = table.record_name(), key, "ignoring unknown key");
            }
            Some(false) => {
                return Err(ManifestError::InvalidField {
                    path: path.to_owned(),
                    record: table.record_name().to_owned(),
                    field: key.to_owned(),
                });
            }
            Some(true) => {
                out.insert(name, value.clone());
            }
        }
    }
    Ok(out)
}

static MANIFEST_CHECK: Lazy<Predicate> = Lazy::new(|| compile(&MANIFEST));

pub fn check_manifest(path: &str, value: &Value) -> Result<(), ManifestError> {
    if MANIFEST_CHECK.check(value) {
        Ok(())
    } else {
        Err(ManifestError::InvalidDocument { path: path.to_owned() })
    }
}

/// Decode a JSON rendering of a manifest and check its shape.
pub fn load_manifest(path: &str, src: &str) -> Result<Value, ManifestError> {
    let value = decode::from_str_with_path(src)
        .map_err(|source| ManifestError::Decode { path: path.to_owned(), source })?;
    check_manifest(path, &value)?;
    Ok(value)
}

// ------------------------------- Tests ------------------------------------ //
