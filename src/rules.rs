//! The conformance rules for zipped OME-Zarr archives.
//!
//! See <https://ngff.openmicroscopy.org/rfc/9/index.html#specification>.
//! Every rule runs on every report; a rule whose precondition does not hold
//! reports [`Outcome::Inapplicable`] instead of failing.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::ValidatorConfig;
use crate::error::{Error, Result};
use crate::io::is_http_url;
use crate::report::{Outcome, RuleClass, RuleReport, ValidationReport};
use crate::snapshot::{ArchiveSnapshot, StoreSnapshot};
use crate::zip::CompressionMethod;

/// Result of looking for the ZIP64 end of central directory locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorScan {
    Found,
    Missing,
    /// Reading the tail of the archive failed.
    Unavailable(String),
    NotRun,
}

enum Check {
    Pass,
    Fail(String),
    Inapplicable(String),
}

struct Inputs<'a> {
    config: &'a ValidatorConfig,
    archive: &'a ArchiveSnapshot,
    store: &'a StoreSnapshot,
    scan: &'a LocatorScan,
    version_pattern: &'a Regex,
}

struct Rule {
    id: &'static str,
    class: RuleClass,
    check: fn(&Inputs) -> Check,
}

const RULES: &[Rule] = &[
    Rule {
        id: "req-single-hierarchy",
        class: RuleClass::Requirement,
        check: single_hierarchy,
    },
    Rule {
        id: "req-no-nesting",
        class: RuleClass::Requirement,
        check: no_nesting,
    },
    Rule {
        id: "req-no-multipart",
        class: RuleClass::Requirement,
        check: no_multipart,
    },
    Rule {
        id: "rec-zip64",
        class: RuleClass::Recommendation,
        check: zip64,
    },
    Rule {
        id: "rec-no-compression",
        class: RuleClass::Recommendation,
        check: no_compression,
    },
    Rule {
        id: "rec-sharding",
        class: RuleClass::Recommendation,
        check: sharding,
    },
    Rule {
        id: "rec-entry-order",
        class: RuleClass::Recommendation,
        check: entry_order,
    },
    Rule {
        id: "rec-comment-schema",
        class: RuleClass::Recommendation,
        check: comment_schema,
    },
    Rule {
        id: "rec-extension",
        class: RuleClass::Recommendation,
        check: extension,
    },
];

/// Identifiers of all rules, in evaluation order.
pub fn rule_ids() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|r| r.id)
}

/// Evaluates the fixed rule list against captured snapshots.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: ValidatorConfig,
    version_pattern: Regex,
}

impl RuleEngine {
    pub fn new(config: &ValidatorConfig) -> Result<Self> {
        let version_pattern = Regex::new(r"^\d\.\d$")
            .map_err(|e| Error::InvalidParameter(format!("version pattern: {e}")))?;
        Ok(Self {
            config: config.clone(),
            version_pattern,
        })
    }

    pub fn evaluate(
        &self,
        archive: &ArchiveSnapshot,
        store: &StoreSnapshot,
        scan: &LocatorScan,
    ) -> ValidationReport {
        let inputs = Inputs {
            config: &self.config,
            archive,
            store,
            scan,
            version_pattern: &self.version_pattern,
        };

        let rules = RULES
            .iter()
            .map(|rule| {
                let (outcome, message) = match (rule.check)(&inputs) {
                    Check::Pass => (Outcome::Pass, String::new()),
                    Check::Fail(message) => (Outcome::Fail, message),
                    Check::Inapplicable(message) => (Outcome::Inapplicable, message),
                };
                log::debug!("{}: {} {}", rule.id, outcome, message);
                RuleReport {
                    id: rule.id,
                    class: rule.class,
                    outcome,
                    message,
                }
            })
            .collect();

        ValidationReport::new(archive.location.clone(), rules)
    }
}

/// The path part of a location; for URLs, without scheme, host, query or fragment.
fn location_path(location: &str) -> &str {
    if !is_http_url(location) {
        return location;
    }
    let after_scheme = location.split_once("://").map_or(location, |(_, rest)| rest);
    let path = after_scheme.find('/').map_or("", |i| &after_scheme[i..]);
    path.split(['?', '#']).next().unwrap_or(path)
}

fn single_hierarchy(inputs: &Inputs) -> Check {
    let store = inputs.store;
    if !store.root_document.is_object() {
        return Check::Fail(format!(
            "root metadata is not a mapping: {}",
            store.root_document
        ));
    }
    if let Err(e) = &store.ome {
        return Check::Fail(format!("invalid OME metadata: {e}"));
    }

    let mut expected: BTreeSet<String> = store.child_names.clone();
    expected.insert(inputs.config.metadata_filename.clone());
    let found = inputs.archive.root_paths();
    if expected == found {
        return Check::Pass;
    }

    let extra: Vec<&String> = found.difference(&expected).collect();
    let missing: Vec<&String> = expected.difference(&found).collect();
    Check::Fail(format!(
        "archive root does not match the hierarchy root (unexpected: {extra:?}, missing: {missing:?})"
    ))
}

fn no_nesting(inputs: &Inputs) -> Check {
    let path = location_path(&inputs.archive.location);
    let parent = Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let marker = inputs.config.nesting_marker.to_lowercase();
    if parent.contains(&marker) {
        Check::Fail(format!(
            "archive lies inside a Zarr hierarchy ({marker:?} in {parent:?})"
        ))
    } else {
        Check::Pass
    }
}

fn no_multipart(inputs: &Inputs) -> Check {
    let path = location_path(&inputs.archive.location);
    let extension = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !extension.is_empty() && extension.chars().all(|c| c.is_ascii_digit()) {
        Check::Fail(format!(
            "numeric extension .{extension} marks a multi-part archive"
        ))
    } else {
        Check::Pass
    }
}

fn zip64(inputs: &Inputs) -> Check {
    match inputs.scan {
        LocatorScan::Found => Check::Pass,
        LocatorScan::Missing => Check::Fail(format!(
            "no ZIP64 end of central directory locator in the last {} bytes",
            inputs.config.zip64_window
        )),
        LocatorScan::Unavailable(reason) => {
            Check::Inapplicable(format!("could not scan for the ZIP64 locator: {reason}"))
        }
        LocatorScan::NotRun => Check::Inapplicable("ZIP64 locator scan was not run".to_string()),
    }
}

fn no_compression(inputs: &Inputs) -> Check {
    let archive = inputs.archive;
    match (archive.compression_method, archive.compression_level) {
        (CompressionMethod::Stored, None) => Check::Pass,
        (method, None) => Check::Fail(format!("expected STORE, found {method}")),
        (method, Some(level)) => Check::Fail(format!(
            "expected STORE without compression level, found {method} ({level})"
        )),
    }
}

fn sharding(inputs: &Inputs) -> Check {
    match inputs.store.levels.first() {
        None => Check::Inapplicable("no pyramid levels found".to_string()),
        Some(level) if level.shards.is_some() => Check::Pass,
        Some(level) => Check::Fail(format!(
            "level 0 (array {:?}) does not use the sharding codec",
            level.path
        )),
    }
}

fn entry_order(inputs: &Inputs) -> Check {
    let metadata = inputs.config.metadata_filename.as_str();
    let names = &inputs.archive.entry_names;

    match names.first() {
        Some(first) if first == metadata => {}
        first => {
            return Check::Fail(format!(
                "first entry should be {metadata}, found {:?}",
                first.map(String::as_str).unwrap_or("nothing")
            ));
        }
    }

    let is_metadata = |name: &str| name.rsplit('/').next() == Some(metadata);
    if let Some(boundary) = names.iter().position(|n| !is_metadata(n.as_str())) {
        if let Some(late) = names[boundary..].iter().find(|n| is_metadata(n.as_str())) {
            return Check::Fail(format!(
                "{late} comes after {}, a non-metadata entry",
                names[boundary]
            ));
        }
    }
    Check::Pass
}

fn comment_schema(inputs: &Inputs) -> Check {
    let document = match inputs.archive.comment_document() {
        Ok(document) => document,
        Err(e) => return Check::Fail(e),
    };
    let Value::Object(comment) = &document else {
        return Check::Fail(format!("comment should be a mapping, found {document}"));
    };
    let Some(ome) = comment.get("ome") else {
        return Check::Fail("comment has no \"ome\" key".to_string());
    };
    let Some(version) = ome.get("version") else {
        return Check::Fail("comment has no \"ome\".\"version\" key".to_string());
    };
    match version.as_str() {
        Some(v) if inputs.version_pattern.is_match(v) => Check::Pass,
        _ => Check::Fail(format!(
            "comment version should look like \"0.5\", found {version}"
        )),
    }
}

fn extension(inputs: &Inputs) -> Check {
    let path = location_path(&inputs.archive.location);
    let expected = &inputs.config.extension;
    if path.ends_with(expected.as_str()) {
        Check::Pass
    } else {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Check::Fail(format!("file name {name:?} should end with {expected}"))
    }
}
