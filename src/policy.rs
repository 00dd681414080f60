//! Content policy checks for a schema corpus
//!
//! Independent of compatibility: these rules look at one version of the
//! corpus and flag documents that break house rules.
//!
//! ## Rules
//! 1. **forbidden-field**: property names on the configured blocklist
//! 2. **missing-draft / wrong-draft**: `$schema` must name the configured draft
//! 3. **open-object**: root objects must set `unevaluatedProperties: false`
//! 4. **invalid-schema**: the document must compile as a JSON Schema
//! 5. **unparseable**: every file the loader excluded fails the check

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::PolicyConfig;
use crate::corpus::Corpus;
use crate::error::Result;

/// A single policy violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyViolation {
    pub file: String,
    pub code: &'static str,
    pub message: String,
}

/// Result of checking a corpus
#[derive(Debug, Default, Serialize)]
pub struct PolicyReport {
    /// Number of files checked, including those that failed to load
    pub checked: usize,
    pub violations: Vec<PolicyViolation>,
}

impl PolicyReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The content policy checker
pub struct ContentPolicy {
    /// Case-insensitive exact match on any blocklisted name
    forbidden: Option<Regex>,
    required_draft: Option<String>,
    require_closed_objects: bool,
    validate_meta_schema: bool,
}

impl ContentPolicy {
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let forbidden = if config.forbidden_fields.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = config
                .forbidden_fields
                .iter()
                .map(|name| regex::escape(name))
                .collect();
            Some(Regex::new(&format!("(?i)^(?:{})$", alternatives.join("|")))?)
        };

        Ok(Self {
            forbidden,
            required_draft: config.required_draft.clone(),
            require_closed_objects: config.require_closed_objects,
            validate_meta_schema: config.validate_meta_schema,
        })
    }

    /// Check every document and every file the loader excluded; violations
    /// are ordered by file, then code
    pub fn check(&self, corpus: &Corpus) -> PolicyReport {
        let mut report = PolicyReport::default();
        for warning in corpus.warnings() {
            report.checked += 1;
            report.violations.push(PolicyViolation {
                file: warning.path.clone(),
                code: "unparseable",
                message: warning.reason.clone(),
            });
        }
        for (file, document) in corpus.iter() {
            report.checked += 1;
            report.violations.extend(self.check_document(file, document));
        }
        report
            .violations
            .sort_by(|a, b| a.file.cmp(&b.file).then(a.code.cmp(b.code)));
        report
    }

    pub fn check_document(&self, file: &str, document: &Value) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        let mut violation = |code: &'static str, message: String| {
            violations.push(PolicyViolation {
                file: file.to_string(),
                code,
                message,
            })
        };

        if let Some(forbidden) = &self.forbidden {
            let mut names = Vec::new();
            collect_property_names(document, "", &mut names);
            for (pointer, name) in names {
                if forbidden.is_match(&name) {
                    violation("forbidden-field", format!("forbidden field '{}' at {}", name, pointer));
                }
            }
        }

        if let Some(draft) = &self.required_draft {
            match document.get("$schema").and_then(Value::as_str) {
                None => violation("missing-draft", "missing $schema".to_string()),
                Some(declared) if !declared.contains(draft.as_str()) => violation(
                    "wrong-draft",
                    format!("$schema '{}' does not match required draft '{}'", declared, draft),
                ),
                Some(_) => {}
            }
        }

        if self.require_closed_objects
            && document.get("type").and_then(Value::as_str) == Some("object")
            && document.get("unevaluatedProperties") != Some(&Value::Bool(false))
        {
            violation(
                "open-object",
                "object schema must set unevaluatedProperties to false".to_string(),
            );
        }

        if self.validate_meta_schema {
            // cross-document refs cannot be resolved from a single file
            if has_external_ref(document) {
                debug!(file, "skipping meta-schema check for document with external $ref");
            } else if let Err(e) = jsonschema::validator_for(document) {
                violation("invalid-schema", e.to_string());
            }
        }

        violations
    }
}

/// (JSON pointer, name) for every key of every `properties` map
fn collect_property_names(node: &Value, pointer: &str, out: &mut Vec<(String, String)>) {
    match node {
        Value::Object(map) => {
            if let Some(props) = map.get("properties").and_then(Value::as_object) {
                for name in props.keys() {
                    out.push((format!("{}/properties/{}", pointer, escape_pointer(name)), name.clone()));
                }
            }
            for (key, child) in map {
                collect_property_names(child, &format!("{}/{}", pointer, escape_pointer(key)), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_property_names(child, &format!("{}/{}", pointer, index), out);
            }
        }
        _ => {}
    }
}

fn has_external_ref(node: &Value) -> bool {
    match node {
        Value::Object(map) => {
            let external = map
                .get("$ref")
                .and_then(Value::as_str)
                .map(|r| !r.starts_with('#'))
                .unwrap_or(false);
            external || map.values().any(has_external_ref)
        }
        Value::Array(items) => items.iter().any(has_external_ref),
        _ => false,
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
