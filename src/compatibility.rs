//! Schema compatibility checking
//!
//! Compares two corpora document by document and reports every structural
//! difference as a [`ChangeRecord`]. Paths are visited in lexicographic
//! order and every map is walked in key order, so the same inputs always
//! produce the same records in the same order.
//!
//! ## Rules per node
//!
//! | check | record |
//! |---|---|
//! | both sides declare a primitive `type`, and they differ | `FIELD_TYPE_CHANGED` |
//! | both sides declare a non-empty `pattern`, and they differ | `PATTERN_TIGHTENED` |
//! | a bound present on both sides narrows | `MIN_MAX_TIGHTENED` |
//! | property only in old | `FIELD_REMOVED` |
//! | name newly listed in `required` | `FIELD_MADE_REQUIRED` |
//! | property only in new, not newly required | `FIELD_ADDED_OPTIONAL` |
//! | `enum` symmetric difference | `ENUM_VALUE_REMOVED` / `ENUM_VALUE_ADDED` |
//! | `description` differs | `DESCRIPTION_CHANGED` |
//!
//! Property and `required` comparison only runs on object nodes: a declared
//! `type` must include `object`, and an untyped node needs `properties` or
//! `required`. A `required` name without a property definition on either
//! side is not reported. Nested nodes under `properties`, `items`, `$defs`
//! and `definitions` are compared with the same rules. `$ref` is never
//! followed.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::change::{ChangeKind, ChangeRecord};
use crate::config::EngineConfig;
use crate::corpus::Corpus;

/// Default nesting cap for recursive comparison
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Keywords holding named sub-schemas
const DEFINITION_KEYWORDS: [&str; 2] = ["$defs", "definitions"];

#[derive(Debug, Clone, Copy)]
enum Bound {
    /// Raising the value narrows the accepted range
    Lower,
    /// Lowering the value narrows the accepted range
    Upper,
}

const BOUNDS: [(&str, Bound); 6] = [
    ("minimum", Bound::Lower),
    ("maximum", Bound::Upper),
    ("minLength", Bound::Lower),
    ("maxLength", Bound::Upper),
    ("minItems", Bound::Lower),
    ("maxItems", Bound::Upper),
];

/// Compare two corpora with default settings
pub fn compare(old: &Corpus, new: &Corpus) -> Vec<ChangeRecord> {
    CompatibilityChecker::new().compare(old, new)
}

/// Compatibility checker for schema corpora
#[derive(Debug, Clone)]
pub struct CompatibilityChecker {
    max_depth: usize,
}

impl CompatibilityChecker {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_max_depth(config.max_depth)
    }

    /// Limit how deep nested sub-schemas are followed
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compare every document path present in either corpus
    pub fn compare(&self, old: &Corpus, new: &Corpus) -> Vec<ChangeRecord> {
        let paths: BTreeSet<&str> = old.paths().chain(new.paths()).collect();
        let mut changes = Vec::new();

        for path in paths {
            match (old.get(path), new.get(path)) {
                (Some(_), None) => changes.push(ChangeRecord::new(ChangeKind::SchemaRemoved, path)),
                (None, Some(_)) => changes.push(ChangeRecord::new(ChangeKind::SchemaAdded, path)),
                (Some(old_doc), Some(new_doc)) => {
                    let before = changes.len();
                    self.compare_node(path, None, old_doc, new_doc, 0, &mut changes);
                    debug!(path, changes = changes.len() - before, "compared schema");
                }
                (None, None) => {}
            }
        }

        changes
    }

    /// Compare two versions of a single document
    pub fn compare_documents(&self, file: &str, old: &Value, new: &Value) -> Vec<ChangeRecord> {
        let mut changes = Vec::new();
        self.compare_node(file, None, old, new, 0, &mut changes);
        changes
    }

    fn compare_node(
        &self,
        file: &str,
        field: Option<&str>,
        old: &Value,
        new: &Value,
        depth: usize,
        out: &mut Vec<ChangeRecord>,
    ) {
        if depth > self.max_depth {
            warn!(file, field = field.unwrap_or("<root>"), max_depth = self.max_depth, "nesting depth cap reached, not descending");
            return;
        }

        compare_type(file, field, old, new, out);
        compare_pattern(file, field, old, new, out);
        compare_bounds(file, field, old, new, out);

        if is_object_node(old) || is_object_node(new) {
            self.compare_properties(file, field, old, new, depth, out);
        }
        self.compare_items(file, field, old, new, depth, out);
        self.compare_definitions(file, field, old, new, depth, out);

        compare_enum(file, field, old, new, out);
        compare_description(file, field, old, new, out);
    }

    fn compare_properties(
        &self,
        file: &str,
        field: Option<&str>,
        old: &Value,
        new: &Value,
        depth: usize,
        out: &mut Vec<ChangeRecord>,
    ) {
        let old_props = properties(old);
        let new_props = properties(new);
        let old_required = required(old);
        let new_required = required(new);

        for name in old_props.keys().filter(|n| !new_props.contains_key(*n)) {
            let path = child_path(field, name);
            out.push(ChangeRecord::new(ChangeKind::FieldRemoved, file).with_field(Some(&path)));
        }

        let added_required: BTreeSet<&str> = new_required.difference(&old_required).copied().collect();
        for name in &added_required {
            let path = child_path(field, name);
            let record = ChangeRecord::new(ChangeKind::FieldMadeRequired, file).with_field(Some(&path));
            if old_props.contains_key(name) {
                out.push(record);
            } else if new_props.contains_key(name) {
                out.push(record.newly_introduced());
            } else {
                debug!(file, field = %path, "required name has no property definition");
            }
        }

        for (name, old_prop) in &old_props {
            if let Some(new_prop) = new_props.get(name) {
                let path = child_path(field, name);
                self.compare_node(file, Some(&path), old_prop, new_prop, depth + 1, out);
            }
        }

        for name in new_props.keys() {
            if !old_props.contains_key(name) && !added_required.contains(name) {
                let path = child_path(field, name);
                out.push(ChangeRecord::new(ChangeKind::FieldAddedOptional, file).with_field(Some(&path)));
            }
        }
    }

    fn compare_items(
        &self,
        file: &str,
        field: Option<&str>,
        old: &Value,
        new: &Value,
        depth: usize,
        out: &mut Vec<ChangeRecord>,
    ) {
        let base = field.unwrap_or("");
        match (old.get("items"), new.get("items")) {
            (Some(old_items @ Value::Object(_)), Some(new_items @ Value::Object(_))) => {
                let path = format!("{}[]", base);
                self.compare_node(file, Some(&path), old_items, new_items, depth + 1, out);
            }
            // tuple form: positions are compared pairwise
            (Some(Value::Array(old_items)), Some(Value::Array(new_items))) => {
                for (index, (old_item, new_item)) in old_items.iter().zip(new_items).enumerate() {
                    let path = format!("{}[{}]", base, index);
                    self.compare_node(file, Some(&path), old_item, new_item, depth + 1, out);
                }
            }
            _ => {}
        }
    }

    fn compare_definitions(
        &self,
        file: &str,
        field: Option<&str>,
        old: &Value,
        new: &Value,
        depth: usize,
        out: &mut Vec<ChangeRecord>,
    ) {
        for keyword in DEFINITION_KEYWORDS {
            let (Some(old_defs), Some(new_defs)) = (
                old.get(keyword).and_then(Value::as_object),
                new.get(keyword).and_then(Value::as_object),
            ) else {
                continue;
            };

            let old_defs: BTreeMap<&str, &Value> = old_defs.iter().map(|(k, v)| (k.as_str(), v)).collect();
            for (name, old_def) in old_defs {
                match new_defs.get(name) {
                    Some(new_def) => {
                        let path = child_path(field, &format!("{}.{}", keyword, name));
                        self.compare_node(file, Some(&path), old_def, new_def, depth + 1, out);
                    }
                    None => debug!(file, definition = name, "definition only in old version"),
                }
            }
        }
    }
}

impl Default for CompatibilityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn compare_type(file: &str, field: Option<&str>, old: &Value, new: &Value, out: &mut Vec<ChangeRecord>) {
    let (Some((old_label, old_set)), Some((new_label, new_set))) = (declared_type(old), declared_type(new)) else {
        return;
    };
    if old_set != new_set {
        out.push(
            ChangeRecord::new(ChangeKind::FieldTypeChanged, file)
                .with_field(field)
                .with_types(old_label, new_label),
        );
    }
}

fn compare_pattern(file: &str, field: Option<&str>, old: &Value, new: &Value, out: &mut Vec<ChangeRecord>) {
    let pattern = |node: &Value| {
        node.get("pattern")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    };
    // regex containment is undecidable in general; every change counts
    if let (Some(old_pattern), Some(new_pattern)) = (pattern(old), pattern(new)) {
        if old_pattern != new_pattern {
            out.push(
                ChangeRecord::new(ChangeKind::PatternTightened, file)
                    .with_field(field)
                    .with_values(Some(Value::String(old_pattern)), Some(Value::String(new_pattern))),
            );
        }
    }
}

fn compare_bounds(file: &str, field: Option<&str>, old: &Value, new: &Value, out: &mut Vec<ChangeRecord>) {
    for (constraint, bound) in BOUNDS {
        let (Some(old_raw), Some(new_raw)) = (old.get(constraint), new.get(constraint)) else {
            continue;
        };
        let (Some(old_bound), Some(new_bound)) = (old_raw.as_f64(), new_raw.as_f64()) else {
            continue;
        };
        let tightened = match bound {
            Bound::Lower => new_bound > old_bound,
            Bound::Upper => new_bound < old_bound,
        };
        if tightened {
            out.push(
                ChangeRecord::new(ChangeKind::MinMaxTightened, file)
                    .with_field(field)
                    .with_constraint(constraint)
                    .with_values(Some(old_raw.clone()), Some(new_raw.clone())),
            );
        }
    }
}

fn compare_enum(file: &str, field: Option<&str>, old: &Value, new: &Value, out: &mut Vec<ChangeRecord>) {
    let old_values = enum_values(old);
    let new_values = enum_values(new);
    if old_values.is_empty() && new_values.is_empty() {
        return;
    }

    for value in old_values.iter().filter(|v| !new_values.contains(*v)) {
        out.push(
            ChangeRecord::new(ChangeKind::EnumValueRemoved, file)
                .with_field(field)
                .with_value((*value).clone()),
        );
    }
    for value in new_values.iter().filter(|v| !old_values.contains(*v)) {
        out.push(
            ChangeRecord::new(ChangeKind::EnumValueAdded, file)
                .with_field(field)
                .with_value((*value).clone()),
        );
    }
}

fn compare_description(file: &str, field: Option<&str>, old: &Value, new: &Value, out: &mut Vec<ChangeRecord>) {
    let old_description = old.get("description");
    let new_description = new.get("description");
    if old_description != new_description {
        out.push(
            ChangeRecord::new(ChangeKind::DescriptionChanged, file)
                .with_field(field)
                .with_values(old_description.cloned(), new_description.cloned()),
        );
    }
}

/// A declared `type` decides on its own; an untyped node is an object when it
/// has `properties` or `required`
fn is_object_node(node: &Value) -> bool {
    match node.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("object")),
        _ => node.get("properties").is_some() || node.get("required").is_some(),
    }
}

/// Declared primitive type as (display label, comparable set)
fn declared_type(node: &Value) -> Option<(String, BTreeSet<&str>)> {
    match node.get("type")? {
        Value::String(t) => Some((t.clone(), BTreeSet::from([t.as_str()]))),
        Value::Array(types) => {
            let names: Option<Vec<&str>> = types.iter().map(Value::as_str).collect();
            let names = names.filter(|n| !n.is_empty())?;
            Some((names.join("|"), names.into_iter().collect()))
        }
        _ => None,
    }
}

fn properties(node: &Value) -> BTreeMap<&str, &Value> {
    node.get("properties")
        .and_then(Value::as_object)
        .map(|props| props.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default()
}

fn required(node: &Value) -> BTreeSet<&str> {
    node.get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Distinct enum values in declaration order
fn enum_values(node: &Value) -> Vec<&Value> {
    let mut values: Vec<&Value> = Vec::new();
    if let Some(declared) = node.get("enum").and_then(Value::as_array) {
        for value in declared {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

fn child_path(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{}.{}", parent, name),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Severity;
    use serde_json::json;

    fn diff(old: Value, new: Value) -> Vec<ChangeRecord> {
        CompatibilityChecker::new().compare_documents("test.json", &old, &new)
    }

    fn kinds(changes: &[ChangeRecord]) -> Vec<ChangeKind> {
        changes.iter().map(|c| c.kind()).collect()
    }

    #[test]
    fn test_breaking_field_removal() {
        let changes = diff(
            json!({"properties": {"a": {"type": "string"}, "b": {"type": "string"}}, "required": ["a", "b"]}),
            json!({"properties": {"a": {"type": "string"}}, "required": ["a"]}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldRemoved]);
        assert_eq!(changes[0].field.as_deref(), Some("b"));
        assert_eq!(changes[0].severity(), Severity::Breaking);
    }

    #[test]
    fn test_type_change() {
        let changes = diff(
            json!({"properties": {"count": {"type": "integer"}}}),
            json!({"properties": {"count": {"type": "string"}}}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldTypeChanged]);
        assert_eq!(changes[0].old_type.as_deref(), Some("integer"));
        assert_eq!(changes[0].new_type.as_deref(), Some("string"));
    }

    #[test]
    fn test_untyped_to_typed_is_silent() {
        let changes = diff(
            json!({"properties": {"count": {}}}),
            json!({"properties": {"count": {"type": "string"}}}),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_type_list_order_is_ignored() {
        let changes = diff(
            json!({"properties": {"note": {"type": ["string", "null"]}}}),
            json!({"properties": {"note": {"type": ["null", "string"]}}}),
        );
        assert!(changes.is_empty());

        let changes = diff(
            json!({"properties": {"note": {"type": ["string", "null"]}}}),
            json!({"properties": {"note": {"type": "string"}}}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldTypeChanged]);
        assert_eq!(changes[0].old_type.as_deref(), Some("string|null"));
    }

    #[test]
    fn test_enum_removed_and_added() {
        let removed = diff(json!({"enum": ["A", "B", "C"]}), json!({"enum": ["A", "B"]}));
        assert_eq!(kinds(&removed), vec![ChangeKind::EnumValueRemoved]);
        assert_eq!(removed[0].value, Some(json!("C")));
        assert_eq!(removed[0].field, None);

        let added = diff(json!({"enum": ["A", "B"]}), json!({"enum": ["A", "B", "C"]}));
        assert_eq!(kinds(&added), vec![ChangeKind::EnumValueAdded]);
        assert_eq!(added[0].severity(), Severity::NonBreaking);
    }

    #[test]
    fn test_optional_field_added() {
        let changes = diff(
            json!({"properties": {"a": {"type": "string"}}, "required": ["a"]}),
            json!({"properties": {"a": {"type": "string"}, "b": {"type": "string"}}, "required": ["a"]}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldAddedOptional]);
        assert_eq!(changes[0].field.as_deref(), Some("b"));
    }

    #[test]
    fn test_required_field_added() {
        let changes = diff(
            json!({"properties": {"a": {"type": "string"}}, "required": ["a"]}),
            json!({"properties": {"a": {"type": "string"}, "b": {"type": "string"}}, "required": ["a", "b"]}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldMadeRequired]);
        assert_eq!(changes[0].message(), "New required field added: b in test.json");
    }

    #[test]
    fn test_existing_field_made_required() {
        let changes = diff(
            json!({"properties": {"a": {"type": "string"}, "b": {"type": "string"}}, "required": ["a"]}),
            json!({"properties": {"a": {"type": "string"}, "b": {"type": "string"}}, "required": ["a", "b"]}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldMadeRequired]);
        assert_eq!(changes[0].message(), "Field made required: b in test.json");
    }

    #[test]
    fn test_required_name_without_property_is_ignored() {
        let changes = diff(
            json!({"properties": {"a": {"type": "string"}}, "required": ["a"]}),
            json!({"properties": {"a": {"type": "string"}}, "required": ["a", "ghost"]}),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_non_object_type_skips_required_comparison() {
        let changes = diff(
            json!({"type": "array", "items": {"type": "string"}}),
            json!({"type": "array", "items": {"type": "string"}, "required": ["x"], "properties": {"x": {}}}),
        );
        assert!(changes.is_empty());

        // a type list containing object still compares properties
        let changes = diff(
            json!({"type": ["object", "null"], "properties": {"x": {}}}),
            json!({"type": ["object", "null"], "properties": {"x": {}}, "required": ["x"]}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldMadeRequired]);
    }

    #[test]
    fn test_required_with_type_change_is_not_made_required() {
        let changes = diff(
            json!({"properties": {"a": {"type": "string"}}, "required": ["a"]}),
            json!({"properties": {"a": {"type": "integer"}}, "required": ["a"]}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldTypeChanged]);
    }

    #[test]
    fn test_minimum_tightened_and_relaxed() {
        let tightened = diff(
            json!({"properties": {"n": {"minimum": 0}}}),
            json!({"properties": {"n": {"minimum": 5}}}),
        );
        assert_eq!(kinds(&tightened), vec![ChangeKind::MinMaxTightened]);
        assert_eq!(tightened[0].constraint.as_deref(), Some("minimum"));
        assert_eq!(tightened[0].old_value, Some(json!(0)));
        assert_eq!(tightened[0].new_value, Some(json!(5)));

        let relaxed = diff(
            json!({"properties": {"n": {"minimum": 5}}}),
            json!({"properties": {"n": {"minimum": 0}}}),
        );
        assert!(relaxed.is_empty());
    }

    #[test]
    fn test_upper_bounds() {
        let changes = diff(
            json!({"properties": {"s": {"maxLength": 64, "maxItems": 10, "maximum": 100}}}),
            json!({"properties": {"s": {"maxLength": 32, "maxItems": 20, "maximum": 99.5}}}),
        );
        let constraints: Vec<_> = changes.iter().map(|c| c.constraint.as_deref().unwrap()).collect();
        assert_eq!(constraints, vec!["maximum", "maxLength"]);
        assert_eq!(
            changes[1].message(),
            "Constraint tightened: s.maxLength decreased from 64 to 32 in test.json"
        );
    }

    #[test]
    fn test_one_sided_bound_is_not_compared() {
        let changes = diff(
            json!({"properties": {"n": {"type": "integer"}}}),
            json!({"properties": {"n": {"type": "integer", "minimum": 10}}}),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_any_pattern_change_is_breaking() {
        let changes = diff(
            json!({"properties": {"code": {"pattern": "^[A-Z]{3}$"}}}),
            json!({"properties": {"code": {"pattern": "^[A-Z]{2,4}$"}}}),
        );
        assert_eq!(kinds(&changes), vec![ChangeKind::PatternTightened]);

        let added = diff(
            json!({"properties": {"code": {"type": "string"}}}),
            json!({"properties": {"code": {"type": "string", "pattern": "^x$"}}}),
        );
        assert!(added.is_empty());
    }

    #[test]
    fn test_description_only_is_documentation() {
        let changes = diff(
            json!({"description": "Field record", "properties": {"a": {"type": "string", "description": "old"}}}),
            json!({"description": "Parcel record", "properties": {"a": {"type": "string", "description": "new"}}}),
        );
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.severity() == Severity::Documentation));
        assert_eq!(changes[0].field.as_deref(), Some("a"));
        assert_eq!(changes[1].field, None);
    }

    #[test]
    fn test_nested_object_paths() {
        let changes = diff(
            json!({"properties": {"address": {"type": "object", "properties": {"city": {"type": "string"}, "zip": {"type": "string"}}}}}),
            json!({"properties": {"address": {"type": "object", "properties": {"city": {"type": "integer"}}, "required": ["city"]}}}),
        );
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.kind(), c.field.clone().unwrap()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChangeKind::FieldRemoved, "address.zip".to_string()),
                (ChangeKind::FieldMadeRequired, "address.city".to_string()),
                (ChangeKind::FieldTypeChanged, "address.city".to_string()),
            ]
        );
    }

    #[test]
    fn test_array_items_and_definitions() {
        let changes = diff(
            json!({
                "properties": {"tags": {"type": "array", "items": {"enum": ["a", "b"]}}},
                "$defs": {"Point": {"properties": {"x": {"type": "number"}}}}
            }),
            json!({
                "properties": {"tags": {"type": "array", "items": {"enum": ["a"]}}},
                "$defs": {"Point": {"properties": {}}}
            }),
        );
        let fields: Vec<_> = changes.iter().map(|c| c.field.as_deref().unwrap()).collect();
        assert_eq!(fields, vec!["tags[]", "$defs.Point.x"]);
        assert_eq!(kinds(&changes), vec![ChangeKind::EnumValueRemoved, ChangeKind::FieldRemoved]);
    }

    #[test]
    fn test_depth_cap_stops_descent() {
        let old = json!({"properties": {"a": {"properties": {"b": {"type": "string"}}}}});
        let new = json!({"properties": {"a": {"properties": {"b": {"type": "integer"}}}}});

        let full = CompatibilityChecker::new().compare_documents("t.json", &old, &new);
        assert_eq!(kinds(&full), vec![ChangeKind::FieldTypeChanged]);

        let capped = CompatibilityChecker::new()
            .with_max_depth(1)
            .compare_documents("t.json", &old, &new);
        assert!(capped.is_empty());
    }

    #[test]
    fn test_ref_is_opaque() {
        let changes = diff(
            json!({"properties": {"owner": {"$ref": "user.json"}}}),
            json!({"properties": {"owner": {"$ref": "account.json"}}}),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_corpus_level_add_remove() {
        let old = Corpus::from_documents([("a.json", json!({})), ("b.json", json!({}))]);
        let new = Corpus::from_documents([("b.json", json!({})), ("c.json", json!({}))]);

        let changes = compare(&old, &new);
        let summary: Vec<_> = changes.iter().map(|c| (c.kind(), c.file.as_str())).collect();
        assert_eq!(
            summary,
            vec![(ChangeKind::SchemaRemoved, "a.json"), (ChangeKind::SchemaAdded, "c.json")]
        );
    }

    #[test]
    fn test_identical_corpora_have_no_changes() {
        let doc = json!({"type": "object", "properties": {"a": {"type": "string", "minLength": 1}}, "required": ["a"]});
        let old = Corpus::from_documents([("a.json", doc.clone())]);
        let new = Corpus::from_documents([("a.json", doc)]);
        assert!(compare(&old, &new).is_empty());
    }
}
