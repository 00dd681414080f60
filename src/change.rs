//! Change records produced by the compatibility engine
//!
//! Every detected difference is a [`ChangeRecord`] tagged with a
//! [`ChangeKind`]. The severity of a record is never chosen by the caller:
//! it is looked up from the kind when the record is built.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Compatibility class of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Previously valid producers or consumers may become invalid
    Breaking,
    /// Additive change, old data stays valid
    NonBreaking,
    /// Free-text only
    Documentation,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Breaking => "BREAKING",
            Severity::NonBreaking => "NON_BREAKING",
            Severity::Documentation => "DOCUMENTATION",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of structural difference between two schema versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    SchemaRemoved,
    SchemaAdded,
    FieldRemoved,
    FieldMadeRequired,
    FieldAddedOptional,
    FieldTypeChanged,
    PatternTightened,
    MinMaxTightened,
    EnumValueRemoved,
    EnumValueAdded,
    DescriptionChanged,
}

impl ChangeKind {
    /// Every kind, in declaration order
    pub const ALL: [ChangeKind; 11] = [
        ChangeKind::SchemaRemoved,
        ChangeKind::SchemaAdded,
        ChangeKind::FieldRemoved,
        ChangeKind::FieldMadeRequired,
        ChangeKind::FieldAddedOptional,
        ChangeKind::FieldTypeChanged,
        ChangeKind::PatternTightened,
        ChangeKind::MinMaxTightened,
        ChangeKind::EnumValueRemoved,
        ChangeKind::EnumValueAdded,
        ChangeKind::DescriptionChanged,
    ];

    /// Severity table
    pub fn severity(&self) -> Severity {
        match self {
            ChangeKind::SchemaRemoved
            | ChangeKind::FieldRemoved
            | ChangeKind::FieldMadeRequired
            | ChangeKind::FieldTypeChanged
            | ChangeKind::PatternTightened
            | ChangeKind::MinMaxTightened
            | ChangeKind::EnumValueRemoved => Severity::Breaking,
            ChangeKind::SchemaAdded
            | ChangeKind::FieldAddedOptional
            | ChangeKind::EnumValueAdded => Severity::NonBreaking,
            ChangeKind::DescriptionChanged => Severity::Documentation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::SchemaRemoved => "SCHEMA_REMOVED",
            ChangeKind::SchemaAdded => "SCHEMA_ADDED",
            ChangeKind::FieldRemoved => "FIELD_REMOVED",
            ChangeKind::FieldMadeRequired => "FIELD_MADE_REQUIRED",
            ChangeKind::FieldAddedOptional => "FIELD_ADDED_OPTIONAL",
            ChangeKind::FieldTypeChanged => "FIELD_TYPE_CHANGED",
            ChangeKind::PatternTightened => "PATTERN_TIGHTENED",
            ChangeKind::MinMaxTightened => "MIN_MAX_TIGHTENED",
            ChangeKind::EnumValueRemoved => "ENUM_VALUE_REMOVED",
            ChangeKind::EnumValueAdded => "ENUM_VALUE_ADDED",
            ChangeKind::DescriptionChanged => "DESCRIPTION_CHANGED",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected difference
///
/// `kind`, `severity` and `message` are read-only: severity is looked up
/// from the kind and the message is rendered from the attributes. A
/// deserialized record whose severity contradicts its kind is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct ChangeRecord {
    kind: ChangeKind,
    severity: Severity,
    /// Relative path of the schema document
    pub file: String,
    /// Dotted path of the property inside the document (`a.b`, `tags[]`, `$defs.Name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Enum value added or removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_type: Option<String>,
    /// Bound keyword for `MIN_MAX_TIGHTENED` (`minimum`, `maxLength`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    message: String,
    /// `FIELD_MADE_REQUIRED` on a property absent from the old version
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    introduced: bool,
}

/// Serialized form of a [`ChangeRecord`]
///
/// `severity` may be omitted; the stored `message` is ignored and rendered again.
#[derive(Deserialize)]
struct StoredRecord {
    kind: ChangeKind,
    #[serde(default)]
    severity: Option<Severity>,
    file: String,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    old_value: Option<Value>,
    #[serde(default)]
    new_value: Option<Value>,
    #[serde(default)]
    old_type: Option<String>,
    #[serde(default)]
    new_type: Option<String>,
    #[serde(default)]
    constraint: Option<String>,
    #[serde(default)]
    introduced: bool,
}

impl TryFrom<StoredRecord> for ChangeRecord {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let expected = stored.kind.severity();
        if let Some(severity) = stored.severity.filter(|s| *s != expected) {
            return Err(format!(
                "severity {} does not match {} (expected {})",
                severity, stored.kind, expected
            ));
        }

        let mut record = Self::new(stored.kind, stored.file);
        record.field = stored.field;
        record.value = stored.value;
        record.old_value = stored.old_value;
        record.new_value = stored.new_value;
        record.old_type = stored.old_type;
        record.new_type = stored.new_type;
        record.constraint = stored.constraint;
        record.introduced = stored.introduced;
        record.message = record.render_message();
        Ok(record)
    }
}

impl ChangeRecord {
    /// Start a record; severity comes from the kind
    pub fn new(kind: ChangeKind, file: impl Into<String>) -> Self {
        let mut record = Self {
            kind,
            severity: kind.severity(),
            file: file.into(),
            field: None,
            value: None,
            old_value: None,
            new_value: None,
            old_type: None,
            new_type: None,
            constraint: None,
            message: String::new(),
            introduced: false,
        };
        record.message = record.render_message();
        record
    }

    pub fn with_field(mut self, field: Option<&str>) -> Self {
        self.field = field.map(str::to_string);
        self.message = self.render_message();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self.message = self.render_message();
        self
    }

    pub fn with_values(mut self, old: Option<Value>, new: Option<Value>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self.message = self.render_message();
        self
    }

    pub fn with_types(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_type = Some(old.into());
        self.new_type = Some(new.into());
        self.message = self.render_message();
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self.message = self.render_message();
        self
    }

    /// Mark a `FIELD_MADE_REQUIRED` record as a brand-new property
    pub fn newly_introduced(mut self) -> Self {
        self.introduced = true;
        self.message = self.render_message();
        self
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Human-readable description, rendered from the kind and attributes
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_breaking(&self) -> bool {
        self.severity == Severity::Breaking
    }

    fn render_message(&self) -> String {
        let file = &self.file;
        let field = self.field.as_deref().unwrap_or("<root>");
        let nested = self
            .field
            .as_deref()
            .map(|f| format!(" (field {})", f))
            .unwrap_or_default();

        match self.kind {
            ChangeKind::SchemaRemoved => format!("Schema removed: {}", file),
            ChangeKind::SchemaAdded => format!("Schema added: {}", file),
            ChangeKind::FieldRemoved => format!("Field removed: {} in {}", field, file),
            ChangeKind::FieldMadeRequired if self.introduced => {
                format!("New required field added: {} in {}", field, file)
            }
            ChangeKind::FieldMadeRequired => format!("Field made required: {} in {}", field, file),
            ChangeKind::FieldAddedOptional => format!("Optional field added: {} in {}", field, file),
            ChangeKind::FieldTypeChanged => format!(
                "Type changed: {} from {} to {} in {}",
                field,
                self.old_type.as_deref().unwrap_or("?"),
                self.new_type.as_deref().unwrap_or("?"),
                file
            ),
            ChangeKind::PatternTightened => {
                format!("Pattern changed: {} in {} (potentially breaking)", field, file)
            }
            ChangeKind::MinMaxTightened => {
                let constraint = self.constraint.as_deref().unwrap_or("?");
                let direction = if constraint.starts_with("min") {
                    "increased"
                } else {
                    "decreased"
                };
                format!(
                    "Constraint tightened: {}.{} {} from {} to {} in {}",
                    field,
                    constraint,
                    direction,
                    display_value(self.old_value.as_ref()),
                    display_value(self.new_value.as_ref()),
                    file
                )
            }
            ChangeKind::EnumValueRemoved => format!(
                "Enum value removed: {} in {}{}",
                display_value(self.value.as_ref()),
                file,
                nested
            ),
            ChangeKind::EnumValueAdded => format!(
                "Enum value added: {} in {}{}",
                display_value(self.value.as_ref()),
                file,
                nested
            ),
            ChangeKind::DescriptionChanged => format!("Description updated in {}{}", file, nested),
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Render a JSON value for messages; strings lose their quotes
pub(crate) fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "none".to_string(),
    }
}
