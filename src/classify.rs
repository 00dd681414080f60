//! Partition of a change list by severity

use serde::{Deserialize, Serialize};

use crate::change::{ChangeRecord, Severity};

/// Changes grouped by severity, plus the verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub breaking: Vec<ChangeRecord>,
    pub non_breaking: Vec<ChangeRecord>,
    pub documentation: Vec<ChangeRecord>,
    pub total: usize,
    pub has_breaking: bool,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// All records again, grouped breaking first
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.breaking
            .iter()
            .chain(&self.non_breaking)
            .chain(&self.documentation)
    }
}

/// Split `changes` by severity, keeping input order within each group
pub fn classify(changes: &[ChangeRecord]) -> Classification {
    let mut classification = Classification::default();

    for change in changes {
        match change.severity() {
            Severity::Breaking => classification.breaking.push(change.clone()),
            Severity::NonBreaking => classification.non_breaking.push(change.clone()),
            Severity::Documentation => classification.documentation.push(change.clone()),
        }
    }

    classification.total = changes.len();
    classification.has_breaking = !classification.breaking.is_empty();
    classification
}
