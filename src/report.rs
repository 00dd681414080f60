//! Rendering of classified changes
//!
//! Three forms are produced from the same [`Classification`]:
//! a JSON summary for machines, a long-form markdown report, and a
//! condensed review comment. All of them are deterministic for a given
//! change list.

use serde::Serialize;

use crate::change::ChangeRecord;
use crate::classify::Classification;
use crate::error::Result;
use crate::version::BumpLevel;

/// Non-breaking changes listed in a review comment before truncation
pub const DEFAULT_COMMENT_LIMIT: usize = 5;

/// Machine-readable summary
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    #[serde(flatten)]
    pub classification: &'a Classification,
    pub required_bump: BumpLevel,
}

impl<'a> Summary<'a> {
    pub fn new(classification: &'a Classification) -> Self {
        Self {
            classification,
            required_bump: BumpLevel::required_for(classification),
        }
    }
}

/// Pretty-printed JSON summary
pub fn render_summary(classification: &Classification) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Summary::new(classification))?)
}

/// Long-form markdown report grouped by severity
pub fn render_report(classification: &Classification) -> String {
    let mut out = String::new();
    out.push_str("# Schema Compatibility Report\n\n");

    out.push_str("## Summary\n\n");
    out.push_str(&format!("- **Total Changes:** {}\n", classification.total));
    out.push_str(&format!("- **Breaking Changes:** {}\n", classification.breaking.len()));
    out.push_str(&format!("- **Non-Breaking Changes:** {}\n", classification.non_breaking.len()));
    out.push_str(&format!("- **Documentation Changes:** {}\n", classification.documentation.len()));
    out.push_str(&format!(
        "- **Required Version Bump:** {}\n\n",
        BumpLevel::required_for(classification)
    ));

    if classification.has_breaking {
        out.push_str("⚠️  **BREAKING CHANGES DETECTED** - requires a MAJOR version bump\n\n");
    } else {
        out.push_str("✅ No breaking changes detected\n\n");
    }

    if !classification.breaking.is_empty() {
        out.push_str("## ⚠️  Breaking Changes\n\n");
        for change in &classification.breaking {
            push_detail(&mut out, change);
        }
    }

    if !classification.non_breaking.is_empty() {
        out.push_str("## ✨ Non-Breaking Changes\n\n");
        for change in &classification.non_breaking {
            out.push_str(&format!("- {}\n", change.message()));
        }
        out.push('\n');
    }

    if !classification.documentation.is_empty() {
        out.push_str("## 📝 Documentation Changes\n\n");
        for change in &classification.documentation {
            out.push_str(&format!("- {}\n", change.message()));
        }
        out.push('\n');
    }

    out
}

fn push_detail(out: &mut String, change: &ChangeRecord) {
    out.push_str(&format!("### {}\n", change.kind()));
    out.push_str(&format!("- **File:** `{}`\n", change.file));
    if let Some(field) = &change.field {
        out.push_str(&format!("- **Field:** `{}`\n", field));
    }
    if let (Some(old), Some(new)) = (&change.old_type, &change.new_type) {
        out.push_str(&format!("- **Type:** `{}` → `{}`\n", old, new));
    }
    if let Some(constraint) = &change.constraint {
        out.push_str(&format!("- **Constraint:** `{}`\n", constraint));
    }
    out.push_str(&format!("- **Message:** {}\n\n", change.message()));
}

/// Condensed review comment
///
/// Breaking changes are always listed in full; non-breaking changes are cut
/// after `limit` entries with a "+N more" line.
pub fn render_comment(classification: &Classification, limit: usize) -> String {
    let mut out = String::new();
    out.push_str("## 🔍 Contract Changes Analysis\n\n");

    if classification.has_breaking {
        out.push_str("### ⚠️  BREAKING CHANGES DETECTED\n\n");
        out.push_str("**Action Required:** this change needs a **MAJOR** version bump.\n\n");
        out.push_str("**Breaking Changes:**\n");
        for change in &classification.breaking {
            out.push_str(&format!("- ❌ `{}`: {}\n", change.file, change.message()));
        }
        out.push('\n');
    } else {
        out.push_str("### ✅ No Breaking Changes\n\n");
    }

    if !classification.non_breaking.is_empty() {
        out.push_str("**Non-Breaking Changes:**\n");
        for change in classification.non_breaking.iter().take(limit) {
            out.push_str(&format!("- ✨ {}\n", change.message()));
        }
        let hidden = classification.non_breaking.len().saturating_sub(limit);
        if hidden > 0 {
            out.push_str(&format!("- ... +{} more\n", hidden));
        }
        out.push('\n');
    }

    if !classification.documentation.is_empty() {
        out.push_str(&format!(
            "**Documentation Changes:** {}\n\n",
            classification.documentation.len()
        ));
    }

    out.push_str(&format!(
        "**Recommended Version Bump:** `{}`\n",
        BumpLevel::required_for(classification)
    ));
    out
}
