//! Corpus loading
//!
//! A [`Corpus`] maps POSIX-style relative paths to parsed schema documents.
//! Documents come from a directory on disk, from a git revision, or from
//! memory. Unreadable and unparseable files never abort a load: they are
//! recorded as [`LoadWarning`]s and left out of the corpus.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use git2::{ErrorCode, ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::LoaderConfig;
use crate::error::{CompatError, Result};

/// One parsed schema file
pub type SchemaDocument = Value;

/// A file that was excluded from the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadWarning {
    pub path: String,
    pub reason: String,
}

/// All schema documents of one side of a comparison
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: BTreeMap<String, SchemaDocument>,
    warnings: Vec<LoadWarning>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from already parsed documents
    pub fn from_documents<I, K>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaDocument)>,
        K: AsRef<str>,
    {
        let mut corpus = Self::new();
        for (path, document) in documents {
            corpus.insert(path.as_ref(), document);
        }
        corpus
    }

    /// Load every schema document below `dir`
    ///
    /// A missing directory yields an empty corpus.
    pub fn load_dir(dir: &Path, config: &LoaderConfig) -> Self {
        let mut corpus = Self::new();

        if !dir.is_dir() {
            info!(dir = %dir.display(), "schema directory not found, using empty corpus");
            return corpus;
        }

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| dir.display().to_string());
                    corpus.warn(path, e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(dir) {
                Ok(relative) => match normalize_path(relative) {
                    Some(relative) => relative,
                    None => continue,
                },
                Err(_) => continue,
            };
            if !is_candidate(&relative, config) {
                continue;
            }

            match fs::read_to_string(entry.path()) {
                Ok(content) => corpus.insert_parsed(relative, &content),
                Err(e) => corpus.warn(relative, e.to_string()),
            }
        }

        info!(
            dir = %dir.display(),
            documents = corpus.len(),
            warnings = corpus.warnings.len(),
            "loaded schema corpus"
        );
        corpus
    }

    /// Load every schema document of a git revision (tag, branch or commit)
    ///
    /// `subdir` restricts the load to one tree of the revision; a subdirectory
    /// the revision does not contain yields an empty corpus.
    pub fn load_git(
        repo_path: &Path,
        revision: &str,
        subdir: Option<&Path>,
        config: &LoaderConfig,
    ) -> Result<Self> {
        let repo = Repository::discover(repo_path)?;
        let object = repo
            .revparse_single(revision)
            .map_err(|_| CompatError::SourceNotFound(format!("git revision '{}'", revision)))?;
        let root = object.peel_to_tree()?;

        let tree = match subdir.filter(|s| !s.as_os_str().is_empty()) {
            Some(sub) => match root.get_path(sub) {
                Ok(entry) => entry.to_object(&repo)?.peel_to_tree()?,
                Err(e) if e.code() == ErrorCode::NotFound => {
                    info!(revision, subdir = %sub.display(), "subdirectory not in revision, using empty corpus");
                    return Ok(Self::new());
                }
                Err(e) => return Err(e.into()),
            },
            None => root,
        };

        let mut blobs = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |parent, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    blobs.push((format!("{}{}", parent, name), entry.id()));
                }
            }
            TreeWalkResult::Ok
        })?;
        blobs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut corpus = Self::new();
        for (relative, oid) in blobs {
            if !is_candidate(&relative, config) {
                continue;
            }
            let blob = repo.find_blob(oid)?;
            match std::str::from_utf8(blob.content()) {
                Ok(text) => corpus.insert_parsed(relative, text),
                Err(e) => corpus.warn(relative, e.to_string()),
            }
        }

        info!(
            revision,
            documents = corpus.len(),
            warnings = corpus.warnings.len(),
            "loaded schema corpus from git"
        );
        Ok(corpus)
    }

    /// Add or replace a document
    ///
    /// A path that leaves the corpus root (`..`, absolute) is recorded as a
    /// warning instead.
    pub fn insert(&mut self, path: &str, document: SchemaDocument) {
        match normalize_path(Path::new(path)) {
            Some(normalized) => {
                self.documents.insert(normalized, document);
            }
            None => self.warn(path.to_string(), "path leaves the corpus root".to_string()),
        }
    }

    pub fn get(&self, path: &str) -> Option<&SchemaDocument> {
        self.documents.get(path)
    }

    /// Paths in lexicographic order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaDocument)> {
        self.documents.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    fn insert_parsed(&mut self, relative: String, content: &str) {
        match serde_json::from_str::<Value>(content) {
            Ok(document) => {
                debug!(path = %relative, "loaded schema");
                self.documents.insert(relative, document);
            }
            Err(e) => self.warn(relative, e.to_string()),
        }
    }

    fn warn(&mut self, path: String, reason: String) {
        warn!(path = %path, reason = %reason, "excluding schema document");
        self.warnings.push(LoadWarning { path, reason });
    }
}

/// Extension and skip-prefix filter on a normalized relative path
fn is_candidate(relative: &str, config: &LoaderConfig) -> bool {
    let extension_ok = Path::new(relative)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| config.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false);

    extension_ok && !config.skip_prefixes.iter().any(|p| relative.starts_with(p.as_str()))
}

/// Forward-slash form of a relative path; `None` if it escapes the root
fn normalize_path(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}
