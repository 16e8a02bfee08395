//! Finding tables to export and artifacts to import, plus destination renaming.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::errors::{DumpError, Result};
use crate::store::TableStore;

/// `<name>.data.json`, with `name` in the DynamoDB table-name alphabet.
static DATA_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9._-]+)\.data\.json$").expect("data file pattern is valid")
});

/// All table names in the store except the ones listed in `ignore`.
pub async fn list_remote_tables<S>(store: &S, ignore: &[String]) -> Result<Vec<String>>
where
    S: TableStore + ?Sized,
{
    let tables = store.list_tables().await?;
    let total = tables.len();
    let kept: Vec<String> = tables
        .into_iter()
        .filter(|name| !ignore.iter().any(|skip| skip == name))
        .collect();
    debug!(total, kept = kept.len(), "listed remote tables");
    Ok(kept)
}

/// Table names with both artifacts present in `dir`.
///
/// A name qualifies when `<name>.data.json` and `<name>.json` both exist.
/// Names come back in directory enumeration order.
pub async fn find_local_export_pairs(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| DumpError::io(dir, e))?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| DumpError::io(dir, e))? {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(captures) = DATA_FILE.captures(file_name) else {
            continue;
        };
        let name = &captures[1];

        let schema = dir.join(format!("{}.json", name));
        match tokio::fs::metadata(&schema).await {
            Ok(meta) if meta.is_file() => names.push(name.to_string()),
            Ok(_) => debug!(table = %name, "schema path is not a file, skipping"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(table = %name, "data file without schema, skipping");
            }
            Err(e) => return Err(DumpError::io(&schema, e)),
        }
    }

    debug!(dir = %dir.display(), found = names.len(), "found local export pairs");
    Ok(names)
}

/// Regex rewrite from source table name to destination table name.
#[derive(Debug, Clone)]
pub struct RenameRule {
    pattern: Option<Regex>,
    replacement: String,
}

impl RenameRule {
    /// Compile `pattern`. An empty pattern yields a rule that never renames.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let pattern = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern)?)
        };
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    /// A rule that keeps every name.
    pub fn identity() -> Self {
        Self {
            pattern: None,
            replacement: String::new(),
        }
    }

    /// Replace the first match of the pattern in `name`.
    pub fn apply(&self, name: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return name.to_string();
        };
        if !pattern.is_match(name) {
            debug!(table = %name, pattern = %pattern, "rename pattern does not match, keeping name");
            return name.to_string();
        }
        let renamed = pattern.replace(name, self.replacement.as_str()).into_owned();
        debug!(source = %name, destination = %renamed, "renamed table");
        renamed
    }
}

impl Default for RenameRule {
    fn default() -> Self {
        Self::identity()
    }
}
