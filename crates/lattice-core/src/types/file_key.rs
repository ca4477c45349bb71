//! File identifiers handed to the parsing service.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Tagged identifier for a source input.
///
/// Total order: `Source < Json < Resource`, then by path. The tag decides
/// how the parse pipeline treats the file; everything downstream treats
/// keys as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKey {
    /// A parseable source file.
    Source(PathBuf),
    /// A JSON file. Only `package.json` receives semantic treatment.
    Json(PathBuf),
    /// An opaque asset (css, png, ...). Never parsed.
    Resource(PathBuf),
}

impl FileKey {
    pub fn path(&self) -> &Path {
        match self {
            FileKey::Source(p) | FileKey::Json(p) | FileKey::Resource(p) => p,
        }
    }

    /// True for `Json` keys whose basename is exactly `package.json`.
    pub fn is_package_json(&self) -> bool {
        match self {
            FileKey::Json(p) => p.file_name().is_some_and(|n| n == "package.json"),
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FileKey::Source(_) => 0,
            FileKey::Json(_) => 1,
            FileKey::Resource(_) => 2,
        }
    }
}

impl Ord for FileKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.path().cmp(other.path()))
    }
}

impl PartialOrd for FileKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_rank_then_path() {
        let a = FileKey::Source(PathBuf::from("z.js"));
        let b = FileKey::Json(PathBuf::from("a.json"));
        let c = FileKey::Source(PathBuf::from("a.js"));
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn package_json_detection() {
        assert!(FileKey::Json(PathBuf::from("pkg/package.json")).is_package_json());
        assert!(!FileKey::Json(PathBuf::from("pkg/other.json")).is_package_json());
        assert!(!FileKey::Source(PathBuf::from("package.json")).is_package_json());
    }
}
