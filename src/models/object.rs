//! Identifies an object stored in the remote bucket.

use serde::Serialize;
use uuid::Uuid;

const FALLBACK_FILENAME: &str = "upload";

/// Where an uploaded object lives: bucket plus object name.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdentity {
    pub bucket: String,
    pub object_name: String,
}

impl ObjectIdentity {
    /// Name a new object `{uuid}_{filename}`.
    ///
    /// Only the final path component of `original_filename` is kept so the
    /// object name never contains a `/` or `\`. The random prefix makes
    /// collisions negligible; they are not otherwise guarded against.
    pub fn generate(bucket: impl Into<String>, original_filename: &str) -> Self {
        let filename = original_filename
            .rsplit(['/', '\\'])
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME);

        Self {
            bucket: bucket.into(),
            object_name: format!("{}_{}", Uuid::new_v4(), filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_filename_with_uuid() {
        let identity = ObjectIdentity::generate("profiles", "cat.png");
        assert_eq!(identity.bucket, "profiles");

        let (prefix, name) = identity.object_name.split_once('_').unwrap();
        assert_eq!(name, "cat.png");
        assert!(Uuid::parse_str(prefix).is_ok());
    }

    #[test]
    fn strips_directories_from_filename() {
        let identity = ObjectIdentity::generate("profiles", "C:\\Users\\kim/photos/me.jpg");
        assert!(identity.object_name.ends_with("_me.jpg"));
        assert!(!identity.object_name.contains('/'));
    }

    #[test]
    fn empty_filename_falls_back() {
        let identity = ObjectIdentity::generate("profiles", "  ");
        assert!(identity.object_name.ends_with("_upload"));
    }

    #[test]
    fn names_are_unique_per_call() {
        let a = ObjectIdentity::generate("profiles", "cat.png");
        let b = ObjectIdentity::generate("profiles", "cat.png");
        assert_ne!(a.object_name, b.object_name);
    }
}
