//! Dream recorder for `Sanctum_Dreamspace/`.

use std::path::PathBuf;

use crate::layout::SanctumLayout;
use crate::{SanctumError, SanctumResult};

/// Keep alphanumerics, space, `_` and `-`; trim trailing whitespace.
pub fn clean_dream_name(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Record a new dream. Never overwrites an existing one.
pub fn create_dream(layout: &SanctumLayout, title: &str, content: &str) -> SanctumResult<PathBuf> {
    let dir = layout.dreamspace();
    if !dir.is_dir() {
        return Err(SanctumError::MissingDirectory(dir));
    }
    let clean = clean_dream_name(title);
    if clean.trim().is_empty() {
        return Err(SanctumError::InvalidName(title.to_string()));
    }
    let path = dir.join(format!("{}.txt", clean));
    if path.exists() {
        return Err(SanctumError::AlreadyExists(format!("{}.txt", clean)));
    }
    std::fs::write(&path, content)?;
    tracing::info!(target: "sanctum::dreams", file = %path.display(), "dream recorded");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_cleaned() {
        assert_eq!(clean_dream_name("My First Dream!  "), "My First Dream");
        assert_eq!(clean_dream_name("../etc/passwd"), "etcpasswd");
        assert_eq!(clean_dream_name("a_b-c.txt"), "a_b-ctxt");
    }

    #[test]
    fn create_then_refuse_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SanctumLayout::new(dir.path());
        std::fs::create_dir_all(layout.dreamspace()).unwrap();

        let path = create_dream(&layout, "Night Tide", "The sea folded inward.").unwrap();
        assert_eq!(path.file_name().unwrap(), "Night Tide.txt");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "The sea folded inward.");

        let err = create_dream(&layout, "Night Tide", "again").unwrap_err();
        assert!(matches!(err, SanctumError::AlreadyExists(_)));
    }

    #[test]
    fn rejects_missing_dir_and_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SanctumLayout::new(dir.path());
        assert!(matches!(
            create_dream(&layout, "x", "y").unwrap_err(),
            SanctumError::MissingDirectory(_)
        ));
        std::fs::create_dir_all(layout.dreamspace()).unwrap();
        assert!(matches!(
            create_dream(&layout, "???", "y").unwrap_err(),
            SanctumError::InvalidName(_)
        ));
    }
}
