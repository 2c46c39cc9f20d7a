//! Ordered catalog storage

use crate::catalog::entry::{CatalogEntry, SubjectResolver};
use crate::error::{Result, WaitingTimeError};
use crate::types::SubjectId;
use std::collections::HashMap;

/// Catalog entries of one kind, kept in registration order
#[derive(Debug, Clone)]
pub struct Catalog<S> {
    entries: Vec<S>,
    index: HashMap<SubjectId, usize>,
}

impl<S: CatalogEntry> Catalog<S> {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a catalog from entries in registration order
    pub fn from_entries(entries: Vec<S>) -> Result<Self> {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.add(entry)?;
        }
        Ok(catalog)
    }

    /// Register a new entry at the end of the catalog
    pub fn add(&mut self, entry: S) -> Result<()> {
        entry.validate()?;
        if self.index.contains_key(entry.id()) {
            return Err(WaitingTimeError::DuplicateEntry {
                kind: S::KIND,
                id: entry.id().to_string(),
            }
            .into());
        }

        self.index.insert(entry.id().to_string(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Replace an existing entry in place, returning the previous version
    pub fn replace(&mut self, entry: S) -> Result<S> {
        entry.validate()?;
        let position = self.position_or_not_found(entry.id())?;
        Ok(std::mem::replace(&mut self.entries[position], entry))
    }

    /// Remove an entry; later entries keep their relative order
    pub fn remove(&mut self, subject_id: &str) -> Result<S> {
        let position = self.position_or_not_found(subject_id)?;
        let removed = self.entries.remove(position);
        self.reindex();
        Ok(removed)
    }

    pub fn get(&self, subject_id: &str) -> Option<&S> {
        self.index.get(subject_id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.index.contains_key(subject_id)
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[S] {
        &self.entries
    }

    /// Subject ids in registration order
    pub fn ids(&self) -> Vec<SubjectId> {
        self.entries.iter().map(|e| e.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position_or_not_found(&self, subject_id: &str) -> Result<usize> {
        self.index.get(subject_id).copied().ok_or_else(|| {
            WaitingTimeError::NotFound {
                kind: S::KIND,
                id: subject_id.to_string(),
            }
            .into()
        })
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id().to_string(), i))
            .collect();
    }
}

impl<S: CatalogEntry> Default for Catalog<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CatalogEntry> SubjectResolver<S> for Catalog<S> {
    fn resolve(&self, subject_id: &str) -> Option<&S> {
        self.get(subject_id)
    }

    fn position(&self, subject_id: &str) -> Option<usize> {
        self.index.get(subject_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::types::Examination;

    fn exam(id: &str, name: &str) -> Examination {
        Examination {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} description", name),
            average_minutes: 10,
        }
    }

    #[test]
    fn test_registration_order_is_kept() {
        let catalog = Catalog::from_entries(vec![
            exam("exam-002", "CT"),
            exam("exam-001", "X-ray"),
            exam("exam-003", "MRI"),
        ])
        .unwrap();

        assert_eq!(catalog.ids(), vec!["exam-002", "exam-001", "exam-003"]);
        assert_eq!(catalog.position("exam-001"), Some(1));
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut catalog = Catalog::new();
        catalog.add(exam("exam-001", "X-ray")).unwrap();

        let err = catalog.add(exam("exam-001", "Other")).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(WaitingTimeError::DuplicateEntry { .. })
        ));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("exam-001").unwrap().name, "X-ray");
    }

    #[test]
    fn test_remove_reindexes() {
        let mut catalog = Catalog::from_entries(vec![
            exam("exam-001", "X-ray"),
            exam("exam-002", "CT"),
            exam("exam-003", "MRI"),
        ])
        .unwrap();

        let removed = catalog.remove("exam-002").unwrap();
        assert_eq!(removed.name, "CT");
        assert_eq!(catalog.position("exam-003"), Some(1));
        assert!(catalog.resolve("exam-002").is_none());
        assert!(catalog.remove("exam-002").is_err());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut catalog =
            Catalog::from_entries(vec![exam("exam-001", "X-ray"), exam("exam-002", "CT")])
                .unwrap();

        let previous = catalog.replace(exam("exam-001", "Chest X-ray")).unwrap();
        assert_eq!(previous.name, "X-ray");
        assert_eq!(catalog.entries()[0].name, "Chest X-ray");

        let err = catalog.replace(exam("exam-404", "Missing")).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(WaitingTimeError::NotFound { .. })
        ));
    }
}
