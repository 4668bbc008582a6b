//! Immutable name lookup table.
//!
//! # Design
//! - One bulk fetch at construction; afterwards lookups are plain map reads.
//! - The table is shared behind an `Arc` and never mutated, so readers need no lock.

use std::collections::HashMap;
use std::sync::Arc;

use tapemig_core::{CoreResult, MappingSource, NameLookup, TransformError};
use tracing::info;

/// Snapshot of the source → destination identifier mapping.
#[derive(Debug, Clone, Default)]
pub struct NameLookupTable {
    table: Arc<HashMap<String, String>>,
}

impl NameLookupTable {
    /// Build from an already fetched mapping.
    #[must_use]
    pub fn from_mappings(mappings: HashMap<String, String>) -> Self {
        Self {
            table: Arc::new(mappings),
        }
    }

    /// Fetch the whole mapping once from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bulk fetch fails.
    pub async fn load(source: &dyn MappingSource) -> CoreResult<Self> {
        let mappings = source.fetch_mappings().await?;
        info!(mappings = mappings.len(), "name lookup table loaded");
        Ok(Self::from_mappings(mappings))
    }

    /// Number of mapped source identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl NameLookup for NameLookupTable {
    fn resolve(&self, source_id: &str) -> Result<&str, TransformError> {
        self.table
            .get(source_id)
            .map(String::as_str)
            .ok_or_else(|| TransformError::MappingNotFound {
                source_id: source_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapemig_test_support::mocks::CountingMappingSource;

    #[tokio::test]
    async fn load_fetches_once_and_resolves_repeatedly() -> anyhow::Result<()> {
        let source = CountingMappingSource::new(&[("AAG", "SFB"), ("ABC", "XYZ")]);
        let table = NameLookupTable::load(&source).await?;

        assert_eq!(table.resolve("AAG")?, "SFB");
        assert_eq!(table.resolve("AAG")?, "SFB");
        assert_eq!(table.resolve("ABC")?, "XYZ");
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(table.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_key_is_an_error_every_time() {
        let table = NameLookupTable::default();
        assert!(table.is_empty());
        for _ in 0..2 {
            match table.resolve("NOPE") {
                Err(TransformError::MappingNotFound { source_id }) => assert_eq!(source_id, "NOPE"),
                other => panic!("expected mapping miss, got {other:?}"),
            }
        }
    }

    #[test]
    fn clones_share_the_snapshot() {
        let table = NameLookupTable::from_mappings(HashMap::from([(
            "AAG".to_string(),
            "SFB".to_string(),
        )]));
        let clone = table.clone();
        assert!(Arc::ptr_eq(&table.table, &clone.table));
    }
}
