use crate::core::schema::{normalize, SchemaError, SchemaRules};
use crate::models::{DatasetSummary, Record};
use crate::services::source::{SourceError, Workbook};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors that abort loading a dataset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A normalized sheet plus where it came from
///
/// Immutable once built; a new load produces a new `Dataset`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: Uuid,
    pub source: String,
    pub sheet: String,
    pub sheets: Vec<String>,
    pub records: Vec<Record>,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Select a sheet from `workbook` and normalize it
    pub fn from_workbook(
        workbook: &Workbook,
        source: impl Into<String>,
        sheet: Option<&str>,
        rules: &SchemaRules,
    ) -> Result<Self, LoadError> {
        let (sheet_name, table) = workbook.select(sheet)?;
        let records = normalize(table, rules)?;

        Ok(Self {
            id: Uuid::new_v4(),
            source: source.into(),
            sheet: sheet_name.to_string(),
            sheets: workbook.sheet_names(),
            records,
            loaded_at: Utc::now(),
        })
    }

    /// Read a CSV file or directory and normalize the chosen sheet
    pub fn from_path(
        path: impl AsRef<Path>,
        sheet: Option<&str>,
        rules: &SchemaRules,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let workbook = Workbook::from_path(path)?;
        Self::from_workbook(&workbook, path.display().to_string(), sheet, rules)
    }

    /// Sorted, de-duplicated names for pickers
    pub fn names(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.identifier.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.to_string(),
            source: self.source.clone(),
            sheet: self.sheet.clone(),
            sheets: self.sheets.clone(),
            rows: self.records.len(),
            unique_names: self
                .records
                .iter()
                .map(|r| r.identifier.as_str())
                .collect::<BTreeSet<_>>()
                .len(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Holds the dataset currently in use
///
/// Loading replaces the whole dataset; readers keep their own `Arc` so a
/// replacement never disturbs a query in flight.
#[derive(Debug, Default)]
pub struct Session {
    current: RwLock<Option<Arc<Dataset>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let previous = self.current.write().await.replace(Arc::clone(&dataset));

        if let Some(old) = previous {
            tracing::info!(
                "Replaced dataset {} ({} rows) with {} ({} rows)",
                old.id,
                old.records.len(),
                dataset.id,
                dataset.records.len()
            );
        }
        dataset
    }

    pub async fn current(&self) -> Option<Arc<Dataset>> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawTable;

    fn workbook() -> Workbook {
        Workbook::from_sheets(vec![
            (
                "Query2".to_string(),
                RawTable::from_strs(
                    &["Sub Name", "Lattitude", "Longitude"],
                    &[&["b", "1", "1"], &["a", "2", "2"], &["b", "3", "3"]],
                ),
            ),
            (
                "Broken".to_string(),
                RawTable::from_strs(&["Name"], &[&["x"]]),
            ),
        ])
    }

    #[test]
    fn test_from_workbook_summary() {
        let ds = Dataset::from_workbook(&workbook(), "memory", None, &SchemaRules::default()).unwrap();
        assert_eq!(ds.sheet, "Query2");
        assert_eq!(ds.names(), vec!["a", "b"]);

        let summary = ds.summary();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.unique_names, 2);
        assert_eq!(summary.sheets, vec!["Query2", "Broken"]);
    }

    #[test]
    fn test_schema_failure_surfaces() {
        let err = Dataset::from_workbook(&workbook(), "memory", Some("Broken"), &SchemaRules::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Schema(SchemaError::MissingColumns { .. })));
    }

    #[tokio::test]
    async fn test_session_replaces_dataset() {
        let session = Session::new();
        assert!(session.current().await.is_none());

        let first = Dataset::from_workbook(&workbook(), "one", None, &SchemaRules::default()).unwrap();
        let held = session.replace(first).await;

        let second = Dataset::from_workbook(&workbook(), "two", None, &SchemaRules::default()).unwrap();
        session.replace(second).await;

        assert_eq!(session.current().await.unwrap().source, "two");
        // An earlier reader still sees the dataset it started with.
        assert_eq!(held.source, "one");
    }
}
