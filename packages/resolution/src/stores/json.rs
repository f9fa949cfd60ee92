//! File-backed store: JSONL for append-only collections, a JSON snapshot
//! for entities.
//!
//! Layout under the data directory:
//! - `filings.jsonl` - one FilingRecord per line, append-only
//! - `entities.json` - full entity collection, rewritten per update
//! - `audit.jsonl` - one Correction per line, append-only
//!
//! State loads into memory at open; writes go through to disk
//! synchronously so a cancelled run leaves every completed stage durable.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::traits::store::{AuditSink, EntityStore, FilingStore};
use crate::types::entity::Entity;
use crate::types::filing::FilingRecord;
use crate::types::report::Correction;

const FILINGS_FILE: &str = "filings.jsonl";
const ENTITIES_FILE: &str = "entities.json";
const AUDIT_FILE: &str = "audit.jsonl";

struct Inner {
    filings: HashMap<String, FilingRecord>,
    filing_order: Vec<String>,
    entities: HashMap<String, Entity>,
    entity_order: Vec<String>,
}

/// JSON-file-backed pipeline store.
pub struct JsonFileStore {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonFileStore {
    /// Open (or create) a store rooted at a data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(Self::storage_err)?;

        let mut inner = Inner {
            filings: HashMap::new(),
            filing_order: Vec::new(),
            entities: HashMap::new(),
            entity_order: Vec::new(),
        };

        let filings_path = dir.join(FILINGS_FILE);
        if filings_path.exists() {
            let file = File::open(&filings_path).map_err(Self::storage_err)?;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(Self::storage_err)?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: FilingRecord = serde_json::from_str(&line)?;
                if inner
                    .filings
                    .insert(record.submission_id.clone(), record.clone())
                    .is_none()
                {
                    inner.filing_order.push(record.submission_id);
                }
            }
        }

        let entities_path = dir.join(ENTITIES_FILE);
        if entities_path.exists() {
            let file = File::open(&entities_path).map_err(Self::storage_err)?;
            let entities: Vec<Entity> = serde_json::from_reader(BufReader::new(file))?;
            for entity in entities {
                inner.entity_order.push(entity.entity_id.clone());
                inner.entities.insert(entity.entity_id.clone(), entity);
            }
        }

        info!(
            dir = %dir.display(),
            filings = inner.filings.len(),
            entities = inner.entities.len(),
            "opened json store"
        );

        Ok(Self {
            dir,
            inner: Mutex::new(inner),
        })
    }

    fn storage_err(e: std::io::Error) -> PipelineError {
        PipelineError::Storage(Box::new(e))
    }

    fn append_line(&self, filename: &str, json: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(filename))
            .map_err(Self::storage_err)?;
        writeln!(file, "{json}").map_err(Self::storage_err)
    }

    fn write_entities_snapshot(&self, inner: &Inner) -> Result<()> {
        let collection: Vec<&Entity> = inner
            .entity_order
            .iter()
            .filter_map(|id| inner.entities.get(id))
            .collect();
        let json = serde_json::to_string_pretty(&collection)?;

        // Write-then-rename keeps the snapshot intact if interrupted.
        let tmp = self.dir.join(format!("{ENTITIES_FILE}.tmp"));
        std::fs::write(&tmp, json).map_err(Self::storage_err)?;
        std::fs::rename(&tmp, self.dir.join(ENTITIES_FILE)).map_err(Self::storage_err)
    }
}

#[async_trait]
impl FilingStore for JsonFileStore {
    async fn get_filing(&self, submission_id: &str) -> Result<Option<FilingRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .filings
            .get(submission_id)
            .cloned())
    }

    async fn store_filing(&self, filing: &FilingRecord) -> Result<()> {
        let is_new = {
            let mut inner = self.inner.lock().unwrap();
            let is_new = inner
                .filings
                .insert(filing.submission_id.clone(), filing.clone())
                .is_none();
            if is_new {
                inner.filing_order.push(filing.submission_id.clone());
            }
            is_new
        };
        // Content is immutable per id; re-appending a known id would only
        // duplicate the line.
        if is_new {
            self.append_line(FILINGS_FILE, &serde_json::to_string(filing)?)?;
        }
        Ok(())
    }

    async fn all_filings(&self) -> Result<Vec<FilingRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .filing_order
            .iter()
            .filter_map(|id| inner.filings.get(id).cloned())
            .collect())
    }

    async fn filing_count(&self) -> Result<usize> {
        Ok(self.inner.lock().unwrap().filings.len())
    }
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>> {
        Ok(self.inner.lock().unwrap().entities.get(entity_id).cloned())
    }

    async fn store_entity(&self, entity: &Entity) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .entities
            .insert(entity.entity_id.clone(), entity.clone())
            .is_none()
        {
            inner.entity_order.push(entity.entity_id.clone());
        }
        self.write_entities_snapshot(&inner)
    }

    async fn all_entities(&self) -> Result<Vec<Entity>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entity_order
            .iter()
            .filter_map(|id| inner.entities.get(id).cloned())
            .collect())
    }

    async fn entity_count(&self) -> Result<usize> {
        Ok(self.inner.lock().unwrap().entities.len())
    }

    async fn replace_entities(&self, new_entities: &[Entity]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.entities.clear();
        inner.entity_order.clear();
        for entity in new_entities {
            inner
                .entities
                .insert(entity.entity_id.clone(), entity.clone());
            inner.entity_order.push(entity.entity_id.clone());
        }
        self.write_entities_snapshot(&inner)
    }
}

#[async_trait]
impl AuditSink for JsonFileStore {
    async fn record(&self, correction: &Correction) -> Result<()> {
        self.append_line(AUDIT_FILE, &serde_json::to_string(correction)?)
    }

    async fn corrections(&self) -> Result<Vec<Correction>> {
        let path = self.dir.join(AUDIT_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(Self::storage_err)?;
        let mut corrections = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(Self::storage_err)?;
            if line.trim().is_empty() {
                continue;
            }
            corrections.push(serde_json::from_str(&line)?);
        }
        Ok(corrections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::filing::SubmissionType;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn filing(id: &str) -> FilingRecord {
        FilingRecord {
            submission_id: id.to_string(),
            received_at: Utc::now(),
            submission_type: SubmissionType::Application,
            docket_id: "24-0100".to_string(),
            description_text: "Filed By ULEC, LLC Pursuant To 52.15(g)".to_string(),
            filers: vec!["ULEC, LLC".to_string()],
            author_names: vec![],
            law_firm_names: vec![],
            document_refs: vec![],
            status: None,
        }
    }

    fn entity(normalized: &str) -> Entity {
        Entity {
            entity_id: Entity::derive_id(normalized),
            canonical_name: normalized.to_uppercase(),
            normalized_name: normalized.to_string(),
            dba_name: None,
            name_variants: BTreeSet::new(),
            filer_type: crate::types::entity::FilerType::Corporate,
            dockets: BTreeSet::new(),
            first_filing_at: Utc::now(),
            last_filing_at: Utc::now(),
            application_filings: vec![],
            related_filings: vec![],
            document_refs: vec![],
            contact_names: BTreeSet::new(),
            law_firms: BTreeSet::new(),
            proceeding_descriptions: BTreeSet::new(),
            extracted_fields: None,
            filing_signals: None,
            enrichment: None,
        }
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.store_filing(&filing("1")).await.unwrap();
            store.store_filing(&filing("2")).await.unwrap();
            store.store_entity(&entity("ulec")).await.unwrap();
            store
                .record(&Correction::new("e1", "canonical_name", "a", "b", "r1"))
                .await
                .unwrap();
        }

        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.filing_count().await.unwrap(), 2);
        assert_eq!(store.entity_count().await.unwrap(), 1);
        assert_eq!(store.corrections().await.unwrap().len(), 1);
        assert!(store
            .get_entity(&Entity::derive_id("ulec"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_duplicate_filing_not_appended_twice() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.store_filing(&filing("1")).await.unwrap();
            store.store_filing(&filing("1")).await.unwrap();
        }

        let contents = std::fs::read_to_string(dir.path().join(FILINGS_FILE)).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_replace_entities_rewrites_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.store_entity(&entity("old")).await.unwrap();
        store
            .replace_entities(&[entity("a"), entity("b")])
            .await
            .unwrap();

        let all = store.all_entities().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(store
            .get_entity(&Entity::derive_id("old"))
            .await
            .unwrap()
            .is_none());
    }
}
