//! In-memory store for testing and single-run pipelines.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::traits::store::{AuditSink, EntityStore, FilingStore};
use crate::types::entity::Entity;
use crate::types::filing::FilingRecord;
use crate::types::report::Correction;

/// In-memory implementation of the pipeline store.
///
/// Insertion order is preserved for both collections so stage output is
/// deterministic under test.
#[derive(Default)]
pub struct MemoryStore {
    filings: RwLock<HashMap<String, FilingRecord>>,
    filing_order: RwLock<Vec<String>>,
    entities: RwLock<HashMap<String, Entity>>,
    entity_order: RwLock<Vec<String>>,
    audit: RwLock<Vec<Correction>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FilingStore for MemoryStore {
    async fn get_filing(&self, submission_id: &str) -> Result<Option<FilingRecord>> {
        Ok(self.filings.read().unwrap().get(submission_id).cloned())
    }

    async fn store_filing(&self, filing: &FilingRecord) -> Result<()> {
        let mut filings = self.filings.write().unwrap();
        if filings
            .insert(filing.submission_id.clone(), filing.clone())
            .is_none()
        {
            self.filing_order
                .write()
                .unwrap()
                .push(filing.submission_id.clone());
        }
        Ok(())
    }

    async fn all_filings(&self) -> Result<Vec<FilingRecord>> {
        let filings = self.filings.read().unwrap();
        Ok(self
            .filing_order
            .read()
            .unwrap()
            .iter()
            .filter_map(|id| filings.get(id).cloned())
            .collect())
    }

    async fn filing_count(&self) -> Result<usize> {
        Ok(self.filings.read().unwrap().len())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>> {
        Ok(self.entities.read().unwrap().get(entity_id).cloned())
    }

    async fn store_entity(&self, entity: &Entity) -> Result<()> {
        let mut entities = self.entities.write().unwrap();
        if entities
            .insert(entity.entity_id.clone(), entity.clone())
            .is_none()
        {
            self.entity_order
                .write()
                .unwrap()
                .push(entity.entity_id.clone());
        }
        Ok(())
    }

    async fn all_entities(&self) -> Result<Vec<Entity>> {
        let entities = self.entities.read().unwrap();
        Ok(self
            .entity_order
            .read()
            .unwrap()
            .iter()
            .filter_map(|id| entities.get(id).cloned())
            .collect())
    }

    async fn entity_count(&self) -> Result<usize> {
        Ok(self.entities.read().unwrap().len())
    }

    async fn replace_entities(&self, new_entities: &[Entity]) -> Result<()> {
        let mut entities = self.entities.write().unwrap();
        let mut order = self.entity_order.write().unwrap();
        entities.clear();
        order.clear();
        for entity in new_entities {
            entities.insert(entity.entity_id.clone(), entity.clone());
            order.push(entity.entity_id.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, correction: &Correction) -> Result<()> {
        self.audit.write().unwrap().push(correction.clone());
        Ok(())
    }

    async fn corrections(&self) -> Result<Vec<Correction>> {
        Ok(self.audit.read().unwrap().clone())
    }
}
