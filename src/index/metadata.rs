use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::core::error::{Error, Result};
use crate::core::stats::{DocumentStatistics, IndexStatistics};
use crate::core::types::{DocumentId, IndexKey, ObjectTypeId};
use crate::index::id_pool::IdPool;
use crate::index::persistent_map::{DocumentIdMap, HashedMap};
use crate::scoring::boost::{ScoreBoostMetadata, ScoreBoostOptions};

/// Everything known about one indexed document apart from its tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata<K> {
    pub id: DocumentId,
    pub key: K,
    pub object_type_id: Option<ObjectTypeId>,  // None for plain text documents
    pub statistics: DocumentStatistics,
    pub freshness: Option<DateTime<Utc>>,
    pub magnitude: Option<f64>,
}

/// Input for [`IndexMetadata::add`], gathered before an id is allocated.
#[derive(Debug, Clone)]
pub struct NewDocument<K> {
    pub key: K,
    pub object_type_id: Option<ObjectTypeId>,
    pub statistics: DocumentStatistics,
    pub freshness: Option<DateTime<Utc>>,
    pub magnitude: Option<f64>,
}

impl<K> NewDocument<K> {
    pub fn text(key: K, statistics: DocumentStatistics) -> Self {
        NewDocument {
            key,
            object_type_id: None,
            statistics,
            freshness: None,
            magnitude: None,
        }
    }
}

/// Key/id mapping, per-document statistics and score boost ranges. Each
/// mutation works on a clone and publishes it together with its trie; the
/// document and key maps share structure with the published version, so a
/// clone copies only the paths later writes touch.
#[derive(Debug, Clone)]
pub struct IndexMetadata<K: IndexKey> {
    documents: DocumentIdMap<Arc<DocumentMetadata<K>>>,
    keys: HashedMap<K, DocumentId>,
    id_pool: IdPool,
    statistics: IndexStatistics,
    score_boosts: HashMap<ObjectTypeId, ScoreBoostMetadata>,
}

impl<K: IndexKey> Default for IndexMetadata<K> {
    fn default() -> Self {
        IndexMetadata {
            documents: DocumentIdMap::new(),
            keys: HashedMap::new(),
            id_pool: IdPool::new(),
            statistics: IndexStatistics::default(),
            score_boosts: HashMap::new(),
        }
    }
}

impl<K: IndexKey> IndexMetadata<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_object_type(&mut self, object_type_id: ObjectTypeId, options: ScoreBoostOptions) {
        self.score_boosts.insert(object_type_id, ScoreBoostMetadata::new(options));
    }

    /// Record a new document and allocate its id. The key must not be indexed.
    pub fn add(&mut self, document: NewDocument<K>) -> Result<DocumentId> {
        if self.keys.contains_key(&document.key) {
            return Err(Error::consistency(format!("Key {:?} is already indexed", document.key)));
        }

        let id = self.id_pool.allocate();
        self.statistics.add(&document.statistics);
        if let Some(type_id) = document.object_type_id {
            if let Some(boosts) = self.score_boosts.get_mut(&type_id) {
                boosts.add(document.freshness, document.magnitude);
            }
        }

        self.keys.insert(document.key.clone(), id);
        self.documents.insert(id, Arc::new(DocumentMetadata {
            id,
            key: document.key,
            object_type_id: document.object_type_id,
            statistics: document.statistics,
            freshness: document.freshness,
            magnitude: document.magnitude,
        }));

        Ok(id)
    }

    /// Forget a document and return its id to the pool.
    pub fn remove(&mut self, id: DocumentId) -> Result<Arc<DocumentMetadata<K>>> {
        let document = self.documents
            .remove(&id)
            .ok_or_else(|| Error::consistency(format!("Unknown document id {}", id.0)))?;

        self.keys.remove(&document.key);
        self.statistics.remove(&document.statistics);
        if let Some(type_id) = document.object_type_id {
            if let Some(boosts) = self.score_boosts.get_mut(&type_id) {
                boosts.remove(document.freshness, document.magnitude);
            }
        }
        self.id_pool.release(id);

        Ok(document)
    }

    pub fn get(&self, id: DocumentId) -> Result<&DocumentMetadata<K>> {
        self.documents
            .get(&id)
            .map(Arc::as_ref)
            .ok_or_else(|| Error::consistency(format!("Unknown document id {}", id.0)))
    }

    pub fn get_id(&self, key: &K) -> Result<DocumentId> {
        self.try_get_id(key)
            .ok_or_else(|| Error::consistency(format!("Unknown key {:?}", key)))
    }

    pub fn try_get_id(&self, key: &K) -> Option<DocumentId> {
        self.keys.get(key).copied()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.keys.contains_key(key)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn statistics(&self) -> &IndexStatistics {
        &self.statistics
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentMetadata<K>> {
        self.documents.values().map(Arc::as_ref)
    }

    /// Freshness/magnitude multiplier of a document, 1.0 when it has none.
    pub fn object_score_boost(&self, document: &DocumentMetadata<K>) -> f64 {
        document.object_type_id
            .and_then(|type_id| self.score_boosts.get(&type_id))
            .map_or(1.0, |boosts| boosts.calculate_boost(document.freshness, document.magnitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::types::FieldId;

    fn stats(count: u32) -> DocumentStatistics {
        DocumentStatistics::new(HashMap::from([(FieldId(0), count)]))
    }

    #[test]
    fn test_add_and_remove_keep_keys_and_statistics_in_step() {
        let mut metadata = IndexMetadata::<String>::new();
        let a = metadata.add(NewDocument::text("a".to_string(), stats(3))).unwrap();
        let b = metadata.add(NewDocument::text("b".to_string(), stats(5))).unwrap();

        assert_eq!(metadata.document_count(), 2);
        assert_eq!(metadata.get_id(&"b".to_string()).unwrap(), b);
        assert_eq!(metadata.statistics().field_token_count(FieldId(0)), 8);

        let removed = metadata.remove(a).unwrap();
        assert_eq!(removed.key, "a");
        assert!(!metadata.contains_key(&"a".to_string()));
        assert_eq!(metadata.statistics().field_token_count(FieldId(0)), 5);

        // Released id goes to the next document
        let c = metadata.add(NewDocument::text("c".to_string(), stats(1))).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_unknown_lookups_are_consistency_errors() {
        let mut metadata = IndexMetadata::<u32>::new();
        metadata.add(NewDocument::text(1, stats(1))).unwrap();

        assert_eq!(metadata.get(DocumentId(42)).unwrap_err().kind, ErrorKind::Consistency);
        assert_eq!(metadata.get_id(&2).unwrap_err().kind, ErrorKind::Consistency);
        assert_eq!(metadata.remove(DocumentId(42)).unwrap_err().kind, ErrorKind::Consistency);
        assert_eq!(
            metadata.add(NewDocument::text(1, stats(1))).unwrap_err().kind,
            ErrorKind::Consistency
        );
    }

    #[test]
    fn test_clone_shares_documents_until_written() {
        let mut metadata = IndexMetadata::<u32>::new();
        for key in 0..1000 {
            metadata.add(NewDocument::text(key, stats(2))).unwrap();
        }
        let published = metadata.clone();

        let added = metadata.add(NewDocument::text(1000, stats(4))).unwrap();
        let seventh = metadata.get_id(&7).unwrap();
        metadata.remove(seventh).unwrap();

        assert_eq!(published.document_count(), 1000);
        assert!(published.contains_key(&7));
        assert!(!published.contains_key(&1000));
        assert!(published.get(added).is_err());
        assert_eq!(published.statistics().field_token_count(FieldId(0)), 2000);
        assert_eq!(metadata.document_count(), 1000);
        assert_eq!(metadata.statistics().field_token_count(FieldId(0)), 2002);

        let id = metadata.get_id(&500).unwrap();
        assert!(Arc::ptr_eq(
            published.documents.get(&id).unwrap(),
            metadata.documents.get(&id).unwrap()
        ));
    }

    #[test]
    fn test_object_boost_uses_type_ranges() {
        let mut metadata = IndexMetadata::<u32>::new();
        let type_id = ObjectTypeId(0);
        metadata.register_object_type(type_id, ScoreBoostOptions {
            freshness_multiplier: 1.0,
            magnitude_multiplier: 2.0,
        });

        let mut ids = Vec::new();
        for (key, magnitude) in [(1, 0.0), (2, 100.0)] {
            ids.push(metadata.add(NewDocument {
                key,
                object_type_id: Some(type_id),
                statistics: stats(1),
                freshness: None,
                magnitude: Some(magnitude),
            }).unwrap());
        }
        let plain = metadata.add(NewDocument::text(3, stats(1))).unwrap();

        let boost = |id| metadata.object_score_boost(metadata.get(id).unwrap());
        assert_eq!(boost(ids[0]), 1.0);
        assert_eq!(boost(ids[1]), 2.0);
        assert_eq!(boost(plain), 1.0);
    }
}
