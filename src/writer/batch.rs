use std::collections::HashMap;
use std::sync::Arc;
use log::{debug, trace};
use crate::core::config::DuplicateKeyBehavior;
use crate::core::error::{Error, Result};
use crate::core::fields::{FieldKind, FieldLookup};
use crate::core::stats::DocumentStatistics;
use crate::core::types::{FieldId, IndexKey};
use crate::index::metadata::{IndexMetadata, NewDocument};
use crate::index::mutation::IndexMutation;
use crate::index::pool::NavigatorPool;
use crate::index::snapshot::IndexSnapshot;
use crate::writer::document::{FieldTarget, PreparedDocument};

/// Writes staged against one snapshot: a trie mutation plus private copies
/// of the metadata and field lookup. Nothing is visible to readers until
/// [`PendingChange::commit`] builds the next snapshot.
pub struct PendingChange<K: IndexKey> {
    mutation: IndexMutation,
    metadata: IndexMetadata<K>,
    fields: Arc<FieldLookup>,
    navigators: Arc<NavigatorPool>,
    operations: usize,
}

impl<K: IndexKey> PendingChange<K> {
    pub fn new(snapshot: &IndexSnapshot<K>, intra_node_text_from_depth: usize) -> Self {
        PendingChange {
            mutation: IndexMutation::new(snapshot.root().clone(), intra_node_text_from_depth),
            metadata: snapshot.metadata().clone(),
            fields: snapshot.fields_arc().clone(),
            navigators: snapshot.navigator_pool().clone(),
            operations: 0,
        }
    }

    /// Fields as this change sees them, including dynamic fields it registered.
    pub fn fields(&self) -> &FieldLookup {
        &self.fields
    }

    pub fn operations(&self) -> usize {
        self.operations
    }

    pub fn is_mutated(&self) -> bool {
        self.mutation.is_mutated()
    }

    pub fn add(&mut self, document: PreparedDocument<K>, behavior: DuplicateKeyBehavior) -> Result<()> {
        // Resolve dynamic fields first so a failure leaves the document unindexed
        let mut field_ids = Vec::with_capacity(document.fields.len());
        for field in &document.fields {
            field_ids.push(self.resolve(&field.target)?);
        }

        if self.metadata.contains_key(&document.key) {
            match behavior {
                DuplicateKeyBehavior::Throw => {
                    return Err(Error::consistency(format!("Key {:?} is already indexed", document.key)));
                }
                DuplicateKeyBehavior::Replace => {
                    self.remove(&document.key)?;
                }
            }
        }

        let mut token_counts: HashMap<FieldId, u32> = HashMap::new();
        for (field, field_id) in document.fields.iter().zip(&field_ids) {
            *token_counts.entry(*field_id).or_insert(0) += field.token_count;
        }

        let id = self.metadata.add(NewDocument {
            key: document.key,
            object_type_id: document.object_type_id,
            statistics: DocumentStatistics::new(token_counts),
            freshness: document.freshness,
            magnitude: document.magnitude,
        })?;

        for (field, field_id) in document.fields.iter().zip(&field_ids) {
            for token in &field.tokens {
                self.mutation.index(id, *field_id, &token.value, &token.locations);
            }
        }

        trace!("Staged document {} with {} fields", id.0, field_ids.len());
        self.operations += 1;
        Ok(())
    }

    /// Remove the document indexed under `key`. Unknown keys are not an error.
    pub fn remove(&mut self, key: &K) -> Result<bool> {
        let Some(id) = self.metadata.try_get_id(key) else {
            return Ok(false);
        };

        self.metadata.remove(id)?;
        self.mutation.remove(id);
        self.operations += 1;
        Ok(true)
    }

    pub fn commit(self) -> IndexSnapshot<K> {
        debug!("Applying {} staged operations", self.operations);
        IndexSnapshot::new(
            self.mutation.apply(),
            Arc::new(self.metadata),
            self.fields,
            self.navigators,
        )
    }

    fn resolve(&mut self, target: &FieldTarget) -> Result<FieldId> {
        match target {
            FieldTarget::Static(id) => Ok(*id),
            FieldTarget::Dynamic(name) => {
                if let Some(field) = self.fields.get_by_name(name) {
                    if field.kind == FieldKind::Dynamic {
                        return Ok(field.id);
                    }
                }

                let fields = Arc::make_mut(&mut self.fields);
                let default = fields.default_field().clone();
                fields.get_or_register_dynamic(name, default.tokenizer, default.text_extractor, 1.0)
            }
        }
    }
}
