use std::sync::Arc;
use crate::core::fields::FieldLookup;
use crate::core::types::IndexKey;
use crate::index::metadata::IndexMetadata;
use crate::index::node::IndexNode;
use crate::index::pool::{NavigatorPool, PooledNavigator};

/// Immutable view of the index at one point in time: a trie root with the
/// metadata and fields that were committed together with it.
pub struct IndexSnapshot<K: IndexKey> {
    root: Arc<IndexNode>,
    metadata: Arc<IndexMetadata<K>>,
    fields: Arc<FieldLookup>,
    navigators: Arc<NavigatorPool>,  // Shared by every snapshot of one index
}

impl<K: IndexKey> IndexSnapshot<K> {
    pub fn new(
        root: Arc<IndexNode>,
        metadata: Arc<IndexMetadata<K>>,
        fields: Arc<FieldLookup>,
        navigators: Arc<NavigatorPool>,
    ) -> Self {
        IndexSnapshot { root, metadata, fields, navigators }
    }

    pub fn root(&self) -> &Arc<IndexNode> {
        &self.root
    }

    pub fn metadata(&self) -> &IndexMetadata<K> {
        &self.metadata
    }

    pub fn fields(&self) -> &FieldLookup {
        &self.fields
    }

    /// A pooled navigator positioned at this snapshot's root.
    pub fn create_navigator(&self) -> PooledNavigator<'_> {
        self.navigators.take(&self.root)
    }

    pub(crate) fn metadata_arc(&self) -> &Arc<IndexMetadata<K>> {
        &self.metadata
    }

    pub(crate) fn fields_arc(&self) -> &Arc<FieldLookup> {
        &self.fields
    }

    pub(crate) fn navigator_pool(&self) -> &Arc<NavigatorPool> {
        &self.navigators
    }

    pub fn document_count(&self) -> usize {
        self.metadata.document_count()
    }
}
