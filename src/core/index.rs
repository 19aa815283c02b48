use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use log::{debug, warn};
use parking_lot::RwLock;
use rayon::prelude::*;
use crate::analysis::extractor::{PlainTextExtractor, TextExtractor};
use crate::analysis::thesaurus::{NoThesaurus, Thesaurus};
use crate::analysis::token::TextFragment;
use crate::analysis::tokenizer::{IndexTokenizer, StandardTokenizer};
use crate::core::cancel::CancellationToken;
use crate::core::config::IndexConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::fields::FieldLookup;
use crate::core::object::{ObjectDefinition, ObjectRegistration, ObjectRegistry};
use crate::core::types::{IndexKey, ObjectTypeId};
use crate::index::metadata::IndexMetadata;
use crate::index::node::IndexNode;
use crate::index::pool::NavigatorPool;
use crate::index::snapshot::IndexSnapshot;
use crate::query::ast::QueryPart;
use crate::query::parser::QueryParser;
use crate::scoring::scorer::Bm25Scorer;
use crate::search::executor::QueryExecutor;
use crate::search::results::SearchResults;
use crate::writer::batch::PendingChange;
use crate::writer::document::{DocumentPreparer, PreparedDocument};
use crate::writer::write_lock::WriteLock;

struct WriterState<K: IndexKey> {
    batch: Option<PendingChange<K>>,  // Set between begin/commit_batch_change
}

/// In-memory full text index over documents identified by `K`.
///
/// Writes are serialized by an async write lock and build a new snapshot
/// off to the side; searches run against whichever snapshot was current
/// when they started and never wait for a writer.
pub struct FullTextIndex<K: IndexKey> {
    config: IndexConfig,
    current: RwLock<Arc<IndexSnapshot<K>>>,  // Only held long enough to clone the Arc
    writer: WriteLock<WriterState<K>>,
    objects: ObjectRegistry,
    thesaurus: Arc<dyn Thesaurus>,
    query_parser: QueryParser,
    scorer: Bm25Scorer,
}

impl<K: IndexKey> FullTextIndex<K> {
    pub fn builder() -> FullTextIndexBuilder<K> {
        FullTextIndexBuilder::new()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The snapshot searches currently run against.
    pub fn snapshot(&self) -> Arc<IndexSnapshot<K>> {
        self.current.read().clone()
    }

    pub fn count(&self) -> usize {
        self.snapshot().document_count()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.snapshot().metadata().contains_key(key)
    }

    /// Index `text` in the default field under `key`.
    pub async fn add_text(&self, key: K, text: &str) -> Result<()> {
        let document = {
            let snapshot = self.snapshot();
            self.preparer(&snapshot).prepare_text(key, text)
        };
        self.write_document(document).await
    }

    /// Index already extracted fragments in the default field under `key`.
    pub async fn add_fragments(&self, key: K, fragments: &[TextFragment]) -> Result<()> {
        let document = {
            let snapshot = self.snapshot();
            self.preparer(&snapshot).prepare_fragments(key, fragments)
        };
        self.write_document(document).await
    }

    /// Index an object through its registered [`ObjectDefinition`].
    pub async fn add_object<T: 'static>(&self, item: &T) -> Result<()> {
        self.add_object_cancellable(item, &CancellationToken::new()).await
    }

    pub async fn add_object_cancellable<T: 'static>(&self, item: &T, cancellation: &CancellationToken) -> Result<()> {
        let definition = self.objects.get::<T, K>()?;
        let document = {
            let snapshot = self.snapshot();
            let readout = log_cancelled(definition.read(item, cancellation))?;
            self.preparer(&snapshot).prepare_object(readout)
        };

        self.write(|change| {
            log_cancelled(cancellation.check())?;
            change.add(document, self.config.duplicate_key_behavior)
        })
        .await
    }

    /// Index many objects as one change. Objects are read and tokenized in
    /// parallel; nothing is published unless every object succeeds.
    pub async fn add_range<T: Sync + 'static>(&self, items: &[T]) -> Result<()> {
        self.add_range_cancellable(items, &CancellationToken::new()).await
    }

    pub async fn add_range_cancellable<T: Sync + 'static>(
        &self,
        items: &[T],
        cancellation: &CancellationToken,
    ) -> Result<()> {
        let definition = self.objects.get::<T, K>()?;
        let documents: Vec<PreparedDocument<K>> = {
            let snapshot = self.snapshot();
            let preparer = self.preparer(&snapshot);
            log_cancelled(
                items
                    .par_iter()
                    .map(|item| definition.read(item, cancellation).map(|readout| preparer.prepare_object(readout)))
                    .collect::<Result<Vec<_>>>(),
            )?
        };
        debug!("Prepared {} objects", documents.len());

        self.write(|change| {
            log_cancelled(cancellation.check())?;
            for document in documents {
                change.add(document, self.config.duplicate_key_behavior)?;
            }
            Ok(())
        })
        .await
    }

    /// Remove the document indexed under `key`, returning whether there was one.
    pub async fn remove(&self, key: &K) -> Result<bool> {
        self.write(|change| change.remove(key)).await
    }

    /// Start collecting writes into one change. Until
    /// [`commit_batch_change`](Self::commit_batch_change), searches keep
    /// seeing the index as it was.
    pub async fn begin_batch_change(&self) -> Result<()> {
        let mut state = self.writer.acquire().await?;
        if state.batch.is_some() {
            return Err(Error::consistency("A batch change is already in progress"));
        }

        state.batch = Some(PendingChange::new(&self.snapshot(), self.config.intra_node_text_support_from_depth));
        debug!("Batch change started");
        Ok(())
    }

    pub async fn commit_batch_change(&self) -> Result<()> {
        let mut state = self.writer.acquire().await?;
        let batch = state.batch
            .take()
            .ok_or_else(|| Error::consistency("No batch change is in progress"))?;

        self.publish(batch);
        Ok(())
    }

    pub fn parse_query(&self, query: &str) -> Result<QueryPart> {
        self.query_parser.parse(query)
    }

    pub fn search(&self, query: &str) -> Result<SearchResults<K>> {
        let query = self.parse_query(query)?;
        self.search_query(&query)
    }

    pub fn search_query(&self, query: &QueryPart) -> Result<SearchResults<K>> {
        let started = Instant::now();
        let snapshot = self.snapshot();
        let result = QueryExecutor::new(&snapshot, &self.scorer).execute(query)?;

        SearchResults::from_intermediate(result, &snapshot, started.elapsed().as_millis() as u64)
    }

    fn preparer<'a>(&'a self, snapshot: &'a IndexSnapshot<K>) -> DocumentPreparer<'a> {
        DocumentPreparer::new(snapshot.fields(), self.thesaurus.as_ref(), &self.config.dynamic_field_prefix)
    }

    async fn write_document(&self, document: PreparedDocument<K>) -> Result<()> {
        self.write(|change| change.add(document, self.config.duplicate_key_behavior)).await
    }

    /// Run `operation` under the write lock. Inside a batch the operation is
    /// staged; otherwise it is published as a snapshot of its own.
    async fn write<R, F>(&self, operation: F) -> Result<R>
    where
        F: FnOnce(&mut PendingChange<K>) -> Result<R>,
    {
        let mut state = self.writer.acquire().await?;
        if let Some(batch) = state.batch.as_mut() {
            return operation(batch);
        }

        let mut change = PendingChange::new(&self.snapshot(), self.config.intra_node_text_support_from_depth);
        let result = operation(&mut change)?;
        if change.operations() > 0 {
            self.publish(change);
        }
        Ok(result)
    }

    fn publish(&self, change: PendingChange<K>) {
        let operations = change.operations();
        let snapshot = Arc::new(change.commit());
        debug!(
            "Publishing snapshot: {} documents after {} operations",
            snapshot.document_count(),
            operations
        );
        *self.current.write() = snapshot;
    }
}

fn log_cancelled<T>(result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        if err.kind == ErrorKind::Cancelled {
            warn!("Write cancelled before it was applied");
        }
    }
    result
}

/// Builder for [`FullTextIndex`]
pub struct FullTextIndexBuilder<K: IndexKey> {
    config: IndexConfig,
    tokenizer: Arc<dyn IndexTokenizer>,
    text_extractor: Arc<dyn TextExtractor>,
    thesaurus: Arc<dyn Thesaurus>,
    objects: Vec<Box<dyn ObjectRegistration>>,
    _key: PhantomData<fn() -> K>,
}

impl<K: IndexKey> Default for FullTextIndexBuilder<K> {
    fn default() -> Self {
        FullTextIndexBuilder {
            config: IndexConfig::default(),
            tokenizer: Arc::new(StandardTokenizer::default()),
            text_extractor: Arc::new(PlainTextExtractor),
            thesaurus: Arc::new(NoThesaurus),
            objects: Vec::new(),
            _key: PhantomData,
        }
    }
}

impl<K: IndexKey> FullTextIndexBuilder<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    /// Tokenizer for the default field and any field without its own.
    pub fn with_default_tokenizer(mut self, tokenizer: impl IndexTokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    pub fn with_text_extractor(mut self, text_extractor: impl TextExtractor + 'static) -> Self {
        self.text_extractor = Arc::new(text_extractor);
        self
    }

    pub fn with_thesaurus(mut self, thesaurus: impl Thesaurus + 'static) -> Self {
        self.thesaurus = Arc::new(thesaurus);
        self
    }

    pub fn with_object_definition<T>(mut self, definition: ObjectDefinition<T, K>) -> Self
    where
        T: 'static,
    {
        self.objects.push(Box::new(definition));
        self
    }

    pub fn build(self) -> Result<FullTextIndex<K>> {
        let config = self.config;
        let mut fields = FieldLookup::new(self.tokenizer, self.text_extractor);
        let mut metadata = IndexMetadata::new();
        let mut objects = ObjectRegistry::default();

        for (index, registration) in self.objects.into_iter().enumerate() {
            let type_id = registration.item_type();
            if objects.contains(type_id) {
                return Err(Error::configuration(format!(
                    "Object type {} is registered more than once",
                    registration.item_type_name()
                )));
            }

            let object_type_id = u8::try_from(index)
                .map(ObjectTypeId)
                .map_err(|_| Error::configuration("Too many object types"))?;
            let (definition, options) = registration.register(object_type_id, &mut fields)?;
            metadata.register_object_type(object_type_id, options);
            objects.insert(type_id, definition);
        }

        debug!("Built index with {} fields", fields.len());
        let snapshot = IndexSnapshot::new(
            Arc::new(IndexNode::empty()),
            Arc::new(metadata),
            Arc::new(fields),
            Arc::new(NavigatorPool::new(config.navigator_pool_capacity)),
        );

        Ok(FullTextIndex {
            current: RwLock::new(Arc::new(snapshot)),
            writer: WriteLock::new(WriterState { batch: None }, config.write_lock_timeout),
            objects,
            thesaurus: self.thesaurus,
            query_parser: QueryParser::new(&config),
            scorer: Bm25Scorer::new(config.bm25_k1, config.bm25_b),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_keeps_one_entry_per_key() {
        let index = FullTextIndex::<u32>::builder().build().unwrap();
        index.add_text(1, "first version").await.unwrap();
        index.add_text(1, "second version").await.unwrap();

        assert_eq!(index.count(), 1);
        assert!(index.search("first").unwrap().is_empty());
        assert_eq!(index.search("second").unwrap().keys().collect::<Vec<_>>(), vec![&1]);
    }

    #[tokio::test]
    async fn test_throw_on_duplicate_key() {
        let config = IndexConfig {
            duplicate_key_behavior: crate::core::config::DuplicateKeyBehavior::Throw,
            ..IndexConfig::default()
        };
        let index = FullTextIndex::<u32>::builder().with_config(config).build().unwrap();
        index.add_text(1, "text").await.unwrap();

        let err = index.add_text(1, "text").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Consistency);
        assert_eq!(index.count(), 1);
    }

    #[tokio::test]
    async fn test_snapshots_are_unaffected_by_later_writes() {
        let index = FullTextIndex::<u32>::builder().build().unwrap();
        index.add_text(1, "alpha").await.unwrap();
        let before = index.snapshot();

        index.add_text(2, "alpha").await.unwrap();
        assert!(index.remove(&1).await.unwrap());
        assert!(!index.remove(&1).await.unwrap());

        assert_eq!(before.document_count(), 1);
        assert!(before.metadata().contains_key(&1));
        assert_eq!(index.count(), 1);
        assert!(index.contains_key(&2));
    }

    #[tokio::test]
    async fn test_unregistered_object_type() {
        let index = FullTextIndex::<u32>::builder().build().unwrap();
        let err = index.add_object(&"not registered".to_string()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
