use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::analysis::extractor::TextExtractor;
use crate::analysis::tokenizer::IndexTokenizer;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use crate::core::fields::{FieldKind, FieldLookup};
use crate::core::types::{FieldId, IndexKey, ObjectTypeId};
use crate::scoring::boost::ScoreBoostOptions;

type KeyReader<T, K> = Box<dyn Fn(&T) -> K + Send + Sync>;
type FieldReader<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;
type DynamicFieldReader<T> = Box<dyn Fn(&T) -> Vec<(String, String)> + Send + Sync>;
type FreshnessReader<T> = Box<dyn Fn(&T) -> DateTime<Utc> + Send + Sync>;
type MagnitudeReader<T> = Box<dyn Fn(&T) -> f64 + Send + Sync>;

/// Per-field overrides; anything left unset uses the index defaults.
#[derive(Clone)]
pub struct FieldOptions {
    pub tokenizer: Option<Arc<dyn IndexTokenizer>>,
    pub text_extractor: Option<Arc<dyn TextExtractor>>,
    pub score_boost: f64,
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions {
            tokenizer: None,
            text_extractor: None,
            score_boost: 1.0,
        }
    }
}

impl FieldOptions {
    pub fn with_tokenizer(mut self, tokenizer: impl IndexTokenizer + 'static) -> Self {
        self.tokenizer = Some(Arc::new(tokenizer));
        self
    }

    pub fn with_text_extractor(mut self, extractor: impl TextExtractor + 'static) -> Self {
        self.text_extractor = Some(Arc::new(extractor));
        self
    }

    pub fn with_score_boost(mut self, score_boost: f64) -> Self {
        self.score_boost = score_boost;
        self
    }
}

struct ObjectField<T> {
    name: String,
    field_id: FieldId,  // Assigned when the definition is registered
    reader: FieldReader<T>,
    options: FieldOptions,
}

/// How to index objects of type `T` under keys of type `K`.
pub struct ObjectDefinition<T, K> {
    object_type_id: ObjectTypeId,
    key_reader: KeyReader<T, K>,
    fields: Vec<ObjectField<T>>,
    dynamic_fields: Option<DynamicFieldReader<T>>,
    freshness: Option<(FreshnessReader<T>, f64)>,
    magnitude: Option<(MagnitudeReader<T>, f64)>,
}

impl<T, K> fmt::Debug for ObjectDefinition<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDefinition")
            .field("type", &type_name::<T>())
            .field("object_type_id", &self.object_type_id)
            .field("fields", &self.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>())
            .field("dynamic_fields", &self.dynamic_fields.is_some())
            .finish()
    }
}

/// Raw text read from one object, before tokenization.
#[derive(Debug, Clone)]
pub struct ObjectReadout<K> {
    pub key: K,
    pub object_type_id: ObjectTypeId,
    pub fields: Vec<(FieldId, String)>,
    pub dynamic_fields: Vec<(String, String)>,  // Unprefixed names
    pub freshness: Option<DateTime<Utc>>,
    pub magnitude: Option<f64>,
}

impl<T, K> ObjectDefinition<T, K> {
    pub fn object_type_id(&self) -> ObjectTypeId {
        self.object_type_id
    }

    pub fn read_key(&self, item: &T) -> K {
        (self.key_reader)(item)
    }

    pub fn score_boost_options(&self) -> ScoreBoostOptions {
        ScoreBoostOptions {
            freshness_multiplier: self.freshness.as_ref().map_or(1.0, |(_, m)| *m),
            magnitude_multiplier: self.magnitude.as_ref().map_or(1.0, |(_, m)| *m),
        }
    }

    /// Run every reader against `item`. Cancellation is checked between
    /// field reads.
    pub fn read(&self, item: &T, cancellation: &CancellationToken) -> Result<ObjectReadout<K>> {
        cancellation.check()?;
        let key = self.read_key(item);

        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            cancellation.check()?;
            if let Some(text) = (field.reader)(item) {
                fields.push((field.field_id, text));
            }
        }

        let dynamic_fields = match &self.dynamic_fields {
            Some(reader) => {
                cancellation.check()?;
                reader(item)
            }
            None => Vec::new(),
        };

        Ok(ObjectReadout {
            key,
            object_type_id: self.object_type_id,
            fields,
            dynamic_fields,
            freshness: self.freshness.as_ref().map(|(reader, _)| reader(item)),
            magnitude: self.magnitude.as_ref().map(|(reader, _)| reader(item)),
        })
    }
}

/// Builder for [`ObjectDefinition`]
pub struct ObjectDefinitionBuilder<T, K> {
    key_reader: Option<KeyReader<T, K>>,
    fields: Vec<ObjectField<T>>,
    dynamic_fields: Option<DynamicFieldReader<T>>,
    freshness: Option<(FreshnessReader<T>, f64)>,
    magnitude: Option<(MagnitudeReader<T>, f64)>,
}

impl<T, K> Default for ObjectDefinitionBuilder<T, K> {
    fn default() -> Self {
        ObjectDefinitionBuilder {
            key_reader: None,
            fields: Vec::new(),
            dynamic_fields: None,
            freshness: None,
            magnitude: None,
        }
    }
}

impl<T, K> ObjectDefinitionBuilder<T, K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key<F>(mut self, reader: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.key_reader = Some(Box::new(reader));
        self
    }

    pub fn field<F>(self, name: impl Into<String>, reader: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        self.field_with_options(name, reader, FieldOptions::default())
    }

    pub fn field_with_options<F>(mut self, name: impl Into<String>, reader: F, options: FieldOptions) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        self.fields.push(ObjectField {
            name: name.into(),
            field_id: FieldId::DEFAULT,
            reader: Box::new(reader),
            options,
        });
        self
    }

    /// Fields only known at index time, returned as (name, text) pairs.
    pub fn dynamic_fields<F>(mut self, reader: F) -> Self
    where
        F: Fn(&T) -> Vec<(String, String)> + Send + Sync + 'static,
    {
        self.dynamic_fields = Some(Box::new(reader));
        self
    }

    pub fn freshness<F>(mut self, reader: F, multiplier: f64) -> Self
    where
        F: Fn(&T) -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.freshness = Some((Box::new(reader), multiplier));
        self
    }

    pub fn magnitude<F>(mut self, reader: F, multiplier: f64) -> Self
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        self.magnitude = Some((Box::new(reader), multiplier));
        self
    }

    pub fn build(self) -> Result<ObjectDefinition<T, K>> {
        let key_reader = self.key_reader.ok_or_else(|| {
            Error::configuration(format!("No key reader configured for {}", type_name::<T>()))
        })?;
        if self.fields.is_empty() && self.dynamic_fields.is_none() {
            return Err(Error::configuration(format!("No fields configured for {}", type_name::<T>())));
        }

        Ok(ObjectDefinition {
            object_type_id: ObjectTypeId(0),
            key_reader,
            fields: self.fields,
            dynamic_fields: self.dynamic_fields,
            freshness: self.freshness,
            magnitude: self.magnitude,
        })
    }
}

/// Type-erased definition awaiting registration with an index.
pub(crate) trait ObjectRegistration: Send {
    fn item_type(&self) -> TypeId;

    fn item_type_name(&self) -> &'static str;

    /// Register the definition's fields and hand back the shareable definition.
    fn register(
        self: Box<Self>,
        object_type_id: ObjectTypeId,
        fields: &mut FieldLookup,
    ) -> Result<(Arc<dyn Any + Send + Sync>, ScoreBoostOptions)>;
}

impl<T, K> ObjectRegistration for ObjectDefinition<T, K>
where
    T: 'static,
    K: IndexKey,
{
    fn item_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn item_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn register(
        mut self: Box<Self>,
        object_type_id: ObjectTypeId,
        fields: &mut FieldLookup,
    ) -> Result<(Arc<dyn Any + Send + Sync>, ScoreBoostOptions)> {
        self.object_type_id = object_type_id;
        let default = fields.default_field().clone();

        for field in &mut self.fields {
            field.field_id = fields.register(
                &field.name,
                FieldKind::Static,
                field.options.tokenizer.clone().unwrap_or_else(|| default.tokenizer.clone()),
                field.options.text_extractor.clone().unwrap_or_else(|| default.text_extractor.clone()),
                field.options.score_boost,
            )?;
        }

        let options = self.score_boost_options();
        let definition: Box<dyn Any + Send + Sync> = self;
        Ok((Arc::from(definition), options))
    }
}

/// Object definitions of one index, looked up by Rust type.
#[derive(Default)]
pub(crate) struct ObjectRegistry {
    definitions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ObjectRegistry {
    pub fn insert(&mut self, type_id: TypeId, definition: Arc<dyn Any + Send + Sync>) {
        self.definitions.insert(type_id, definition);
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.definitions.contains_key(&type_id)
    }

    pub fn get<T: 'static, K: IndexKey>(&self) -> Result<&ObjectDefinition<T, K>> {
        self.definitions
            .get(&TypeId::of::<T>())
            .and_then(|definition| definition.downcast_ref::<ObjectDefinition<T, K>>())
            .ok_or_else(|| Error::configuration(format!("No object definition registered for {}", type_name::<T>())))
    }
}
