use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use crate::analysis::extractor::TextExtractor;
use crate::analysis::tokenizer::IndexTokenizer;
use crate::core::error::{Error, Result};
use crate::core::types::FieldId;

/// Name of the field that text added without an object definition goes into
pub const DEFAULT_FIELD_NAME: &str = "_text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Default,
    Static,
    Dynamic,  // Registered on first sight while indexing
}

/// Everything the index needs to know about one field.
#[derive(Clone)]
pub struct FieldInfo {
    pub id: FieldId,
    pub name: String,
    pub kind: FieldKind,
    pub tokenizer: Arc<dyn IndexTokenizer>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub score_boost: f64,
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("tokenizer", &self.tokenizer.name())
            .field("text_extractor", &self.text_extractor.name())
            .field("score_boost", &self.score_boost)
            .finish()
    }
}

/// Field name <-> id registry. Field ids are a single byte wide.
#[derive(Debug, Clone)]
pub struct FieldLookup {
    fields: Vec<FieldInfo>,  // Indexed by field id
    by_name: HashMap<String, FieldId>,
}

impl FieldLookup {
    /// Including the default `_text` field.
    pub const MAX_FIELDS: usize = u8::MAX as usize;

    pub fn new(tokenizer: Arc<dyn IndexTokenizer>, text_extractor: Arc<dyn TextExtractor>) -> Self {
        let default = FieldInfo {
            id: FieldId::DEFAULT,
            name: DEFAULT_FIELD_NAME.to_string(),
            kind: FieldKind::Default,
            tokenizer,
            text_extractor,
            score_boost: 1.0,
        };

        FieldLookup {
            by_name: HashMap::from([(default.name.clone(), default.id)]),
            fields: vec![default],
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        kind: FieldKind,
        tokenizer: Arc<dyn IndexTokenizer>,
        text_extractor: Arc<dyn TextExtractor>,
        score_boost: f64,
    ) -> Result<FieldId> {
        if self.by_name.contains_key(name) {
            return Err(Error::configuration(format!("Duplicate field name '{}'", name)));
        }
        if self.fields.len() >= Self::MAX_FIELDS {
            return Err(Error::configuration(format!(
                "Cannot register field '{}': at most {} fields are supported",
                name, Self::MAX_FIELDS
            )));
        }

        let id = FieldId(self.fields.len() as u8);
        self.fields.push(FieldInfo {
            id,
            name: name.to_string(),
            kind,
            tokenizer,
            text_extractor,
            score_boost,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolve a dynamic field, registering it the first time it is seen.
    pub fn get_or_register_dynamic(
        &mut self,
        name: &str,
        tokenizer: Arc<dyn IndexTokenizer>,
        text_extractor: Arc<dyn TextExtractor>,
        score_boost: f64,
    ) -> Result<FieldId> {
        match self.get_by_name(name) {
            Some(field) if field.kind == FieldKind::Dynamic => Ok(field.id),
            Some(_) => Err(Error::configuration(format!(
                "Dynamic field '{}' clashes with a statically configured field",
                name
            ))),
            None => self.register(name, FieldKind::Dynamic, tokenizer, text_extractor, score_boost),
        }
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldInfo> {
        self.fields.get(id.0 as usize)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn default_field(&self) -> &FieldInfo {
        &self.fields[0]
    }

    pub fn score_boost(&self, id: FieldId) -> f64 {
        self.get(id).map_or(1.0, |f| f.score_boost)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extractor::PlainTextExtractor;
    use crate::analysis::tokenizer::StandardTokenizer;
    use crate::core::error::ErrorKind;

    fn lookup() -> FieldLookup {
        FieldLookup::new(Arc::new(StandardTokenizer::default()), Arc::new(PlainTextExtractor))
    }

    fn register(lookup: &mut FieldLookup, name: &str) -> Result<FieldId> {
        lookup.register(
            name,
            FieldKind::Static,
            Arc::new(StandardTokenizer::default()),
            Arc::new(PlainTextExtractor),
            1.0,
        )
    }

    #[test]
    fn test_duplicate_field_is_a_configuration_error() {
        let mut fields = lookup();
        assert_eq!(register(&mut fields, "title").unwrap(), FieldId(1));
        assert_eq!(register(&mut fields, "title").unwrap_err().kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_field_id_width_is_enforced() {
        let mut fields = lookup();
        for i in 1..FieldLookup::MAX_FIELDS {
            register(&mut fields, &format!("f{}", i)).unwrap();
        }
        let err = register(&mut fields, "one_too_many").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(fields.len(), 255);
        assert_eq!(fields.get_by_name("f254").unwrap().id, FieldId(254));
    }

    #[test]
    fn test_dynamic_fields_register_once() {
        let mut fields = lookup();
        let tokenizer: Arc<dyn IndexTokenizer> = Arc::new(StandardTokenizer::default());
        let extractor: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);

        let first = fields.get_or_register_dynamic("tag", tokenizer.clone(), extractor.clone(), 1.0).unwrap();
        let second = fields.get_or_register_dynamic("tag", tokenizer.clone(), extractor.clone(), 1.0).unwrap();
        assert_eq!(first, second);

        let err = fields.get_or_register_dynamic(DEFAULT_FIELD_NAME, tokenizer, extractor, 1.0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
