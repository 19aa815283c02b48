use std::collections::HashMap;
use chrono::{DateTime, Utc};
use crate::analysis::extractor::TextExtractor;
use crate::analysis::thesaurus::Thesaurus;
use crate::analysis::token::{TextFragment, TokenGroup};
use crate::analysis::tokenizer::IndexTokenizer;
use crate::core::fields::FieldLookup;
use crate::core::object::ObjectReadout;
use crate::core::types::{FieldId, ObjectTypeId};

/// Field a prepared token set belongs to. Dynamic fields are only resolved
/// to an id under the write lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    Static(FieldId),
    Dynamic(String),  // Prefixed name
}

#[derive(Debug, Clone)]
pub struct PreparedField {
    pub target: FieldTarget,
    pub token_count: u32,  // Before thesaurus expansion
    pub tokens: Vec<TokenGroup>,
}

/// A document tokenized and ready to be written into a mutation.
#[derive(Debug, Clone)]
pub struct PreparedDocument<K> {
    pub key: K,
    pub object_type_id: Option<ObjectTypeId>,
    pub freshness: Option<DateTime<Utc>>,
    pub magnitude: Option<f64>,
    pub fields: Vec<PreparedField>,
}

/// Turns raw text into token groups. Runs outside the write lock, against
/// the fields of the snapshot current at the time.
pub struct DocumentPreparer<'a> {
    fields: &'a FieldLookup,
    thesaurus: &'a dyn Thesaurus,
    dynamic_field_prefix: &'a str,
}

impl<'a> DocumentPreparer<'a> {
    pub fn new(fields: &'a FieldLookup, thesaurus: &'a dyn Thesaurus, dynamic_field_prefix: &'a str) -> Self {
        DocumentPreparer { fields, thesaurus, dynamic_field_prefix }
    }

    /// Plain text for the default field, run through its text extractor.
    pub fn prepare_text<K>(&self, key: K, text: &str) -> PreparedDocument<K> {
        let default = self.fields.default_field();
        let fragments = default.text_extractor.extract(text);
        self.prepare_fragments(key, &fragments)
    }

    /// Pre-extracted fragments for the default field.
    pub fn prepare_fragments<K>(&self, key: K, fragments: &[TextFragment]) -> PreparedDocument<K> {
        let default = self.fields.default_field();
        PreparedDocument {
            key,
            object_type_id: None,
            freshness: None,
            magnitude: None,
            fields: vec![self.prepare_field(FieldTarget::Static(default.id), default.tokenizer.as_ref(), fragments)],
        }
    }

    pub fn prepare_object<K>(&self, readout: ObjectReadout<K>) -> PreparedDocument<K> {
        let default = self.fields.default_field();
        let mut fields = Vec::with_capacity(readout.fields.len() + readout.dynamic_fields.len());

        for (field_id, text) in &readout.fields {
            let (tokenizer, extractor) = match self.fields.get(*field_id) {
                Some(info) => (info.tokenizer.as_ref(), info.text_extractor.as_ref()),
                None => (default.tokenizer.as_ref(), default.text_extractor.as_ref()),
            };
            let fragments = extractor.extract(text);
            fields.push(self.prepare_field(FieldTarget::Static(*field_id), tokenizer, &fragments));
        }

        for (name, text) in &readout.dynamic_fields {
            let name = format!("{}{}", self.dynamic_field_prefix, name);
            // Dynamic fields seen before keep their own settings
            let (tokenizer, extractor): (&dyn IndexTokenizer, &dyn TextExtractor) = match self.fields.get_by_name(&name) {
                Some(info) => (info.tokenizer.as_ref(), info.text_extractor.as_ref()),
                None => (default.tokenizer.as_ref(), default.text_extractor.as_ref()),
            };
            let fragments = extractor.extract(text);
            fields.push(self.prepare_field(FieldTarget::Dynamic(name), tokenizer, &fragments));
        }

        PreparedDocument {
            key: readout.key,
            object_type_id: Some(readout.object_type_id),
            freshness: readout.freshness,
            magnitude: readout.magnitude,
            fields,
        }
    }

    fn prepare_field(&self, target: FieldTarget, tokenizer: &dyn IndexTokenizer, fragments: &[TextFragment]) -> PreparedField {
        let groups = tokenizer.tokenize(fragments);
        let token_count = groups.iter().map(|g| g.locations.len() as u32).sum();
        PreparedField {
            target,
            token_count,
            tokens: self.expand(groups),
        }
    }

    /// Every synonym is indexed at the locations of the word it came from.
    fn expand(&self, groups: Vec<TokenGroup>) -> Vec<TokenGroup> {
        let mut expanded: Vec<TokenGroup> = Vec::with_capacity(groups.len());
        let mut lookup: HashMap<String, usize> = HashMap::new();

        for group in groups {
            for value in self.thesaurus.expand(&group.value) {
                match lookup.get(&value) {
                    Some(&idx) => {
                        let locations = &mut expanded[idx].locations;
                        locations.extend_from_slice(&group.locations);
                        locations.sort_unstable();
                        locations.dedup();
                    }
                    None => {
                        lookup.insert(value.clone(), expanded.len());
                        expanded.push(TokenGroup::new(value, group.locations.clone()));
                    }
                }
            }
        }

        expanded
    }
}
