use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::core::types::FieldId;

/// Token counts of one indexed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatistics {
    pub token_count_by_field: HashMap<FieldId, u32>,
    pub total_token_count: u32,
}

impl DocumentStatistics {
    pub fn new(token_count_by_field: HashMap<FieldId, u32>) -> Self {
        let total_token_count = token_count_by_field.values().sum();
        DocumentStatistics { token_count_by_field, total_token_count }
    }

    pub fn field_token_count(&self, field_id: FieldId) -> u32 {
        self.token_count_by_field.get(&field_id).copied().unwrap_or(0)
    }
}

/// Corpus-wide token counts, adjusted on every add and remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub token_count_by_field: HashMap<FieldId, u64>,
    pub total_token_count: u64,
}

impl IndexStatistics {
    pub fn add(&mut self, document: &DocumentStatistics) {
        for (field_id, count) in &document.token_count_by_field {
            *self.token_count_by_field.entry(*field_id).or_insert(0) += *count as u64;
        }
        self.total_token_count += document.total_token_count as u64;
    }

    pub fn remove(&mut self, document: &DocumentStatistics) {
        for (field_id, count) in &document.token_count_by_field {
            if let Some(total) = self.token_count_by_field.get_mut(field_id) {
                debug_assert!(*total >= *count as u64);
                *total = total.saturating_sub(*count as u64);
                if *total == 0 {
                    self.token_count_by_field.remove(field_id);
                }
            }
        }
        self.total_token_count = self.total_token_count.saturating_sub(document.total_token_count as u64);
    }

    pub fn field_token_count(&self, field_id: FieldId) -> u64 {
        self.token_count_by_field.get(&field_id).copied().unwrap_or(0)
    }

    /// Average token count of the field across `document_count` documents.
    pub fn average_field_length(&self, field_id: FieldId, document_count: usize) -> f64 {
        if document_count == 0 {
            return 0.0;
        }
        self.field_token_count(field_id) as f64 / document_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_are_symmetric() {
        let doc_a = DocumentStatistics::new(HashMap::from([(FieldId(0), 3), (FieldId(1), 5)]));
        let doc_b = DocumentStatistics::new(HashMap::from([(FieldId(0), 7)]));
        let mut stats = IndexStatistics::default();

        stats.add(&doc_a);
        stats.add(&doc_b);
        assert_eq!(stats.field_token_count(FieldId(0)), 10);
        assert_eq!(stats.total_token_count, 15);
        assert_eq!(stats.average_field_length(FieldId(0), 2), 5.0);

        stats.remove(&doc_a);
        assert_eq!(stats.field_token_count(FieldId(1)), 0);
        assert_eq!(stats.total_token_count, 7);
        assert!(!stats.token_count_by_field.contains_key(&FieldId(1)));
    }
}
