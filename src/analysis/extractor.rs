use crate::analysis::token::TextFragment;

/// Pulls indexable text fragments out of raw field text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<TextFragment>;

    fn name(&self) -> &str;
}

/// Indexes the text as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, text: &str) -> Vec<TextFragment> {
        vec![TextFragment::whole(text)]
    }

    fn name(&self) -> &str {
        "plain"
    }
}

/// Drops `<...>` tags and keeps the text between them at its original offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupTextExtractor;

impl TextExtractor for MarkupTextExtractor {
    fn extract(&self, text: &str) -> Vec<TextFragment> {
        let mut fragments = Vec::new();
        let mut current = String::new();
        let mut current_start = 0u32;
        let mut in_tag = false;

        for (offset, ch) in text.chars().enumerate() {
            let offset = offset as u32;
            match ch {
                '<' if !in_tag => {
                    if !current.is_empty() {
                        fragments.push(TextFragment::new(current_start, std::mem::take(&mut current)));
                    }
                    in_tag = true;
                }
                '>' if in_tag => {
                    in_tag = false;
                }
                _ if in_tag => {}
                _ => {
                    if current.is_empty() {
                        current_start = offset;
                    }
                    current.push(ch);
                }
            }
        }

        if !current.is_empty() && !in_tag {
            fragments.push(TextFragment::new(current_start, current));
        }

        fragments
    }

    fn name(&self) -> &str {
        "markup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_fragments_keep_offsets() {
        let fragments = MarkupTextExtractor.extract("<p>Hello <b>world</b></p>");

        assert_eq!(fragments, vec![
            TextFragment::new(3, "Hello "),
            TextFragment::new(12, "world"),
        ]);
    }

    #[test]
    fn test_unterminated_tag_is_dropped() {
        let fragments = MarkupTextExtractor.extract("text <broken");
        assert_eq!(fragments, vec![TextFragment::new(0, "text ")]);
    }
}
