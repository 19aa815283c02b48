pub mod token;
pub mod tokenizer;
pub mod extractor;
pub mod thesaurus;
