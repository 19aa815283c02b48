use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::{TimeZone, Utc};
use triedex::analysis::thesaurus::SynonymThesaurus;
use triedex::analysis::tokenizer::StandardTokenizer;
use triedex::core::cancel::CancellationToken;
use triedex::core::config::{IndexConfig, JoinOperator};
use triedex::core::error::ErrorKind;
use triedex::core::fields::DEFAULT_FIELD_NAME;
use triedex::core::index::FullTextIndex;
use triedex::core::object::{FieldOptions, ObjectDefinition, ObjectDefinitionBuilder};
use triedex::search::intermediate::TokenMatchLocation;

#[derive(Debug, Clone)]
struct Article {
    id: u32,
    title: String,
    body: String,
    tags: Vec<(String, String)>,
    published: i64,  // Unix seconds
}

fn article(id: u32, title: &str, body: &str) -> Article {
    Article {
        id,
        title: title.to_string(),
        body: body.to_string(),
        tags: Vec::new(),
        published: 1_600_000_000,
    }
}

fn article_definition(freshness_multiplier: f64) -> ObjectDefinition<Article, u32> {
    ObjectDefinitionBuilder::new()
        .key(|a: &Article| a.id)
        .field_with_options("title", |a: &Article| Some(a.title.clone()), FieldOptions::default().with_score_boost(2.0))
        .field("body", |a: &Article| Some(a.body.clone()))
        .dynamic_fields(|a: &Article| a.tags.clone())
        .freshness(|a: &Article| Utc.timestamp_opt(a.published, 0).single().unwrap_or_default(), freshness_multiplier)
        .build()
        .unwrap()
}

fn article_index(config: IndexConfig) -> FullTextIndex<u32> {
    FullTextIndex::builder()
        .with_config(config)
        .with_object_definition(article_definition(1.0))
        .build()
        .unwrap()
}

fn sorted_keys(index: &FullTextIndex<u32>, query: &str) -> Vec<u32> {
    let mut keys: Vec<u32> = index.search(query).unwrap().keys().copied().collect();
    keys.sort();
    keys
}

async fn text_index(documents: &[(u32, &str)]) -> FullTextIndex<u32> {
    let index = FullTextIndex::builder().build().unwrap();
    for (key, text) in documents {
        index.add_text(*key, text).await.unwrap();
    }
    index
}

#[tokio::test]
async fn test_boolean_and_preceding_queries() {
    let index = text_index(&[(1, "the quick fox"), (2, "the slow fox")]).await;

    assert_eq!(sorted_keys(&index, "fox"), vec![1, 2]);
    assert_eq!(sorted_keys(&index, "quick & fox"), vec![1]);
    assert_eq!(sorted_keys(&index, "quick > fox"), vec![1]);

    index.add_text(2, "fox is quick").await.unwrap();
    assert_eq!(sorted_keys(&index, "quick > fox"), vec![1]);
    assert_eq!(sorted_keys(&index, "quick & fox"), vec![1, 2]);
}

#[tokio::test]
async fn test_except_applies_left_to_right() {
    let index = text_index(&[(1, "a c"), (2, "a b c"), (3, "a b"), (4, "a")]).await;

    assert_eq!(sorted_keys(&index, "a &! b & c"), vec![1]);
    assert_eq!(sorted_keys(&index, "a &! b &! c"), vec![1, 4]);
    assert_eq!(sorted_keys(&index, "a &! (b & c)"), vec![1, 3, 4]);
    assert_eq!(sorted_keys(&index, "... &! b"), Vec::<u32>::new());
}

#[tokio::test]
async fn test_near_tolerance_is_tokens_in_between() {
    let index = text_index(&[(1, "a x b"), (2, "a b")]).await;

    assert_eq!(sorted_keys(&index, "a ~1 b"), vec![2]);
    assert_eq!(sorted_keys(&index, "a ~ b"), vec![1, 2]);
    assert_eq!(sorted_keys(&index, "b ~> a"), Vec::<u32>::new());
}

#[tokio::test]
async fn test_default_join_operator() {
    let documents = [(1, "red apple"), (2, "green apple"), (3, "red car")];
    let and_index = text_index(&documents).await;
    assert_eq!(sorted_keys(&and_index, "red apple"), vec![1]);

    let config = IndexConfig { default_join_operator: JoinOperator::Or, ..IndexConfig::default() };
    let or_index = FullTextIndex::builder().with_config(config).build().unwrap();
    for (key, text) in documents {
        or_index.add_text(key, text).await.unwrap();
    }
    assert_eq!(sorted_keys(&or_index, "red apple"), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_fuzzy_wildcard_and_phrases() {
    let index = text_index(&[
        (1, "Searching the archive"),
        (2, "seaside holiday"),
        (3, "archived research notes"),
    ]).await;

    assert_eq!(sorted_keys(&index, "?serching"), vec![1]);
    assert_eq!(sorted_keys(&index, "?1?searhcing"), vec![1]);
    assert_eq!(sorted_keys(&index, "archive*"), vec![1, 3]);
    assert_eq!(sorted_keys(&index, "sea%ide"), vec![2]);
    assert_eq!(sorted_keys(&index, "\"research notes\""), vec![3]);
    assert_eq!(sorted_keys(&index, "\"notes research\""), Vec::<u32>::new());
}

#[tokio::test]
async fn test_query_errors_are_typed() {
    let index = text_index(&[(1, "text")]).await;

    assert_eq!(index.search("(unclosed").unwrap_err().kind, ErrorKind::QueryParse);
    assert_eq!(index.search("& text").unwrap_err().kind, ErrorKind::QueryParse);
    assert_eq!(index.search("nofield=text").unwrap_err().kind, ErrorKind::QueryParse);
}

#[tokio::test]
async fn test_score_boost_and_ranking() {
    let index = text_index(&[(1, "apple pie"), (2, "apple"), (3, "pie crust")]).await;
    let ranked = |query: &str| index.search(query).unwrap().keys().copied().collect::<Vec<u32>>();

    assert_eq!(ranked("apple | pie"), vec![1, 2, 3]);
    assert_eq!(ranked("apple | pie^4"), vec![1, 3, 2]);

    let results = index.search("apple | pie").unwrap();
    assert_eq!(results.total_hits, 3);
    assert_eq!(results.max_score, results.hits[0].score);
    assert!(results.hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_batch_changes_are_invisible_until_commit() {
    let index = text_index(&[(1, "existing")]).await;

    index.begin_batch_change().await.unwrap();
    assert_eq!(index.begin_batch_change().await.unwrap_err().kind, ErrorKind::Consistency);

    index.add_text(2, "staged words").await.unwrap();
    assert!(index.remove(&1).await.unwrap());
    assert_eq!(index.count(), 1);
    assert!(index.search("staged").unwrap().is_empty());
    assert_eq!(sorted_keys(&index, "existing"), vec![1]);

    index.commit_batch_change().await.unwrap();
    assert_eq!(sorted_keys(&index, "staged"), vec![2]);
    assert!(index.search("existing").unwrap().is_empty());
    assert_eq!(index.commit_batch_change().await.unwrap_err().kind, ErrorKind::Consistency);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_are_serialized() {
    let index = Arc::new(FullTextIndex::<u32>::builder().build().unwrap());

    let mut handles = Vec::new();
    for key in 0..32u32 {
        let index = index.clone();
        handles.push(tokio::spawn(async move {
            let text = format!("document number{} shared", key);
            index.add_text(key, &text).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(index.count(), 32);
    assert_eq!(index.search("shared").unwrap().len(), 32);
    assert_eq!(sorted_keys(&index, "number7"), vec![7]);
}

#[tokio::test]
async fn test_object_fields_and_field_filters() {
    let index = article_index(IndexConfig::default());
    index.add_object(&article(1, "Rust ownership", "Borrowing explained")).await.unwrap();
    index.add_object(&article(2, "Borrowing money", "Rust on old cars")).await.unwrap();

    assert_eq!(sorted_keys(&index, "rust"), vec![1, 2]);
    assert_eq!(sorted_keys(&index, "title=rust"), vec![1]);
    assert_eq!(sorted_keys(&index, "body=rust"), vec![2]);
    assert_eq!(sorted_keys(&index, "title=(rust | borrowing)"), vec![1, 2]);

    // Title matches carry the field's score boost
    let results = index.search("rust").unwrap();
    assert_eq!(results.hits[0].key, 1);
    assert_eq!(results.hits[0].field_matches[0].field_name, "title");
}

#[tokio::test]
async fn test_dynamic_fields_are_registered_on_first_sight() {
    let config = IndexConfig { dynamic_field_prefix: "tag_".to_string(), ..IndexConfig::default() };
    let index = article_index(config);

    let mut tagged = article(1, "Tagged", "body");
    tagged.tags = vec![("genre".to_string(), "science fiction".to_string())];
    index.add_object(&tagged).await.unwrap();

    assert!(index.snapshot().fields().get_by_name("tag_genre").is_some());
    assert_eq!(sorted_keys(&index, "tag_genre=fiction"), vec![1]);
    assert_eq!(sorted_keys(&index, "title=fiction"), Vec::<u32>::new());
}

#[tokio::test]
async fn test_add_range_indexes_everything_in_one_snapshot() {
    let index = article_index(IndexConfig::default());
    let articles: Vec<Article> = (0..200)
        .map(|id| article(id, &format!("Article {}", id), if id % 2 == 0 { "even" } else { "odd" }))
        .collect();

    index.add_range(&articles).await.unwrap();

    assert_eq!(index.count(), 200);
    assert_eq!(index.search("even").unwrap().len(), 100);
    assert_eq!(sorted_keys(&index, "title=article & 42"), vec![42]);
}

#[tokio::test]
async fn test_cancelled_add_changes_nothing_and_releases_the_lock() {
    let index = article_index(IndexConfig::default());
    let token = CancellationToken::new();
    token.cancel();

    let err = index
        .add_range_cancellable(&[article(1, "never", "indexed")], &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(index.count(), 0);

    let err = index.add_object_cancellable(&article(1, "never", "indexed"), &token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);

    index.add_object(&article(1, "later", "indexed")).await.unwrap();
    assert_eq!(index.count(), 1);
}

#[tokio::test]
async fn test_freshness_boost_favours_newer_objects() {
    let index = FullTextIndex::builder()
        .with_object_definition(article_definition(3.0))
        .build()
        .unwrap();

    let mut old = article(1, "release notes", "");
    old.published = 1_500_000_000;
    let mut new = article(2, "release notes", "");
    new.published = 1_700_000_000;
    index.add_range(&[old, new]).await.unwrap();

    let results = index.search("release").unwrap();
    assert_eq!(results.hits[0].key, 2);
    assert!((results.hits[0].score / results.hits[1].score - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_thesaurus_expands_indexed_words() {
    let tokenizer = StandardTokenizer::default();
    let index = FullTextIndex::<u32>::builder()
        .with_thesaurus(SynonymThesaurus::new().with_synonyms(&tokenizer, ["car", "automobile"]))
        .build()
        .unwrap();
    index.add_text(1, "a fast car").await.unwrap();

    assert_eq!(sorted_keys(&index, "automobile"), vec![1]);
    assert_eq!(sorted_keys(&index, "\"fast automobile\""), vec![1]);
}

#[tokio::test]
async fn test_short_lock_timeout_does_not_affect_uncontended_writes() {
    let config = IndexConfig { write_lock_timeout: Duration::from_millis(1), ..IndexConfig::default() };
    let index = FullTextIndex::<u32>::builder().with_config(config).build().unwrap();

    index.add_text(1, "quick").await.unwrap();
    assert_eq!(index.count(), 1);
}

#[tokio::test]
async fn test_match_phrases() {
    let texts = HashMap::from([
        (1u32, "The quick brown dog chased a fox"),
        (2u32, "A fox, quick as ever"),
    ]);
    let index = FullTextIndex::<u32>::builder().build().unwrap();
    for (key, text) in &texts {
        index.add_text(*key, text).await.unwrap();
    }

    let results = index.search("\"quick brown\" | fox").unwrap();
    let phrases = results
        .create_match_phrases(|keys| {
            keys.iter()
                .map(|key| (*key, HashMap::from([(DEFAULT_FIELD_NAME.to_string(), texts[key].to_string())])))
                .collect()
        })
        .unwrap();

    let first = phrases.iter().find(|p| p.key == 1).unwrap();
    let texts_found: Vec<&str> = first.fields[0].phrases.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts_found, vec!["quick brown", "fox"]);

    let near = index.search("quick ~5 fox").unwrap();
    let near_phrases = near
        .create_match_phrases(|keys| {
            keys.iter()
                .map(|key| (*key, HashMap::from([(DEFAULT_FIELD_NAME.to_string(), texts[key].to_string())])))
                .collect()
        })
        .unwrap();
    let first = near_phrases.iter().find(|p| p.key == 1).unwrap();
    let texts_found: Vec<&str> = first.fields[0].phrases.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts_found, vec!["quick", "fox"]);

    let json = serde_json::to_value(&results.hits[0]).unwrap();
    assert!(json["key"].is_u64());
    assert_eq!(json["field_matches"][0]["field_name"], "_text");
    assert!(json["field_matches"][0]["locations"].is_array());

    let missing = results.create_match_phrases(|_| HashMap::new()).unwrap_err();
    assert_eq!(missing.kind, ErrorKind::CallerContract);
}

#[tokio::test]
async fn test_composite_locations_are_reported() {
    let index = text_index(&[(1, "one two three")]).await;
    let results = index.search("one ~2 three").unwrap();

    let locations = &results.hits[0].field_matches[0].locations;
    assert_eq!(locations.len(), 1);
    assert!(matches!(&locations[0], TokenMatchLocation::Composite(parts) if parts.len() == 2));
}
