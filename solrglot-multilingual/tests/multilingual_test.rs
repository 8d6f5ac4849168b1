//! Round trips through the multilingual layer: documents are indexed under
//! language-specific names, queried through the fan-out and mapped back.

use proptest::prelude::*;
use serde_json::{json, Value};
use solrglot::codec;
use solrglot::keys::{KeyGroup, ParseMode, SearchKeys};
use solrglot_multilingual::{
    Document, DocumentProjector, EngineResponse, LanguageFieldProjector, MultilingualConfig,
    MultilingualQueryRewriter, MultilingualResultRewriter, SearchQuery, SchemaPartsCache,
    StaticLanguageContext, StaticSchema,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn as_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("Expected object"),
    }
}

fn context() -> StaticLanguageContext {
    StaticLanguageContext::new("en", vec!["en".into(), "de".into()])
}

// ---------------------------------------------------------------------------
// Index → search → response
// ---------------------------------------------------------------------------

#[test]
fn test_indexed_document_comes_back_canonical() {
    let config = MultilingualConfig::default();
    let schema = SchemaPartsCache::new(StaticSchema::for_languages(&["en", "de"]));

    let mut docs = vec![as_document(json!({
        "id": "site-node-1",
        "ss_search_api_language": "en",
        "tm_title": ["Hello world"]
    }))];
    DocumentProjector::new(&config)
        .project_documents(&mut docs, &["tm_title".to_string()], &schema)
        .unwrap();
    assert!(docs[0].contains_key("tm_X3b_en_title"));

    // the engine returns the stored document plus a highlight
    let body = json!({
        "responseHeader": {"status": 0, "QTime": 1},
        "response": {"numFound": 1, "start": 0, "docs": docs},
        "highlighting": {"site-node-1": {"tm_X3b_en_title": ["<em>Hello</em> world"]}}
    })
    .to_string();

    let rewritten = MultilingualResultRewriter::new(&config)
        .rewrite_body(&body)
        .unwrap();
    let response: EngineResponse = serde_json::from_str(&rewritten).unwrap();

    let doc = &response.response.as_ref().unwrap().docs[0];
    assert_eq!(doc.get("tm_title"), Some(&json!(["Hello world"])));
    assert!(!doc.contains_key("tm_X3b_en_title"));
    assert_eq!(
        response.highlighting.unwrap()["site-node-1"].get("tm_title"),
        Some(&json!(["<em>Hello</em> world"]))
    );
    assert_eq!(response.extra["responseHeader"]["status"], json!(0));
}

#[test]
fn test_query_without_multilingual_fields_is_unchanged() {
    let rewriter = MultilingualQueryRewriter::new(MultilingualConfig::default(), context());
    let keys = SearchKeys::parsed(KeyGroup::terms(["foo", "bar"]));

    let query = SearchQuery::new(keys.clone())
        .with_mode(ParseMode::Terms)
        .with_fulltext_fields(["tm_title"])
        .with_query_fields(["ss_type", "is_count^2"]);
    let prepared = rewriter.rewrite_query(&query).unwrap();

    let canonical = solrglot::KeyFlattener::default()
        .flatten(
            &keys,
            &query.query_fields,
            ParseMode::Terms,
            &Default::default(),
        )
        .unwrap();
    assert!(!prepared.fanned_out);
    assert_eq!(prepared.query, Some(canonical));
    assert_eq!(prepared.query_fields, query.query_fields);
}

#[test]
fn test_edismax_fan_out() {
    let rewriter = MultilingualQueryRewriter::new(MultilingualConfig::default(), context());
    let query = SearchQuery::new(SearchKeys::parsed(KeyGroup::terms(["A", "B"])))
        .with_mode(ParseMode::Edismax)
        .with_fulltext_fields(["tm_title", "tm_body"])
        .with_query_fields(["tm_title^3", "tm_body"]);

    let prepared = rewriter.rewrite_query(&query).unwrap();
    assert_eq!(
        prepared.query.as_deref(),
        Some(
            "({!edismax qf='tm_X3b_en_title^3 tm_X3b_en_body^1'}+A +B) \
             ({!edismax qf='tm_X3b_de_title^3 tm_X3b_de_body^1'}+A +B)"
        )
    );
}

#[test]
fn test_facet_merge_through_body() {
    let body = r#"{"facet_counts":{"facet_fields":{"tm_cat":["x",2],"tm_X3b_en_cat":["x",3,"y",1]}}}"#;
    let rewritten = MultilingualResultRewriter::new(&MultilingualConfig::default())
        .rewrite_body(body)
        .unwrap();
    let value: Value = serde_json::from_str(&rewritten).unwrap();
    assert_eq!(
        value["facet_counts"]["facet_fields"],
        json!({"tm_cat": ["x", 5, "y", 1]})
    );
}

// ---------------------------------------------------------------------------
// Projection laws
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_resolve_inverts_project(
        raw in "[a-z]{1,4}_[a-zA-Z0-9_:/ .]{0,10}",
        language in "[a-z]{2}(-[a-z]{2})?",
    ) {
        let name = codec::encode(&raw);
        let projected = LanguageFieldProjector::project_field(&name, &language);
        prop_assert_ne!(&projected, &name);
        prop_assert!(codec::is_encoded_safe(&projected));

        let resolved = LanguageFieldProjector::resolve(&projected).unwrap();
        prop_assert_eq!(resolved.canonical, name.clone());
        prop_assert_eq!(resolved.language, language);
        prop_assert!(LanguageFieldProjector::resolve(&name).is_none());
    }

    #[test]
    fn prop_projection_is_injective_across_languages(
        raw in "[a-z]{1,4}_[a-z]{1,6}",
        a in "[a-z]{2,3}",
        b in "[a-z]{2,3}",
    ) {
        prop_assume!(a != b);
        let name = codec::encode(&raw);
        prop_assert_ne!(
            LanguageFieldProjector::project_field(&name, &a),
            LanguageFieldProjector::project_field(&name, &b)
        );
    }
}
