//! Rendering Tests
//!
//! Resource shape, sparse fieldsets, compound documents and the related
//! and relationship endpoints.

mod common;

use axum::http::StatusCode;
use common::{blog_api, body, data_ids, error_codes, included_keys, params};
use serde_json::json;

// =============================================================================
// Resource Shape
// =============================================================================

#[test]
fn test_detail_renders_attributes_and_relationship_links() {
    let api = blog_api();
    let response = api.detail("posts", "p1", &[], "/api/v1/posts/p1");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body(&response);
    let data = &body["data"];
    assert_eq!(data["type"], "posts");
    assert_eq!(data["id"], "p1");
    assert_eq!(data["attributes"]["title"], "Hello");
    assert_eq!(data["attributes"]["rating"], 5);
    assert_eq!(data["links"]["self"], "/api/v1/posts/p1");
    assert_eq!(body["links"]["self"], "/api/v1/posts/p1");

    // Relationships not requested for inclusion carry links only
    let author = &data["relationships"]["author"];
    assert_eq!(author["links"]["self"], "/api/v1/posts/p1/relationships/author");
    assert_eq!(author["links"]["related"], "/api/v1/posts/p1/author");
    assert!(author.get("data").is_none());
    assert!(body.get("included").is_none());
}

#[test]
fn test_omitted_and_synthetic_fields_are_hidden() {
    let api = blog_api();
    let body = body(&api.detail("posts", "p1", &[], "/api/v1/posts/p1"));

    let attributes = body["data"]["attributes"].as_object().unwrap();
    assert!(!attributes.contains_key("secret"));
    assert!(!attributes.contains_key("id"));
    assert!(!attributes.contains_key("author"));
}

#[test]
fn test_sparse_fieldset_limits_attributes_and_relationships() {
    let api = blog_api();
    let query = params(&[("fields[posts]", "title,author")]);
    let body = body(&api.detail("posts", "p1", &query, "/api/v1/posts/p1"));

    let data = &body["data"];
    let attributes: Vec<&String> = data["attributes"].as_object().unwrap().keys().collect();
    let relationships: Vec<&String> = data["relationships"].as_object().unwrap().keys().collect();
    assert_eq!(attributes, vec!["title"]);
    assert_eq!(relationships, vec!["author"]);
}

#[test]
fn test_missing_entry_and_unknown_type() {
    let api = blog_api();

    let missing = api.detail("posts", "p9", &[], "/api/v1/posts/p9");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_codes(&body(&missing)), vec!["resource.found"]);

    // Models without a declared type are not exposed
    let hidden = api.detail("Draft", "d1", &[], "/api/v1/Draft/d1");
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_codes(&body(&hidden)), vec!["resource.invalid"]);
}

// =============================================================================
// Compound Documents
// =============================================================================

#[test]
fn test_included_resources_are_unique() {
    let api = blog_api();
    let query = params(&[("include", "author,tags")]);
    let body = body(&api.index("posts", &query, "/api/v1/posts?include=author,tags"));

    let mut keys = included_keys(&body);
    keys.sort();
    assert_eq!(keys, vec!["tags:t1", "tags:t2", "users:u1", "users:u2"]);

    let p1 = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|resource| resource["id"] == "p1")
        .unwrap();
    assert_eq!(p1["relationships"]["author"]["data"], json!({"type": "users", "id": "u1"}));
    assert_eq!(
        p1["relationships"]["tags"]["data"],
        json!([{"type": "tags", "id": "t1"}, {"type": "tags", "id": "t2"}])
    );
}

#[test]
fn test_empty_relations_render_as_null_and_empty_list() {
    let api = blog_api();
    let query = params(&[("include", "tags,author")]);
    let body = body(&api.detail("posts", "p3", &query, "/api/v1/posts/p3"));
    assert_eq!(body["data"]["relationships"]["tags"]["data"], json!([]));

    api.save_relationship(
        "posts",
        "p3",
        "author",
        jsonapi_orm::RelationshipVerb::Replace,
        &json!({"data": null}),
    );
    let body = common::body(&api.detail("posts", "p3", &query, "/api/v1/posts/p3"));
    assert_eq!(body["data"]["relationships"]["author"]["data"], json!(null));
}

#[test]
fn test_cyclic_include_terminates() {
    let api = blog_api();
    let query = params(&[("include", "author.posts.author")]);
    let response = api.detail("posts", "p1", &query, "/api/v1/posts/p1");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body(&response);
    let keys = included_keys(&body);
    let mut unique = keys.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(keys.len(), unique.len());

    // The primary resource is never repeated in included
    assert!(!keys.contains(&"posts:p1".to_string()));
    assert_eq!(unique, vec!["posts:p2", "users:u1"]);
}

#[test]
fn test_primary_resources_are_not_included() {
    let api = blog_api();
    let query = params(&[("include", "author.posts")]);
    let body = body(&api.index("posts", &query, "/api/v1/posts"));

    let mut keys = included_keys(&body);
    keys.sort();
    assert_eq!(keys, vec!["users:u1", "users:u2"]);
}

#[test]
fn test_unexposed_relation_target_renders_links_only() {
    let api = blog_api();
    let query = params(&[("include", "draft")]);
    let body = body(&api.detail("posts", "p1", &query, "/api/v1/posts/p1"));

    assert!(body["data"]["relationships"]["draft"].get("data").is_none());
    assert!(body.get("included").is_none());
}

// =============================================================================
// Related And Relationship Endpoints
// =============================================================================

#[test]
fn test_related_renders_targets_as_primary_data() {
    let api = blog_api();

    let author = body(&api.related("posts", "p1", "author", &[], "/api/v1/posts/p1/author"));
    assert_eq!(author["data"]["type"], "users");
    assert_eq!(author["data"]["attributes"]["name"], "Ada");

    let tags = body(&api.related("posts", "p1", "tags", &[], "/api/v1/posts/p1/tags"));
    assert_eq!(data_ids(&tags), vec!["t1", "t2"]);
    assert_eq!(tags["links"]["self"], "/api/v1/posts/p1/tags");
}

#[test]
fn test_relationship_renders_linkage_only() {
    let api = blog_api();
    let url = "/api/v1/posts/p1/relationships/tags";
    let body = body(&api.relationship("posts", "p1", "tags", url));

    assert_eq!(body["data"], json!([{"type": "tags", "id": "t1"}, {"type": "tags", "id": "t2"}]));
    assert_eq!(body["links"]["self"], url);
    assert_eq!(body["links"]["related"], "/api/v1/posts/p1/tags");
}

#[test]
fn test_relationship_to_one_and_unknown_names() {
    let api = blog_api();

    let author = body(&api.relationship("posts", "p1", "author", "/x"));
    assert_eq!(author["data"], json!({"type": "users", "id": "u1"}));

    let unknown = api.relationship("posts", "p1", "editor", "/x");
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_codes(&body(&unknown)), vec!["input.relationship"]);

    let unexposed = api.relationship("posts", "p1", "draft", "/x");
    assert_eq!(error_codes(&body(&unexposed)), vec!["input.relationship"]);
}

#[test]
fn test_unknown_relationship_reads_carry_no_source() {
    let api = blog_api();

    let related = api.related("posts", "p1", "editor", &[], "/api/v1/posts/p1/editor");
    let linkage = api.relationship("posts", "p1", "editor", "/api/v1/posts/p1/relationships/editor");

    for response in [related, linkage] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body(&response);
        assert_eq!(error_codes(&body), vec!["input.relationship"]);
        assert!(body["errors"][0].get("source").is_none());
    }
}
