//! Class-level verbs, persistence and dispatch behavior.

use std::sync::Arc;

use model::mock::MockTransport;
use model::{
    Dispatcher, JsonApiParser, KeyedCollectionParser, Method, Params, ResourceClassBuilder,
    ResourceError, ResponseShape, Schema,
};
use serde_json::{json, Value};

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

fn dispatcher(mock: &MockTransport) -> Arc<Dispatcher> {
    Arc::new(
        Dispatcher::builder("https://api.example.com/v1", Arc::new(mock.clone()))
            .header("Accept", "application/json")
            .build()
            .unwrap(),
    )
}

fn setup() -> (MockTransport, Arc<Schema>) {
    let mock = MockTransport::new();
    let schema = Schema::builder()
        .dispatcher(dispatcher(&mock))
        .resource(
            ResourceClassBuilder::new("User")
                .field("email", "EmailAddress")
                .custom(Method::Get, "popular")
                .custom(Method::Post, "invite")
                .header("X-Api-Version", "2"),
        )
        .resource(
            ResourceClassBuilder::new("Member")
                .collection_path("/organizations/:organization_id/members")
                .collection_parser(Arc::new(KeyedCollectionParser::new("members"))),
        )
        .resource(ResourceClassBuilder::new("Event").shape(ResponseShape::Array))
        .build()
        .unwrap();
    (mock, schema)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn find_maps_wire_fields_to_logical_names() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/users/1").respond_json(
        200,
        json!({"id": 1, "EmailAddress": "tobias@example.com", "metadata": {"etag": "x"}}),
    );

    let user = schema.model("User").unwrap().find(1).await.unwrap();

    assert_eq!(user.get("email"), Some(json!("tobias@example.com")));
    assert_eq!(user.get("EmailAddress"), None);
    assert_eq!(user.metadata(), json!({"etag": "x"}));
    assert!(!user.is_new());

    let request = mock.last_request().unwrap();
    assert_eq!(request.url, "https://api.example.com/v1/users/1");
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(request.header("x-api-version"), Some("2"));
}

#[tokio::test]
async fn find_encodes_spaces_in_identifiers_as_percent_20() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/users/a%20b")
        .respond_json(200, json!({"id": "a b"}));
    mock.expect(Method::Get, "/users/a+b")
        .respond_json(200, json!({"id": "a+b"}));
    let users = schema.model("User").unwrap();

    let spaced = users.find("a b").await.unwrap();
    assert_eq!(spaced.id(), Some(json!("a b")));
    assert_eq!(mock.last_request().unwrap().path, "/users/a%20b");

    let plus = users.find("a+b").await.unwrap();
    assert_eq!(plus.id(), Some(json!("a+b")));
    assert_eq!(mock.last_request().unwrap().path, "/users/a+b");
}

#[tokio::test]
async fn find_with_blank_identifier_is_a_path_error() {
    let (mock, schema) = setup();
    let err = schema.model("User").unwrap().find("").await.unwrap_err();
    assert!(err.is_path_error());
    assert_eq!(mock.total_requests(), 0);
}

#[tokio::test]
async fn all_translates_filters_to_query_parameters() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/users")
        .respond_json(200, json!([{"id": 1}, {"id": 2}]));

    let users = schema
        .model("User")
        .unwrap()
        .all(params(json!({"email": "a@b.c", "approved": 1})))
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    let request = mock.last_request().unwrap();
    assert_eq!(request.query_value("EmailAddress"), Some("a@b.c"));
    assert_eq!(request.query_value("approved"), Some("1"));
}

#[tokio::test]
async fn map_in_place_replaces_elements_for_every_handle() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/users")
        .respond_json(200, json!([{"id": 1}, {"id": 2}]));
    let users = schema.model("User").unwrap();
    let loaded = users.all(Params::new()).await.unwrap();
    let shared = loaded.clone();
    let original = loaded.first().unwrap();

    loaded.map_in_place(|record| {
        let id = record.id().and_then(|id| id.as_i64()).unwrap_or_default();
        users
            .instantiate(params(json!({"id": id * 10, "EmailAddress": "new@example.com"})))
            .unwrap()
    });

    assert!(shared.ptr_eq(&loaded));
    assert_eq!(shared.len(), 2);
    let ids: Vec<_> = shared.map(|record| record.id());
    assert_eq!(ids, vec![Some(json!(10)), Some(json!(20))]);
    let first = shared.first().unwrap();
    assert!(!first.ptr_eq(&original));
    assert_eq!(first.get("email"), Some(json!("new@example.com")));
    assert_eq!(original.id(), Some(json!(1)));
}

#[tokio::test]
async fn nested_collection_paths_consume_their_placeholders() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/organizations/4/members")
        .respond_json(200, json!({"members": [{"id": 1}], "total": 1}));

    let members = schema
        .model("Member")
        .unwrap()
        .all(params(json!({"organization_id": 4})))
        .await
        .unwrap();

    assert_eq!(members.len(), 1);
    assert_eq!(members.metadata().get("total"), Some(&json!(1)));
    assert!(mock.last_request().unwrap().query.is_empty());
}

#[tokio::test]
async fn generic_get_shapes_by_payload() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/users/1/stats")
        .respond_json(200, json!({"logins": 3}));
    mock.expect(Method::Get, "/users/recent")
        .respond_json(200, json!([{"id": 1}]));
    let users = schema.model("User").unwrap();

    let stats = users
        .get("/users/:id/stats", params(json!({"id": 1})))
        .await
        .unwrap();
    assert_eq!(stats.as_record().unwrap().get("logins"), Some(json!(3)));

    let recent = users.get("recent", Params::new()).await.unwrap();
    assert_eq!(recent.as_collection().unwrap().len(), 1);
}

#[tokio::test]
async fn forced_collection_shape_rejects_objects() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/events")
        .respond_json(200, json!({"id": 1}));
    let err = schema
        .model("Event")
        .unwrap()
        .get("", Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Parser { .. }));
}

#[tokio::test]
async fn custom_requests_use_their_registered_verb() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/users/popular")
        .respond_json(200, json!([{"id": 1}]));
    mock.expect(Method::Post, "/users/invite")
        .respond_json(200, json!({"sent": true}));
    let users = schema.model("User").unwrap();

    let popular = users.call("popular", Params::new()).await.unwrap();
    assert_eq!(popular.as_collection().unwrap().len(), 1);

    let invited = users
        .call("invite", params(json!({"email": "x@y.z"})))
        .await
        .unwrap();
    assert_eq!(invited.as_record().unwrap().get("sent"), Some(json!(true)));
    assert_eq!(
        mock.last_request().unwrap().body,
        Some(json!({"EmailAddress": "x@y.z"}))
    );

    assert!(matches!(
        users.call("archive", Params::new()).await,
        Err(ResourceError::UnknownVerb { .. })
    ));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_posts_wire_keys_and_merges_the_response() {
    let (mock, schema) = setup();
    mock.expect(Method::Post, "/users")
        .respond_json(201, json!({"id": 9, "EmailAddress": "new@example.com"}));

    let user = schema
        .model("User")
        .unwrap()
        .create(params(json!({"name": "New", "email": "new@example.com"})))
        .await
        .unwrap();

    assert_eq!(user.id(), Some(json!(9)));
    assert_eq!(
        mock.last_request().unwrap().body,
        Some(json!({"name": "New", "EmailAddress": "new@example.com"}))
    );
}

#[tokio::test]
async fn save_on_a_new_nested_record_posts_to_the_filled_collection_path() {
    let (mock, schema) = setup();
    mock.expect(Method::Post, "/organizations/4/members")
        .respond_json(201, json!({"id": 3, "organization_id": 4, "name": "Ada"}));
    let member = schema
        .model("Member")
        .unwrap()
        .instantiate(params(json!({"organization_id": 4, "name": "Ada"})))
        .unwrap();

    assert_eq!(
        member.request_path(&Params::new()).unwrap(),
        "/organizations/4/members"
    );
    member.save().await.unwrap();

    assert_eq!(mock.request_count(Method::Post, "/organizations/4/members"), 1);
    assert_eq!(member.id(), Some(json!(3)));
    assert!(!member.is_new());
}

#[tokio::test]
async fn save_on_an_existing_record_puts_to_the_member_path() {
    let (mock, schema) = setup();
    mock.expect(Method::Put, "/users/9")
        .respond_json(200, json!({"id": 9, "name": "Renamed"}));
    let user = schema
        .model("User")
        .unwrap()
        .instantiate(params(json!({"id": 9, "name": "Old"})))
        .unwrap();

    user.set("name", "Renamed");
    user.save().await.unwrap();

    assert_eq!(mock.request_count(Method::Put, "/users/9"), 1);
    assert_eq!(user.get("name"), Some(json!("Renamed")));
}

#[tokio::test]
async fn invalid_save_surfaces_the_server_body() {
    let (mock, schema) = setup();
    mock.expect(Method::Post, "/users")
        .respond(422, r#"{"errors":{"email":["is taken"]}}"#);

    let err = schema
        .model("User")
        .unwrap()
        .create(params(json!({"email": "dup@example.com"})))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert!(err.body().unwrap().contains("is taken"));
}

#[tokio::test]
async fn destroy_deletes_the_member() {
    let (mock, schema) = setup();
    mock.expect(Method::Delete, "/users/9").respond(204, "");
    let users = schema.model("User").unwrap();
    let user = users.instantiate(params(json!({"id": 9}))).unwrap();

    user.destroy().await.unwrap();

    assert!(user.is_destroyed());
    let request = mock.last_request().unwrap();
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.body, None);

    let unsaved = users.build(Params::new()).unwrap();
    assert!(unsaved.destroy().await.unwrap_err().is_path_error());
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn statuses_map_to_their_error_kinds() {
    let cases: [(u16, fn(&ResourceError) -> bool); 7] = [
        (400, |e| matches!(e, ResourceError::BadRequest { .. })),
        (401, |e| matches!(e, ResourceError::UnauthorizedAccess { .. })),
        (404, |e| matches!(e, ResourceError::ResourceNotFound { .. })),
        (422, |e| matches!(e, ResourceError::ResourceInvalid { .. })),
        (418, |e| matches!(e, ResourceError::ClientError { .. })),
        (503, |e| matches!(e, ResourceError::ServerError { .. })),
        (302, |e| matches!(e, ResourceError::UnexpectedStatus { .. })),
    ];
    for (status, is_expected) in cases {
        let (mock, schema) = setup();
        mock.expect(Method::Get, "/users/1").respond(status, "body");
        let err = schema.model("User").unwrap().find(1).await.unwrap_err();
        assert!(is_expected(&err), "{status}: {err}");
        assert_eq!(err.status(), Some(status));
        assert_eq!(err.body(), Some("body"));
    }
}

#[tokio::test]
async fn transport_failures_propagate() {
    let (mock, schema) = setup();
    mock.expect(Method::Get, "/users/1").fail("connection reset");
    let err = schema.model("User").unwrap().find(1).await.unwrap_err();
    assert!(matches!(err, ResourceError::Transport { .. }));
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn json_api_documents_become_records() {
    let mock = MockTransport::new();
    let dispatcher = Dispatcher::builder("https://api.example.com", Arc::new(mock.clone()))
        .parser(Arc::new(JsonApiParser))
        .build()
        .unwrap();
    let schema = Schema::builder()
        .dispatcher(Arc::new(dispatcher))
        .resource(ResourceClassBuilder::new("User"))
        .build()
        .unwrap();
    mock.expect(Method::Get, "/users").respond_json(
        200,
        json!({
            "data": [{"id": "1", "type": "users", "attributes": {"name": "Lindsay"}}],
            "meta": {"total": 1}
        }),
    );

    let users = schema.model("User").unwrap().all(Params::new()).await.unwrap();

    assert_eq!(users.first().unwrap().get("name"), Some(json!("Lindsay")));
    assert_eq!(users.metadata().get("total"), Some(&json!(1)));
}
