//! Opt-in process-wide dispatcher. Kept in its own test binary because the
//! global can be installed only once per process.

use std::sync::Arc;

use model::mock::MockTransport;
use model::{Dispatcher, Method, ResourceClassBuilder, Schema};
use serde_json::json;

#[tokio::test]
async fn classes_opt_in_to_the_global_dispatcher() {
    let missing = Schema::builder()
        .resource(ResourceClassBuilder::new("User").use_global_dispatcher())
        .build();
    assert!(missing.is_err());

    let mock = MockTransport::new();
    mock.expect(Method::Get, "/users/1")
        .respond_json(200, json!({"id": 1}));
    let global = Dispatcher::builder("https://api.example.com", Arc::new(mock.clone()))
        .build()
        .unwrap();
    Dispatcher::install_global(Arc::new(global)).unwrap();
    assert!(Dispatcher::install_global(Arc::clone(&Dispatcher::global().unwrap())).is_err());

    let schema = Schema::builder()
        .resource(ResourceClassBuilder::new("User").use_global_dispatcher())
        .resource(ResourceClassBuilder::new("Admin").inherits("User"))
        .build()
        .unwrap();

    let user = schema.model("User").unwrap().find(1).await.unwrap();
    assert_eq!(user.id(), Some(json!(1)));
    let admin = schema.model("Admin").unwrap().find(1).await.unwrap();
    assert_eq!(admin.class_name().as_str(), "Admin");
    assert_eq!(mock.request_count(Method::Get, "/users/1"), 2);

    // Without opting in, a class still needs an explicit dispatcher.
    assert!(Schema::builder()
        .resource(ResourceClassBuilder::new("Comment"))
        .build()
        .is_err());
}
