use serde_json::{Value, json};
use tracing::info;
use tracing_test::traced_test;
use yamdb_e2e_tests::{TestServer, rest};
use yamdb_types::Role;

async fn prepare(server: &TestServer) -> String {
    let admin = server.create_user("admin", Role::Admin).await.unwrap();
    rest::create_category(server, &admin, "Books", "books")
        .await
        .unwrap();
    rest::create_category(server, &admin, "Films", "films")
        .await
        .unwrap();
    rest::create_genre(server, &admin, "Science fiction", "sci-fi")
        .await
        .unwrap();
    rest::create_genre(server, &admin, "Drama", "drama")
        .await
        .unwrap();
    admin
}

#[tokio::test]
#[traced_test]
async fn test_titles() {
    let server = TestServer::start("test_titles").await.unwrap();
    let admin = prepare(&server).await;

    let dune = rest::create_title(
        &server,
        &admin,
        json!({
            "name": "Dune",
            "year": 1965,
            "description": "Desert planet",
            "category": "books",
            "genre": ["sci-fi", "drama"]
        }),
    )
    .await
    .unwrap();
    info!("Created: {dune:#?}");
    assert_eq!(Value::Null, dune["rating"]);
    assert_eq!(json!({"name": "Books", "slug": "books"}), dune["category"]);
    assert_eq!(2, dune["genre"].as_array().unwrap().len());

    rest::create_title(
        &server,
        &admin,
        json!({"name": "Solaris", "year": 1972, "category": "films", "genre": ["sci-fi"]}),
    )
    .await
    .unwrap();

    let response = server
        .client
        .get(server.api("titles?genre=sci&category=films"))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let page: Value = response.json().await.unwrap();
    assert_eq!(1, page["total"]);
    assert_eq!("Solaris", page["rows"][0]["name"]);

    let response = server
        .client
        .get(server.api("titles?year=1965"))
        .send()
        .await
        .unwrap();
    let page: Value = response.json().await.unwrap();
    assert_eq!(1, page["total"]);
    assert_eq!("Dune", page["rows"][0]["name"]);

    let id = dune["id"].as_i64().unwrap();
    let response = server
        .client
        .patch(server.api(&format!("titles/{id}")))
        .bearer_auth(&admin)
        .json(&json!({"genre": ["drama"], "category": "films"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!("Dune", updated["name"]);
    assert_eq!("films", updated["category"]["slug"]);
    assert_eq!(json!([{"name": "Drama", "slug": "drama"}]), updated["genre"]);

    // category removal keeps the title
    let response = server
        .client
        .delete(server.api("categories/films"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());
    let response = server
        .client
        .get(server.api(&format!("titles/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let title: Value = response.json().await.unwrap();
    assert_eq!(Value::Null, title["category"]);

    let response = server
        .client
        .delete(server.api(&format!("titles/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());
    let response = server
        .client
        .get(server.api(&format!("titles/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_title_without_category() {
    let server = TestServer::start("test_title_without_category").await.unwrap();
    let admin = prepare(&server).await;

    let plain = rest::create_title(
        &server,
        &admin,
        json!({"name": "Unsorted", "year": 2001, "genre": []}),
    )
    .await
    .unwrap();
    assert_eq!(Value::Null, plain["category"]);

    let explicit = rest::create_title(
        &server,
        &admin,
        json!({"name": "Also unsorted", "year": 2002, "category": null, "genre": []}),
    )
    .await
    .unwrap();
    assert_eq!(Value::Null, explicit["category"]);

    let titled = rest::create_title(
        &server,
        &admin,
        json!({
            "name": "Dune",
            "year": 1965,
            "description": "Desert planet",
            "category": "books",
            "genre": ["sci-fi"]
        }),
    )
    .await
    .unwrap();
    let id = titled["id"].as_i64().unwrap();

    let response = server
        .client
        .patch(server.api(&format!("titles/{id}")))
        .bearer_auth(&admin)
        .json(&json!({"category": null, "description": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!(Value::Null, updated["category"]);
    assert_eq!(Value::Null, updated["description"]);
    assert_eq!("Dune", updated["name"]);
    assert_eq!(1, updated["genre"].as_array().unwrap().len());

    let response = server
        .client
        .get(server.api("titles?category=books"))
        .send()
        .await
        .unwrap();
    let page: Value = response.json().await.unwrap();
    assert_eq!(0, page["total"]);
}

#[tokio::test]
#[traced_test]
async fn test_invalid_titles() {
    let server = TestServer::start("test_invalid_titles").await.unwrap();
    let admin = prepare(&server).await;
    let bob = server.create_user("bob", Role::User).await.unwrap();

    let post = |token: String, payload: Value| {
        let request = server
            .client
            .post(server.api("titles"))
            .bearer_auth(token)
            .json(&payload);
        async move { request.send().await.unwrap() }
    };

    let response = post(
        bob.clone(),
        json!({"name": "Dune", "year": 1965, "category": "books", "genre": []}),
    )
    .await;
    assert_eq!(403, response.status().as_u16());

    let response = post(
        admin.clone(),
        json!({"name": "Future", "year": 3000, "category": "books", "genre": []}),
    )
    .await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("year").is_some());

    let response = post(
        admin.clone(),
        json!({"name": "Dune", "year": 1965, "category": "poems", "genre": []}),
    )
    .await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("category").is_some());

    let response = post(
        admin.clone(),
        json!({"name": "Dune", "year": 1965, "category": "books", "genre": ["western"]}),
    )
    .await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("genre").is_some());

    let response = post(admin.clone(), json!({"year": 1965, "category": "books", "genre": []})).await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("name").is_some());

    let response = server
        .client
        .get(server.api("titles/12345"))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}
