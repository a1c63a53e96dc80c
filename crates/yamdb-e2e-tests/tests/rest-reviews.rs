use serde_json::{Value, json};
use tracing::info;
use tracing_test::traced_test;
use yamdb_e2e_tests::{TestServer, rest};
use yamdb_types::Role;

struct Fixture {
    server: TestServer,
    admin: String,
    moderator: String,
    bob: String,
    alice: String,
    title_id: i64,
}

async fn prepare(test_name: &str) -> Fixture {
    let server = TestServer::start(test_name).await.unwrap();
    let admin = server.create_user("admin", Role::Admin).await.unwrap();
    let moderator = server.create_user("moder", Role::Moderator).await.unwrap();
    let bob = server.create_user("bob", Role::User).await.unwrap();
    let alice = server.create_user("alice", Role::User).await.unwrap();
    rest::create_category(&server, &admin, "Books", "books")
        .await
        .unwrap();
    let title = rest::create_title(
        &server,
        &admin,
        json!({"name": "Dune", "year": 1965, "category": "books", "genre": []}),
    )
    .await
    .unwrap();
    Fixture {
        title_id: title["id"].as_i64().unwrap(),
        server,
        admin,
        moderator,
        bob,
        alice,
    }
}

impl Fixture {
    fn reviews(&self) -> String {
        format!("titles/{}/reviews", self.title_id)
    }

    async fn rating(&self) -> Value {
        let response = self
            .server
            .client
            .get(self.server.api(&format!("titles/{}", self.title_id)))
            .send()
            .await
            .unwrap();
        let title: Value = response.json().await.unwrap();
        title["rating"].clone()
    }
}

#[tokio::test]
#[traced_test]
async fn test_reviews() {
    let f = prepare("test_reviews").await;
    let server = &f.server;

    let review = rest::create(server, &f.bob, &f.reviews(), json!({"text": "Great", "score": 9}))
        .await
        .unwrap();
    info!("Review: {review:#?}");
    assert_eq!("bob", review["author"]);
    assert_eq!(9, review["score"]);
    assert!(review["pub_date"].is_string());

    // one review per title and author
    let response = server
        .client
        .post(server.api(&f.reviews()))
        .bearer_auth(&f.bob)
        .json(&json!({"text": "Again", "score": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("non_field_errors").is_some());

    rest::create(server, &f.alice, &f.reviews(), json!({"text": "Meh", "score": 4}))
        .await
        .unwrap();
    assert_eq!(json!(6.5), f.rating().await);

    let response = server
        .client
        .post(server.api(&f.reviews()))
        .bearer_auth(&f.admin)
        .json(&json!({"text": "Out of range", "score": 11}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("score").is_some());

    let response = server
        .client
        .post(server.api(&f.reviews()))
        .json(&json!({"text": "Anonymous", "score": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    let response = server
        .client
        .get(server.api(&f.reviews()))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let page: Value = response.json().await.unwrap();
    assert_eq!(2, page["total"]);

    let response = server
        .client
        .post(server.api("titles/9999/reviews"))
        .bearer_auth(&f.bob)
        .json(&json!({"text": "Missing", "score": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_review_permissions() {
    let f = prepare("test_review_permissions").await;
    let server = &f.server;

    let review = rest::create(server, &f.bob, &f.reviews(), json!({"text": "Great", "score": 9}))
        .await
        .unwrap();
    let review_url = server.api(&format!("{}/{}", f.reviews(), review["id"]));

    let response = server
        .client
        .patch(review_url.clone())
        .bearer_auth(&f.alice)
        .json(&json!({"score": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    // permission is checked before the payload
    let response = server
        .client
        .patch(review_url.clone())
        .bearer_auth(&f.alice)
        .json(&json!({"score": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    let response = server
        .client
        .patch(review_url.clone())
        .bearer_auth(&f.bob)
        .json(&json!({"score": 7}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!(7, updated["score"]);
    assert_eq!("Great", updated["text"]);
    assert_eq!(review["pub_date"], updated["pub_date"]);

    let response = server
        .client
        .patch(review_url.clone())
        .bearer_auth(&f.moderator)
        .json(&json!({"text": "Moderated"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let response = server
        .client
        .delete(review_url.clone())
        .bearer_auth(&f.alice)
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    let response = server
        .client
        .delete(review_url.clone())
        .bearer_auth(&f.admin)
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());

    let response = server.client.get(review_url).send().await.unwrap();
    assert_eq!(404, response.status().as_u16());
    assert_eq!(Value::Null, f.rating().await);
}

#[tokio::test]
#[traced_test]
async fn test_comments() {
    let f = prepare("test_comments").await;
    let server = &f.server;

    let review = rest::create(server, &f.bob, &f.reviews(), json!({"text": "Great", "score": 9}))
        .await
        .unwrap();
    let comments = format!("{}/{}/comments", f.reviews(), review["id"]);

    let comment = rest::create(server, &f.alice, &comments, json!({"text": "Agreed"}))
        .await
        .unwrap();
    assert_eq!("alice", comment["author"]);
    let comment_url = server.api(&format!("{comments}/{}", comment["id"]));

    let response = server
        .client
        .get(server.api(&comments))
        .send()
        .await
        .unwrap();
    let page: Value = response.json().await.unwrap();
    assert_eq!(1, page["total"]);
    assert_eq!("Agreed", page["rows"][0]["text"]);

    let response = server
        .client
        .patch(comment_url.clone())
        .bearer_auth(&f.bob)
        .json(&json!({"text": "Hijacked"}))
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    let response = server
        .client
        .patch(comment_url.clone())
        .bearer_auth(&f.alice)
        .json(&json!({"text": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    let response = server
        .client
        .patch(comment_url.clone())
        .bearer_auth(&f.alice)
        .json(&json!({"text": "Strongly agreed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // comment is reachable only through its own review
    let other = rest::create(server, &f.alice, &f.reviews(), json!({"text": "Fine", "score": 6}))
        .await
        .unwrap();
    let response = server
        .client
        .get(server.api(&format!(
            "{}/{}/comments/{}",
            f.reviews(),
            other["id"],
            comment["id"]
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());

    let response = server
        .client
        .delete(comment_url.clone())
        .bearer_auth(&f.moderator)
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());

    // deleting the title removes its reviews and comments
    rest::create(server, &f.bob, &comments, json!({"text": "Still here"}))
        .await
        .unwrap();
    let response = server
        .client
        .delete(server.api(&format!("titles/{}", f.title_id)))
        .bearer_auth(&f.admin)
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());
    let response = server
        .client
        .get(server.api(&comments))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}
