use serde_json::{Value, json};
use tracing::info;
use tracing_test::traced_test;
use yamdb_e2e_tests::TestServer;
use yamdb_types::Role;

#[tokio::test]
#[traced_test]
async fn test_admin_manages_users() {
    let server = TestServer::start("test_admin_manages_users").await.unwrap();
    let admin = server.create_user("admin", Role::Admin).await.unwrap();

    let response = server
        .client
        .post(server.api("users"))
        .bearer_auth(&admin)
        .json(&json!({
            "username": "carol",
            "email": "carol@example.com",
            "role": "moderator",
            "bio": "Reads a lot"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let created: Value = response.json().await.unwrap();
    assert_eq!("moderator", created["role"]);
    assert!(created.get("confirm_code").is_none());
    assert!(created.get("id").is_none());

    let response = server
        .client
        .post(server.api("users"))
        .bearer_auth(&admin)
        .json(&json!({"username": "dave", "email": "invalid"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("email").is_some());

    // created user is pending until the mailed code is exchanged
    let code = server.confirmation_code("carol@example.com").unwrap();
    let carol = server.obtain_token("carol", &code).await.unwrap();
    assert!(!carol.is_empty());

    let response = server
        .client
        .get(server.api("users?search=carol"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let page: Value = response.json().await.unwrap();
    assert_eq!(1, page["total"]);
    assert_eq!("carol", page["rows"][0]["username"]);

    let response = server
        .client
        .patch(server.api("users/carol"))
        .bearer_auth(&admin)
        .json(&json!({"role": "admin", "first_name": "Carol"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!("admin", updated["role"]);
    assert_eq!("Carol", updated["first_name"]);

    let response = server
        .client
        .patch(server.api("users/carol"))
        .bearer_auth(&admin)
        .json(&json!({"role": "owner"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    let response = server
        .client
        .delete(server.api("users/carol"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());

    let response = server
        .client
        .get(server.api("users/carol"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());

    // token of a deleted user is no longer accepted
    let response = server
        .client
        .get(server.api("users/me"))
        .bearer_auth(&carol)
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_users_need_admin() {
    let server = TestServer::start("test_users_need_admin").await.unwrap();
    let moderator = server.create_user("mod", Role::Moderator).await.unwrap();

    let response = server
        .client
        .get(server.api("users"))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    let response = server
        .client
        .get(server.api("users"))
        .bearer_auth(&moderator)
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    let response = server
        .client
        .post(server.api("users"))
        .bearer_auth(&moderator)
        .json(&json!({"username": "dave", "email": "dave@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert!(server.confirmation_code("dave@example.com").is_none());
}

#[tokio::test]
#[traced_test]
async fn test_own_profile() {
    let server = TestServer::start("test_own_profile").await.unwrap();
    let bob = server.create_user("bob", Role::User).await.unwrap();

    let response = server
        .client
        .patch(server.api("users/me"))
        .bearer_auth(&bob)
        .json(&json!({"bio": "Film buff", "role": "admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let me: Value = response.json().await.unwrap();
    info!("Profile: {me:#?}");
    assert_eq!("Film buff", me["bio"]);
    assert_eq!("user", me["role"]);

    let response = server
        .client
        .delete(server.api("users/me"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(405, response.status().as_u16());

    let response = server
        .client
        .delete(server.api("users/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    // still there
    let response = server
        .client
        .get(server.api("users/me"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
}
