use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use yamdb_types::{Access, Caller, Policy};

use crate::error::ApiError;

/// Collection level permission check, runs before the handler extracts the body.
///
/// Apply with `route_layer(middleware::from_fn_with_state(policy, enforce_policy))`
/// under the `authenticate` middleware.
pub async fn enforce_policy(State(policy): State<Policy>, request: Request, next: Next) -> Response {
    let access = Access::from_method_name(request.method().as_str());
    let caller = request
        .extensions()
        .get::<Caller>()
        .cloned()
        .unwrap_or_default();
    match policy.check(access, &caller) {
        Ok(()) => next.run(request).await,
        Err(denial) => {
            debug!(
                "{policy:?} denied {access:?} {} for {:?}: {denial:?}",
                request.uri().path(),
                caller.identity().map(|i| i.username.as_str())
            );
            ApiError::from(denial).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, middleware, routing::get, Router};
    use http::StatusCode;
    use tower::ServiceExt as _;
    use tracing_test::traced_test;
    use yamdb_types::{Identity, Role};

    use super::*;

    fn app(policy: Policy, caller: Option<Caller>) -> Router {
        let router = Router::new()
            .route("/", get(|| async { "ok" }).post(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(policy, enforce_policy));
        match caller {
            Some(caller) => router.layer(axum::Extension(caller)),
            None => router,
        }
    }

    fn user(role: Role) -> Caller {
        Caller::User(Identity {
            id: 1,
            username: "bob".into(),
            role,
            is_superuser: false,
        })
    }

    async fn status(router: Router, method: &str) -> StatusCode {
        let request = http::Request::builder()
            .method(method)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_admin_or_read_only() {
        let p = Policy::AdminOrReadOnly;
        assert_eq!(StatusCode::OK, status(app(p, None), "GET").await);
        assert_eq!(StatusCode::UNAUTHORIZED, status(app(p, None), "POST").await);
        assert_eq!(
            StatusCode::FORBIDDEN,
            status(app(p, Some(user(Role::Moderator))), "POST").await
        );
        assert!(logs_contain("AdminOrReadOnly denied Write"));
        assert_eq!(
            StatusCode::OK,
            status(app(p, Some(user(Role::Admin))), "POST").await
        );
    }

    #[tokio::test]
    async fn test_admin_only_reads() {
        let p = Policy::AdminOnly;
        assert_eq!(StatusCode::UNAUTHORIZED, status(app(p, None), "GET").await);
        assert_eq!(
            StatusCode::FORBIDDEN,
            status(app(p, Some(user(Role::User))), "GET").await
        );
    }
}
