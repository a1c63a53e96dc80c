use std::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use axum::{
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    Json,
};
use bytes::Bytes;
use garde::Validate;
use http::{header, request::Parts, HeaderMap};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Extractor wrapper validating the extracted value, validation context
/// is taken from the state
#[derive(Debug, Clone, Copy, Default)]
pub struct Garde<E>(pub E);

impl<E> Deref for Garde<E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<E> DerefMut for Garde<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<E> Garde<E> {
    pub fn into_inner(self) -> E {
        self.0
    }
}

impl<S, Extractor, T> FromRequest<S> for Garde<Extractor>
where
    S: Send + Sync,
    T: Validate,
    T::Context: FromRef<S>,
    Extractor: Deref<Target = T> + FromRequest<S>,
    ApiError: From<Extractor::Rejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request(req, state).await?;
        let context = T::Context::from_ref(state);
        inner.deref().validate_with(&context)?;
        Ok(Garde(inner))
    }
}

impl<S, Extractor, T> FromRequestParts<S> for Garde<Extractor>
where
    S: Send + Sync,
    T: Validate,
    T::Context: FromRef<S>,
    Extractor: Deref<Target = T> + FromRequestParts<S>,
    ApiError: From<Extractor::Rejection>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request_parts(parts, state).await?;
        let context = T::Context::from_ref(state);
        inner.deref().validate_with(&context)?;
        Ok(Garde(inner))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let essence = v.split(';').next().unwrap_or_default().trim();
            essence == "application/json" || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

/// JSON body read eagerly but parsed and validated only on demand, so that
/// a handler can check object permissions first
pub struct Deferred<T> {
    body: Result<Bytes, ApiError>,
    _payload: PhantomData<fn() -> T>,
}

impl<S, T> FromRequest<S> for Deferred<T>
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = if has_json_content_type(req.headers()) {
            Bytes::from_request(req, state)
                .await
                .map_err(|e| ApiError::non_field(e.body_text()))
        } else {
            Err(ApiError::UnsupportedMediaType(
                "Expected request with `Content-Type: application/json`".to_string(),
            ))
        };
        Ok(Deferred {
            body,
            _payload: PhantomData,
        })
    }
}

impl<T> Deferred<T>
where
    T: DeserializeOwned,
{
    /// Parses the body without validation
    pub fn parse(self) -> ApiResult<T> {
        let body = self.body?;
        let Json(payload) = Json::<T>::from_bytes(&body)?;
        Ok(payload)
    }
}

impl<T> Deferred<T>
where
    T: DeserializeOwned + Validate,
{
    pub fn validate_with(self, context: &T::Context) -> ApiResult<T> {
        let payload = self.parse()?;
        payload.validate_with(context)?;
        Ok(payload)
    }

    pub fn validate(self) -> ApiResult<T>
    where
        T::Context: Default,
    {
        self.validate_with(&T::Context::default())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[garde(range(min = 1, max = 10))]
        score: i64,
    }

    fn json_request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_garde_json() {
        let Garde(Json(payload)) =
            Garde::<Json<Payload>>::from_request(json_request(r#"{"score": 5}"#), &())
                .await
                .unwrap();
        assert_eq!(5, payload.score);

        let err = Garde::<Json<Payload>>::from_request(json_request(r#"{"score": 11}"#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains_key("score")));

        let err = Garde::<Json<Payload>>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains_key("score")));
    }

    #[tokio::test]
    async fn test_deferred() {
        let deferred = Deferred::<Payload>::from_request(json_request(r#"{"score": 0}"#), &())
            .await
            .unwrap();
        assert!(matches!(deferred.validate(), Err(ApiError::Validation(_))));

        let request = http::Request::builder()
            .method("PATCH")
            .body(Body::from(r#"{"score": 1}"#))
            .unwrap();
        let deferred = Deferred::<Payload>::from_request(request, &()).await.unwrap();
        assert!(matches!(
            deferred.validate(),
            Err(ApiError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_json_content_type() {
        let mut headers = HeaderMap::new();
        assert!(!has_json_content_type(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert!(has_json_content_type(&headers));
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!has_json_content_type(&headers));
    }
}
