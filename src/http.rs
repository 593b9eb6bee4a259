use actix_web::{
    dev::Payload, error::ResponseError, http::StatusCode, web::Bytes, FromRequest, HttpRequest,
};
use futures::future::{FutureExt, LocalBoxFuture};

pub const EVENT_KEY_HEADER: &str = "X-Event-Key";
pub const PUSH_EVENT: &str = "repo:push";

/// JSON body of a Bitbucket push webhook.
#[derive(Debug, Clone)]
pub struct Webhook<T>(pub T);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("`X-Event-Key` header is not valid ASCII")]
    InvalidEventKey,
    #[error("only `repo:push` events are processed, got `{0}`")]
    UnexpectedEvent(String),
    #[error("failed reading request data: {0}")]
    ActixError(#[from] actix_web::Error),
    #[error("invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidEventKey => StatusCode::BAD_REQUEST,
            WebhookError::UnexpectedEvent(_) => StatusCode::BAD_REQUEST,
            WebhookError::JsonError(_) => StatusCode::BAD_REQUEST,
            WebhookError::ActixError(err) => err.as_response_error().status_code(),
        }
    }
}

/// Requests without the event key header are assumed to be pushes.
fn check_event_key(req: &HttpRequest) -> Result<(), WebhookError> {
    let key = match req.headers().get(EVENT_KEY_HEADER) {
        Some(key) => key.to_str().map_err(|_| WebhookError::InvalidEventKey)?,
        None => return Ok(()),
    };
    if key != PUSH_EVENT {
        return Err(WebhookError::UnexpectedEvent(key.to_string()));
    }
    Ok(())
}

impl<T> FromRequest for Webhook<T>
where
    T: serde::de::DeserializeOwned + 'static,
{
    type Error = WebhookError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(Bytes::from_request(&req, payload).map(
            move |bytes| -> Result<Self, Self::Error> {
                check_event_key(&req)?;
                let bytes = bytes?;
                Ok(Self(serde_json::from_slice(&bytes)?))
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Body {
        ok: bool,
    }

    #[actix_rt::test]
    async fn parses_push_body() {
        let (req, mut payload) = TestRequest::post()
            .insert_header((EVENT_KEY_HEADER, PUSH_EVENT))
            .set_payload(r#"{"ok": true}"#)
            .to_http_parts();

        let Webhook(body) = Webhook::<Body>::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert!(body.ok);
    }

    #[actix_rt::test]
    async fn rejects_other_events() {
        let (req, mut payload) = TestRequest::post()
            .insert_header((EVENT_KEY_HEADER, "pullrequest:created"))
            .set_payload(r#"{"ok": true}"#)
            .to_http_parts();

        let err = Webhook::<Body>::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::UnexpectedEvent(ref key) if key == "pullrequest:created"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn rejects_bad_json() {
        let (req, mut payload) = TestRequest::post().set_payload("{").to_http_parts();

        let err = Webhook::<Body>::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::JsonError(_)));
    }
}
