//! # HTTP Surface
//!
//! The axum router in front of a real dispatcher, exercised with
//! `tower::ServiceExt::oneshot`.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use shared_crypto::signature;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wx_callback::{router, Dispatcher, ListenerResult, Topic, DEFAULT_MAX_BODY_BYTES};

    fn app(dispatcher: Dispatcher) -> Router {
        router(Arc::new(dispatcher), "/wechat", DEFAULT_MAX_BODY_BYTES)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    fn handshake_uri(sig: &str) -> String {
        format!("/wechat?signature={sig}&timestamp=1&nonce=2&echostr=hello")
    }

    #[tokio::test]
    async fn test_handshake_over_http() {
        let uri = handshake_uri(&signature(&[TOKEN, "1", "2"]));
        let (status, content_type, body) = send(
            app(plain_dispatcher()),
            Request::get(uri).body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_bad_handshake_over_http() {
        let uri = handshake_uri(&signature(&[TOKEN, "1", "9"]));
        let (status, _, body) = send(
            app(plain_dispatcher()),
            Request::get(uri).body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Invalid signature");
    }

    #[tokio::test]
    async fn test_reply_over_http_is_xml() {
        let dispatcher = plain_dispatcher();
        dispatcher.on(Topic::kind("text"), |ctx| async move {
            ctx.reply().text("pong");
            ListenerResult::Ok(())
        });

        let (status, content_type, body) = send(
            app(dispatcher),
            Request::post("/wechat")
                .header(header::CONTENT_TYPE, "text/xml")
                .body(Body::from(message_xml("text", "ping")))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/xml");
        assert_eq!(field(&body, "Content").as_deref(), Some("pong"));
    }

    #[tokio::test]
    async fn test_acknowledgement_over_http() {
        let dispatcher = plain_dispatcher();
        count_calls(&dispatcher, Topic::Default);

        let (status, _, body) = send(
            app(dispatcher),
            Request::post("/wechat")
                .body(Body::from(event_xml("VIEW")))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "success");
    }

    #[tokio::test]
    async fn test_malformed_body_over_http() {
        let (status, _, body) = send(
            app(plain_dispatcher()),
            Request::post("/wechat")
                .body(Body::from("<xml><ToUserName>a</ToUserName></xml>"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Bad Request");
    }

    #[tokio::test]
    async fn test_unhandled_failure_over_http_is_500() {
        let dispatcher = plain_dispatcher();
        dispatcher.on(Topic::Default, |_ctx| async {
            ListenerResult::Err(anyhow::anyhow!("boom"))
        });

        let (status, _, body) = send(
            app(dispatcher),
            Request::post("/wechat")
                .body(Body::from(message_xml("text", "hi")))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_unrouted_method_is_rejected() {
        let (status, _, _) = send(
            app(plain_dispatcher()),
            Request::put("/wechat")
                .body(Body::from(message_xml("text", "hi")))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = router(Arc::new(plain_dispatcher()), "/wechat", 256);
        let (status, _, _) = send(
            app,
            Request::post("/wechat")
                .body(Body::from(message_xml("text", &"x".repeat(1024))))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_sealed_round_trip_over_http() {
        let dispatcher = encrypted_dispatcher();
        dispatcher.on(Topic::kind("subscribe"), |ctx| async move {
            ctx.reply().text("Welcome to use WeChatYoo!");
            ListenerResult::Ok(())
        });

        let call = sealed_post(&platform(), &event_xml("subscribe"));
        let query: Vec<String> = ["signature", "timestamp", "nonce", "encrypt_type", "msg_signature"]
            .iter()
            .map(|key| format!("{}={}", key, call.query.get(key).unwrap_or_default()))
            .collect();
        let body = match call.body {
            wx_callback::CallBody::Raw(text) => text,
            other => panic!("unexpected body {other:?}"),
        };

        let (status, content_type, body) = send(
            app(dispatcher),
            Request::post(format!("/wechat?{}", query.join("&")))
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/xml");
        let encrypt = field(&body, "Encrypt").expect("sealed reply");
        let opened = platform().decrypt(&encrypt).unwrap();
        assert_eq!(
            field(&opened.message, "Content").as_deref(),
            Some("Welcome to use WeChatYoo!")
        );
    }
}
