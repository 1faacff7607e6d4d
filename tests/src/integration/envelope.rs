//! # Envelope Flows
//!
//! Envelope-mode calls: the platform side is played by a `CryptoContext`
//! sharing the endpoint's token, key and app id.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use shared_crypto::{signature, CryptoContext, EncodingKey, EnvelopeCodec, PAD_BLOCK_SIZE};
    use std::sync::atomic::Ordering;
    use wx_callback::{DispatchOutcome, InboundCall, ListenerResult, QueryParams, Topic};

    #[tokio::test]
    async fn test_sealed_handshake_returns_plain_echo() {
        let outcome = encrypted_dispatcher()
            .dispatch(sealed_handshake(&platform(), "3476283562683627"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::ok("3476283562683627"));
    }

    #[tokio::test]
    async fn test_sealed_handshake_from_other_app_is_unauthorized() {
        let stranger = CryptoContext::new(TOKEN, ENCODING_AES_KEY, "wxffffffffffffffff").unwrap();
        let outcome = encrypted_dispatcher()
            .dispatch(sealed_handshake(&stranger, "echo"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::unauthorized());
    }

    #[tokio::test]
    async fn test_plain_handshake_fails_in_envelope_mode() {
        // The echo is not an envelope, and the signature covers the token form
        let outcome = encrypted_dispatcher()
            .dispatch(plain_handshake("1", "2", "hello"))
            .await
            .unwrap();
        assert_eq!(outcome.status, 401);
    }

    #[tokio::test]
    async fn test_sealed_round_trip_with_resigned_reply() {
        let dispatcher = encrypted_dispatcher();
        dispatcher.on(Topic::kind("text"), |ctx| async move {
            let content = ctx.message().text("Content").unwrap_or_default();
            ctx.reply().text(format!("got {}", content));
            ListenerResult::Ok(())
        });

        let outcome = dispatcher
            .dispatch(sealed_post(&platform(), &message_xml("text", "secret")))
            .await
            .unwrap();
        assert_eq!(outcome.status, 200);

        let encrypt = field(&outcome.body, "Encrypt").expect("sealed reply");
        let msg_signature = field(&outcome.body, "MsgSignature").unwrap();
        let timestamp = field(&outcome.body, "TimeStamp").unwrap();
        let nonce = field(&outcome.body, "Nonce").unwrap();
        assert_eq!(timestamp, "1409304348");
        assert_eq!(nonce, "1372623149");

        // Signature covers the new ciphertext, not the inbound one
        assert_eq!(
            msg_signature,
            signature(&[TOKEN, timestamp.as_str(), nonce.as_str(), encrypt.as_str()])
        );

        let opened = platform().decrypt(&encrypt).unwrap();
        assert_eq!(opened.sender_id, APP_ID);
        assert_eq!(field(&opened.message, "Content").as_deref(), Some("got secret"));
        assert_eq!(field(&opened.message, "ToUserName").as_deref(), Some(USER));
        assert_eq!(
            field(&opened.message, "FromUserName").as_deref(),
            Some(OFFICIAL_ACCOUNT)
        );
    }

    #[tokio::test]
    async fn test_sealed_message_without_reply_is_acknowledged() {
        let dispatcher = encrypted_dispatcher();
        let default = count_calls(&dispatcher, Topic::Default);

        let outcome = dispatcher
            .dispatch(sealed_post(&platform(), &event_xml("unsubscribe")))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::acknowledged());
        assert_eq!(default.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tampered_signature_runs_nothing() {
        let dispatcher = encrypted_dispatcher();
        let before = count_calls(&dispatcher, Topic::Before);
        let default = count_calls(&dispatcher, Topic::Default);

        let mut call = sealed_post(&platform(), &message_xml("text", "hi"));
        let mut query = QueryParams::new();
        for key in ["signature", "timestamp", "nonce", "encrypt_type"] {
            query.insert(key, call.query.get(key).unwrap());
        }
        query.insert("msg_signature", "0".repeat(40));
        call.query = query;

        let outcome = dispatcher.dispatch(call).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::unauthorized());
        assert_eq!(before.load(Ordering::SeqCst), 0);
        assert_eq!(default.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_envelope_for_other_app_is_unauthorized() {
        let dispatcher = encrypted_dispatcher();
        let default = count_calls(&dispatcher, Topic::Default);
        let stranger = CryptoContext::new(TOKEN, ENCODING_AES_KEY, "wxffffffffffffffff").unwrap();

        let outcome = dispatcher
            .dispatch(sealed_post(&stranger, &message_xml("text", "hi")))
            .await
            .unwrap();
        assert_eq!(outcome.status, 401);
        assert_eq!(default.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sealed_message_without_type_is_bad_request() {
        let inner = message_xml("text", "hi").replace("<MsgType><![CDATA[text]]></MsgType>", "");
        let outcome = encrypted_dispatcher()
            .dispatch(sealed_post(&platform(), &inner))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::bad_request());
    }

    #[tokio::test]
    async fn test_undecryptable_envelope_is_bad_request() {
        let encrypt = "bm90IGFuIGVudmVsb3Bl";
        let body = format!("<xml><Encrypt><![CDATA[{encrypt}]]></Encrypt></xml>");
        let query = QueryParams::new()
            .with("timestamp", "1")
            .with("nonce", "2")
            .with("msg_signature", signature(&[TOKEN, "1", "2", encrypt]));

        let outcome = encrypted_dispatcher()
            .dispatch(InboundCall::post(query, body))
            .await
            .unwrap();
        assert_eq!(outcome.status, 400);
    }

    #[tokio::test]
    async fn test_plaintext_body_accepted_in_envelope_mode() {
        // Without msg_signature the body is read as-is
        let dispatcher = encrypted_dispatcher();
        dispatcher.on(Topic::kind("text"), |ctx| async move {
            ctx.reply().text("plain");
            ListenerResult::Ok(())
        });

        let outcome = dispatcher
            .dispatch(InboundCall::post(QueryParams::new(), message_xml("text", "hi")))
            .await
            .unwrap();
        assert_eq!(field(&outcome.body, "Content").as_deref(), Some("plain"));
        assert_eq!(field(&outcome.body, "Encrypt"), None);
    }

    #[tokio::test]
    async fn test_message_on_pad_block_boundary() {
        // Pad the content so prefix + length + message + app id fills whole blocks
        let overhead = 16 + 4 + APP_ID.len();
        let skeleton = message_xml("text", "");
        let blocks = (skeleton.len() + overhead) / PAD_BLOCK_SIZE + 2;
        let content = "x".repeat(blocks * PAD_BLOCK_SIZE - overhead - skeleton.len());
        let inner = message_xml("text", &content);
        assert_eq!((inner.len() + overhead) % PAD_BLOCK_SIZE, 0);

        let dispatcher = encrypted_dispatcher();
        dispatcher.on(Topic::kind("text"), |ctx| async move {
            let content = ctx.message().text("Content").unwrap_or_default();
            ctx.reply().text(content.len());
            ListenerResult::Ok(())
        });

        let outcome = dispatcher
            .dispatch(sealed_post(&platform(), &inner))
            .await
            .unwrap();
        let encrypt = field(&outcome.body, "Encrypt").unwrap();
        let opened = platform().decrypt(&encrypt).unwrap();
        assert_eq!(
            field(&opened.message, "Content"),
            Some(content.len().to_string())
        );
    }

    #[test]
    fn test_aligned_envelope_gains_a_full_pad_block() {
        let codec = EnvelopeCodec::new(EncodingKey::from_base64(ENCODING_AES_KEY).unwrap());
        let prefix = [7u8; 16];

        // 16 + 4 + 26 + 18 = 64: two blocks of content plus one full pad block
        let aligned = codec
            .encode_with_prefix(&prefix, &[b'a'; 26], APP_ID.as_bytes())
            .unwrap();
        // 63 bytes pad to 64
        let short = codec
            .encode_with_prefix(&prefix, &[b'a'; 25], APP_ID.as_bytes())
            .unwrap();

        // base64 of 96 and 64 bytes
        assert_eq!(aligned.len(), 128);
        assert_eq!(short.len(), 88);

        let decoded = codec.decode(&aligned).unwrap();
        assert_eq!(decoded.message, vec![b'a'; 26]);
        assert_eq!(decoded.app_id, APP_ID.as_bytes());
    }
}
