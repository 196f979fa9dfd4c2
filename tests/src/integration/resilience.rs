//! # Failure Modes
//!
//! What callers observe when the other side is slow, gone, or speaking
//! garbage: bounded waits, classified errors, and no leaked state.

#[cfg(test)]
mod tests {
    use crate::integration::start_node;
    use relay_broker::{BrokerTransport, InMemoryBroker};
    use relay_rpc::handler_fn;
    use relay_types::{Response, RpcErrorKind};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_slow_handler_times_out_and_late_reply_is_ignored() {
        let broker = Arc::new(InMemoryBroker::new());

        let profile = start_node(&broker, "profile").await;
        profile
            .serve(
                "profile.find.by.email.queue",
                Arc::new(handler_fn(|_payload| async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok(json!({"id": "u1", "email": "a@b.com"}))
                })),
            )
            .await
            .unwrap();

        let reporting = start_node(&broker, "reporting").await;
        let err = reporting
            .client()
            .call::<serde_json::Value, _>(
                "profile.exchange",
                "profile.find.by.email",
                "profile-service",
                &json!({"email": "a@b.com"}),
                Some(Duration::from_millis(100)),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), RpcErrorKind::Timeout);
        assert!(err.is_retryable());
        assert_eq!(reporting.pending_count(), 0);

        // Let the late reply arrive; the dispatcher drops it silently.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(reporting.pending_count(), 0);

        // The client is unharmed: the retry succeeds.
        let response: Response<serde_json::Value> = reporting
            .client()
            .call(
                "profile.exchange",
                "profile.find.by.email",
                "profile-service",
                &json!({"email": "a@b.com"}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(reporting.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_severed_connection_fails_fast_with_connection_error() {
        let broker = Arc::new(InMemoryBroker::new());
        let reporting = start_node(&broker, "reporting").await;

        broker.sever();

        let started = Instant::now();
        let err = reporting
            .client()
            .call::<serde_json::Value, _>(
                "profile.exchange",
                "profile.find.by.email",
                "profile-service",
                &json!({"email": "a@b.com"}),
                Some(Duration::from_secs(30)),
            )
            .await
            .unwrap_err();

        // Fails on publish, long before any timeout could fire.
        assert_eq!(err.kind(), RpcErrorKind::Connection);
        assert!(err.is_retryable());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(reporting.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_garbage_on_request_queue_does_not_stop_service() {
        let broker = Arc::new(InMemoryBroker::new());

        let document = start_node(&broker, "document").await;
        document
            .serve(
                "document.fetch.queue",
                Arc::new(handler_fn(|payload: serde_json::Value| async move {
                    Ok(json!({"id": payload["id"]}))
                })),
            )
            .await
            .unwrap();

        // Not an envelope at all. No reply address exists, so the only
        // correct behavior is to drop it and keep serving.
        broker
            .publish(
                "document.exchange",
                "document.fetch",
                b"\x00\x01 not json".to_vec(),
            )
            .await
            .unwrap();

        let reporting = start_node(&broker, "reporting").await;
        let response: Response<serde_json::Value> = reporting
            .client()
            .call(
                "document.exchange",
                "document.fetch",
                "document-service",
                &json!({"id": "doc-1"}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(response.data.unwrap()["id"], "doc-1");
    }

    #[tokio::test]
    async fn test_request_published_before_server_attaches_still_completes() {
        let broker = Arc::new(InMemoryBroker::new());
        let reporting = start_node(&broker, "reporting").await;

        // Queues are declared up front, so the request buffers in
        // notification.send.queue until a consumer appears.
        let call = {
            let client = reporting.client().clone();
            tokio::spawn(async move {
                client
                    .call::<serde_json::Value, _>(
                        "notification.exchange",
                        "notification.send",
                        "notification-service",
                        &json!({"to": "a@b.com"}),
                        Some(Duration::from_secs(2)),
                    )
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let notification = start_node(&broker, "notification").await;
        notification
            .serve(
                "notification.send.queue",
                Arc::new(handler_fn(|_payload| async { Ok(json!("sent")) })),
            )
            .await
            .unwrap();

        let response = call.await.unwrap().unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(response.data.unwrap(), "sent");
    }

    #[tokio::test]
    async fn test_duplicate_reply_delivery_completes_exactly_once() {
        let broker = Arc::new(InMemoryBroker::new());

        // Bind the reporting reply queue a second time under an overlapping
        // pattern, so every reply is delivered twice.
        let reporting = start_node(&broker, "reporting").await;
        broker
            .bind_queue("reporting.exchange", "reporting.reply.queue", "reporting.#")
            .await
            .unwrap();

        let profile = start_node(&broker, "profile").await;
        profile
            .serve(
                "profile.find.by.email.queue",
                Arc::new(handler_fn(|_payload| async {
                    Ok(json!({"id": "u1", "email": "a@b.com"}))
                })),
            )
            .await
            .unwrap();

        let response: Response<serde_json::Value> = reporting
            .client()
            .call(
                "profile.exchange",
                "profile.find.by.email",
                "profile-service",
                &json!({"email": "a@b.com"}),
                None,
            )
            .await
            .unwrap();

        assert_eq!(response.code, 200);
        // The duplicate finds no pending call and is dropped.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reporting.pending_count(), 0);
    }
}
