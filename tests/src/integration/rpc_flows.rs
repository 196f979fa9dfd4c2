//! # Request/Reply Flows
//!
//! The platform scenario end to end: services call one another through the
//! broker and get exactly the response their counterpart produced, even
//! with many calls in flight at once.
//!
//! ```text
//! [reporting] ──call──▶ profile.exchange ──▶ [profile handler]
//!      ▲                                            │
//!      └── reporting.reply.queue ◀── reply ─────────┘
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::start_node;
    use relay_broker::InMemoryBroker;
    use relay_rpc::{handler_fn, HandlerError};
    use relay_types::{Response, RpcError, RpcErrorKind};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ProfileRecord {
        id: String,
        email: String,
    }

    #[tokio::test]
    async fn test_find_profile_by_email_round_trip() {
        let broker = Arc::new(InMemoryBroker::new());

        let profile = start_node(&broker, "profile").await;
        profile
            .serve(
                "profile.find.by.email.queue",
                Arc::new(handler_fn(|payload: serde_json::Value| async move {
                    if payload["email"] == "a@b.com" {
                        Ok(json!({"id": "u1", "email": "a@b.com"}))
                    } else {
                        Err(HandlerError::not_found("no profile for that email"))
                    }
                })),
            )
            .await
            .unwrap();

        let reporting = start_node(&broker, "reporting").await;
        let response: Response<ProfileRecord> = reporting
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
        assert_eq!(response.message, "Success");
        assert_eq!(
            response.data.unwrap(),
            ProfileRecord {
                id: "u1".into(),
                email: "a@b.com".into()
            }
        );
        assert_eq!(reporting.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_business_error_surfaces_with_remote_code() {
        let broker = Arc::new(InMemoryBroker::new());

        let profile = start_node(&broker, "profile").await;
        profile
            .serve(
                "profile.find.by.email.queue",
                Arc::new(handler_fn(|_payload| async {
                    Err(HandlerError::not_found("no profile for that email"))
                })),
            )
            .await
            .unwrap();

        let reporting = start_node(&broker, "reporting").await;
        let err = reporting
            .client()
            .call::<ProfileRecord, _>(
                "profile.exchange",
                "profile.find.by.email",
                "profile-service",
                &json!({"email": "missing@b.com"}),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), RpcErrorKind::Response);
        assert_eq!(err.remote_code(), Some(404));
        assert!(!err.is_retryable());
        assert_eq!(reporting.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_resolve_independently() {
        let broker = Arc::new(InMemoryBroker::new());

        // Echo with a spread of delays, so replies come back out of order.
        let document = start_node(&broker, "document").await;
        document
            .serve(
                "document.fetch.queue",
                Arc::new(handler_fn(|payload: serde_json::Value| async move {
                    let n = payload["n"].as_u64().unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(40 - (n % 40))).await;
                    Ok(json!({"n": n}))
                })),
            )
            .await
            .unwrap();

        let reporting = Arc::new(start_node(&broker, "reporting").await);
        let mut handles = Vec::new();
        for n in 0u64..24 {
            let reporting = reporting.clone();
            handles.push(tokio::spawn(async move {
                let response: Response<serde_json::Value> = reporting
                    .client()
                    .call(
                        "document.exchange",
                        "document.fetch",
                        "document-service",
                        &json!({"n": n}),
                        None,
                    )
                    .await
                    .unwrap();
                assert_eq!(response.data.unwrap()["n"], n);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(reporting.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_one_way_notification_is_delivered_without_reply() {
        let broker = Arc::new(InMemoryBroker::new());
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::channel::<String>(4);

        let notification = start_node(&broker, "notification").await;
        notification
            .serve(
                "notification.send.queue",
                Arc::new(handler_fn(move |payload: serde_json::Value| {
                    let seen_tx = seen_tx.clone();
                    async move {
                        let to = payload["to"].as_str().unwrap_or_default().to_string();
                        seen_tx.send(to).await.ok();
                        Ok(json!(null))
                    }
                })),
            )
            .await
            .unwrap();

        let identity = start_node(&broker, "identity").await;
        identity
            .client()
            .notify(
                "notification.exchange",
                "notification.send",
                "notification-service",
                &json!({"to": "a@b.com", "template": "welcome"}),
            )
            .await
            .unwrap();

        assert_eq!(seen_rx.recv().await.unwrap(), "a@b.com");
        assert_eq!(identity.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_call_decodes_are_strict_but_tolerant_of_extra_fields() {
        let broker = Arc::new(InMemoryBroker::new());

        // Handler returns more fields than the caller's type knows about.
        let profile = start_node(&broker, "profile").await;
        profile
            .serve(
                "profile.find.by.email.queue",
                Arc::new(handler_fn(|_payload| async {
                    Ok(json!({
                        "id": "u1",
                        "email": "a@b.com",
                        "displayName": "added in a later release"
                    }))
                })),
            )
            .await
            .unwrap();

        let reporting = start_node(&broker, "reporting").await;
        let response: Response<ProfileRecord> = reporting
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

        assert_eq!(response.data.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_error_from_call_matches_taxonomy() {
        // Classification is programmatic; retry loops branch on it.
        let timeout = RpcError::Timeout { timeout_ms: 100 };
        assert_eq!(timeout.kind(), RpcErrorKind::Timeout);
        assert!(timeout.is_retryable());

        let connection = RpcError::Connection("broker connection lost".into());
        assert!(connection.is_retryable());

        let serialization = RpcError::Serialization("bad payload".into());
        assert!(!serialization.is_retryable());
    }
}
