//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 -> 注册表 -> 网关 -> 分发器 -> 传输 的完整链路
//! - 使用真实的 `MemoryRegistry` / `FileRegistry` 与 `ChannelTransport`

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{BroadcastSummary, ConnectionRegistry, Message};
    use dispatcher::{DispatcherConfig, FanoutDispatcher};
    use gateway::{Gateway, GatewayResponse, InboundEvent, Route, StatusCode};
    use registry::{FileRegistry, MemoryRegistry, MockRegistry, MockRegistryConfig};
    use serde_json::json;
    use tokio::sync::mpsc;
    use transport::{ChannelTransport, MockTransport};

    fn summary(response: &GatewayResponse) -> BroadcastSummary {
        serde_json::from_str(response.body.as_deref().expect("summary body")).unwrap()
    }

    fn gateway_over<R: ConnectionRegistry + 'static>(
        registry: &Arc<R>,
        transport: &Arc<ChannelTransport>,
        config: DispatcherConfig,
    ) -> Gateway<R, ChannelTransport> {
        let dispatcher =
            FanoutDispatcher::new(config, Arc::clone(registry), Arc::clone(transport)).unwrap();
        Gateway::new(Arc::clone(registry), dispatcher)
    }

    /// {A, B, C}, sender A; C's socket is closed.
    ///
    /// B receives the payload, C is classified stale and removed from the
    /// registry exactly once, A receives nothing.
    #[tokio::test]
    async fn test_e2e_stale_connection_removed() {
        let registry = Arc::new(MemoryRegistry::with_seed(["A", "B", "C"]));
        let transport = Arc::new(ChannelTransport::new(8));
        let mut rx_a = transport.attach("A");
        let mut rx_b = transport.attach("B");
        drop(transport.attach("C"));

        let gateway = gateway_over(&registry, &transport, DispatcherConfig::default());
        let response = gateway
            .handle(&InboundEvent::send_message("A", json!("hello")))
            .await;
        gateway.dispatcher().drain_cleanup().await;

        assert_eq!(response.status_code, StatusCode::OK);
        let summary = summary(&response);
        assert_eq!(summary.recipients, 2);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.stale, 1);

        let received: Message = rx_b.recv().await.unwrap();
        assert_eq!(received.payload().as_ref(), b"hello");
        assert_eq!(received.sender(), "A");
        assert!(rx_a.try_recv().is_err());

        assert!(!registry.contains("C").await);
        assert_eq!(registry.len().await, 2);
        assert_eq!(gateway.dispatcher().metrics().snapshot().cleanup_ok, 1);
    }

    /// Sender is the only connection: nothing is sent, still a success
    #[tokio::test]
    async fn test_e2e_sole_connection() {
        let registry = Arc::new(MemoryRegistry::with_seed(["A"]));
        let transport = Arc::new(ChannelTransport::new(8));
        let mut rx_a = transport.attach("A");

        let gateway = gateway_over(&registry, &transport, DispatcherConfig::default());
        let response = gateway
            .handle(&InboundEvent::send_message("A", json!("hello")))
            .await;

        assert_eq!(response.status_code, StatusCode::OK);
        assert_eq!(summary(&response), BroadcastSummary::default());
        assert!(rx_a.try_recv().is_err());
    }

    /// Registry down: 500 and the transport is never touched
    #[tokio::test]
    async fn test_e2e_registry_unavailable() {
        let registry = Arc::new(MockRegistry::with_config(
            ["A", "B"],
            MockRegistryConfig {
                fail_list: true,
                ..Default::default()
            },
        ));
        let transport = Arc::new(MockTransport::new());
        let dispatcher = FanoutDispatcher::new(
            DispatcherConfig::default(),
            Arc::clone(&registry),
            Arc::clone(&transport),
        )
        .unwrap();
        let gateway = Gateway::new(Arc::clone(&registry), dispatcher);

        let response = gateway
            .handle(&InboundEvent::send_message("A", json!("hello")))
            .await;

        assert_eq!(response.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.send_count(), 0);
        assert_eq!(registry.list_calls(), 1);
    }

    /// Missing `message` key: 400 before the registry is read
    #[tokio::test]
    async fn test_e2e_missing_message() {
        let registry = Arc::new(MockRegistry::new(["A", "B"]));
        let transport = Arc::new(MockTransport::new());
        let dispatcher = FanoutDispatcher::new(
            DispatcherConfig::default(),
            Arc::clone(&registry),
            Arc::clone(&transport),
        )
        .unwrap();
        let gateway = Gateway::new(Arc::clone(&registry), dispatcher);

        let event = InboundEvent::new("A", Route::SEND_MESSAGE)
            .with_body(r#"{"action":"sendmessage"}"#);
        let response = gateway.handle(&event).await;

        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(registry.list_calls(), 0);
        assert_eq!(transport.send_count(), 0);
    }

    /// Full queue is transient: nothing is deleted
    #[tokio::test]
    async fn test_e2e_full_queue_is_transient() {
        let registry = Arc::new(MemoryRegistry::with_seed(["A", "B"]));
        let transport = Arc::new(ChannelTransport::new(1));
        let _rx_b: mpsc::Receiver<Message> = transport.attach("B");

        let gateway = gateway_over(&registry, &transport, DispatcherConfig::default());
        let first = gateway
            .handle(&InboundEvent::send_message("A", json!("one")))
            .await;
        let second = gateway
            .handle(&InboundEvent::send_message("A", json!("two")))
            .await;
        gateway.dispatcher().drain_cleanup().await;

        assert_eq!(summary(&first).delivered, 1);
        assert_eq!(summary(&second).transient_failures, 1);
        assert!(registry.contains("B").await);
    }

    /// Connect/disconnect lifecycle against a file-backed registry
    #[tokio::test]
    async fn test_e2e_file_registry_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(FileRegistry::new(dir.path().join("connections.json")));
        let transport = Arc::new(ChannelTransport::new(8));
        let gateway = gateway_over(&registry, &transport, DispatcherConfig::default());

        for id in ["A", "B", "C"] {
            let response = gateway.handle(&InboundEvent::new(id, Route::CONNECT)).await;
            assert!(response.is_success());
        }
        let mut rx_b = transport.attach("B");
        let mut rx_c = transport.attach("C");

        let response = gateway
            .handle(&InboundEvent::new("C", Route::DISCONNECT))
            .await;
        assert!(response.is_success());
        transport.detach("C");

        let response = gateway
            .handle(&InboundEvent::send_message("A", json!({"text": "hi"})))
            .await;
        let summary = summary(&response);
        assert_eq!(summary.recipients, 1);
        assert_eq!(summary.delivered, 1);

        let received = rx_b.recv().await.unwrap();
        assert_eq!(received.payload().as_ref(), br#"{"text":"hi"}"#);
        assert!(rx_c.recv().await.is_none());

        let listed = registry.list().await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    /// Config file drives the dispatcher: timeouts yield a partial result
    #[tokio::test]
    async fn test_e2e_config_driven_timeouts() {
        let config = config_loader::ConfigLoader::load_from_str(
            r#"
[gateway]
name = "chat"

[dispatcher]
max_concurrency = 2
cleanup = "sync"
broadcast_timeout_ms = 100

[registry]
seed = ["A", "B", "C"]
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let registry = Arc::new(MemoryRegistry::with_seed(
            config.registry.seed.iter().map(String::as_str),
        ));
        let transport = Arc::new(MockTransport::with_config(transport::MockTransportConfig {
            hang_on: vec!["C".into()],
            ..Default::default()
        }));
        let dispatcher = FanoutDispatcher::new(
            DispatcherConfig::from(&config.dispatcher),
            Arc::clone(&registry),
            Arc::clone(&transport),
        )
        .unwrap();
        assert_eq!(dispatcher.config().max_concurrency, 2);
        let gateway = Gateway::new(Arc::clone(&registry), dispatcher);

        let response = tokio::time::timeout(
            Duration::from_secs(2),
            gateway.handle(&InboundEvent::send_message("A", json!("hello"))),
        )
        .await
        .expect("broadcast timeout must bound the request");

        assert_eq!(response.status_code, StatusCode::OK);
        let summary = summary(&response);
        assert!(summary.cancelled);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.abandoned, 1);
        assert!(transport.peak_in_flight() <= 2);
    }

    /// Aggregated statistics over several broadcasts
    #[tokio::test]
    async fn test_e2e_stats_aggregation() {
        let registry = Arc::new(MemoryRegistry::with_seed(["A", "B", "C", "D"]));
        let transport = Arc::new(ChannelTransport::new(8));
        let _receivers: Vec<_> = ["A", "B", "C"].iter().map(|id| transport.attach(*id)).collect();
        let dispatcher = FanoutDispatcher::new(
            DispatcherConfig::default(),
            Arc::clone(&registry),
            Arc::clone(&transport),
        )
        .unwrap();

        let mut aggregator = observability::BroadcastStatsAggregator::new();
        let snapshot = registry::SnapshotReader::new(Arc::clone(&registry))
            .snapshot()
            .await
            .unwrap();
        for sender in ["A", "B"] {
            let started = std::time::Instant::now();
            let result = dispatcher
                .broadcast(&Message::new(sender, "x"), &snapshot)
                .await;
            aggregator.update(&result, started.elapsed());
        }
        dispatcher.drain_cleanup().await;

        let summary = aggregator.summary();
        assert_eq!(summary.total_broadcasts, 2);
        assert_eq!(summary.delivered, 4);
        assert_eq!(summary.stale, 2);
        assert_eq!(dispatcher.metrics().snapshot().cleanup_ok + dispatcher.metrics().snapshot().cleanup_failed, 2);
    }
}
