use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use registry::MockRegistry;
use transport::{MockTransport, MockTransportConfig};

use crate::{DeliveryStatus, DispatcherConfig, FanoutDispatcher, Message, RegistrySnapshot};

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// =========================================================================
// Property-Based Tests - Fan-out
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn given_any_snapshot_when_broadcast_then_every_other_recipient_has_one_outcome(
        ids in prop::collection::hash_set("[a-z]{1,6}", 0..24),
        sender_index in any::<prop::sample::Index>(),
        max_concurrency in 1usize..8,
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let sender = if ids.is_empty() {
            "outsider".to_string()
        } else {
            ids[sender_index.index(ids.len())].clone()
        };

        let result = run(async {
            let registry = Arc::new(MockRegistry::new(ids.iter().map(String::as_str)));
            let transport = Arc::new(MockTransport::new());
            let config = DispatcherConfig { max_concurrency, ..Default::default() };
            let dispatcher = FanoutDispatcher::new(config, registry, Arc::clone(&transport)).unwrap();
            let snapshot: RegistrySnapshot = ids.iter().map(String::as_str).collect();
            let result = dispatcher.broadcast(&Message::new(sender.as_str(), "x"), &snapshot).await;
            (result, transport.peak_in_flight())
        });
        let (result, peak) = result;

        let expected: HashSet<&str> = ids.iter().map(String::as_str).filter(|id| *id != sender).collect();
        let seen: HashSet<&str> = result.outcomes().iter().map(|o| o.recipient.as_str()).collect();

        prop_assert_eq!(result.len(), expected.len());
        prop_assert_eq!(seen, expected);
        prop_assert!(result.get(&sender).is_none());
        prop_assert!(peak <= max_concurrency);
    }

    #[test]
    fn given_gone_recipients_when_broadcast_then_only_they_are_stale(
        ids in prop::collection::hash_set("[a-z]{1,6}", 1..16),
        gone_mask in prop::collection::vec(any::<bool>(), 16),
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let gone: Vec<String> = ids
            .iter()
            .zip(&gone_mask)
            .filter(|(_, g)| **g)
            .map(|(id, _)| id.clone())
            .collect();

        let (result, deletes) = run(async {
            let registry = Arc::new(MockRegistry::new(ids.iter().map(String::as_str)));
            let transport = Arc::new(MockTransport::with_config(MockTransportConfig {
                gone: gone.clone(),
                ..Default::default()
            }));
            let dispatcher = FanoutDispatcher::new(
                DispatcherConfig::default(),
                Arc::clone(&registry),
                transport,
            )
            .unwrap();
            let snapshot: RegistrySnapshot = ids.iter().map(String::as_str).collect();
            let result = dispatcher.broadcast(&Message::new("outsider", "x"), &snapshot).await;
            dispatcher.drain_cleanup().await;
            (result, registry.delete_calls())
        });

        prop_assert_eq!(result.stale(), gone.len());
        prop_assert_eq!(result.delivered(), ids.len() - gone.len());
        prop_assert_eq!(deletes.len(), gone.len());
        for id in &gone {
            prop_assert_eq!(result.get(id).map(|o| o.status), Some(DeliveryStatus::StaleRecipient));
        }
    }
}
