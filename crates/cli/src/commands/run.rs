//! `run` command implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{
    ConnectionRecord, ConnectionRegistry, GatewayConfig, RecipientId, RegistryBackend,
};
use dispatcher::{CancellationToken, DispatcherConfig, FanoutDispatcher};
use gateway::{Gateway, GatewayResponse, InboundEvent, Route, StatusCode};
use registry::{FileRegistry, MemoryRegistry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use transport::ChannelTransport;

use super::load_config;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::stats::RunStats;

/// Execute the `run` command
pub async fn run_gateway(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    let mut config = load_config(&args.config)?;

    if let Some(max_concurrency) = args.max_concurrency {
        info!(max_concurrency, "Overriding max_concurrency from CLI");
        config.dispatcher.max_concurrency = max_concurrency;
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    info!(
        name = %config.gateway.name,
        stage = %config.gateway.stage,
        max_concurrency = config.dispatcher.max_concurrency,
        cleanup = ?config.dispatcher.cleanup,
        backend = ?config.registry.backend,
        "Configuration loaded"
    );

    match config.registry.backend {
        RegistryBackend::Memory => {
            let registry = Arc::new(MemoryRegistry::with_seed(
                config.registry.seed.iter().map(String::as_str),
            ));
            serve(&config, registry, args).await
        }
        RegistryBackend::File => {
            let path = config
                .registry
                .path
                .clone()
                .ok_or(CliError::MissingRegistryPath)?;
            let registry = Arc::new(FileRegistry::new(path));
            for id in &config.registry.seed {
                registry
                    .put(ConnectionRecord::new(id.as_str()))
                    .await
                    .with_context(|| format!("Failed to seed connection '{id}'"))?;
            }
            serve(&config, registry, args).await
        }
    }
}

async fn serve<R>(config: &GatewayConfig, registry: Arc<R>, args: &RunArgs) -> Result<()>
where
    R: ConnectionRegistry + 'static,
{
    let transport = Arc::new(ChannelTransport::new(config.transport.queue_capacity));
    let dispatcher = FanoutDispatcher::new(
        DispatcherConfig::from(&config.dispatcher),
        Arc::clone(&registry),
        Arc::clone(&transport),
    )?;
    let gateway = Gateway::new(Arc::clone(&registry), dispatcher);

    let mut peers = Peers::new(Arc::clone(&transport));
    let registered = registry
        .list()
        .await
        .context("Failed to list registered connections")?;
    for id in registered {
        peers.attach(id);
    }
    for id in &args.disconnected {
        if !peers.close(id).await {
            warn!(connection = %id, "--disconnected names an unregistered connection");
        }
    }

    let shutdown = CancellationToken::new();
    let signal = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_shutdown().await;
            warn!("Received shutdown signal, stopping...");
            shutdown.cancel();
        }
    });

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.events {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open events file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();

    let started = Instant::now();
    let mut stats = RunStats::default();
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read events")?,
        };
        let Some(line) = line else { break };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let event: InboundEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                let err = CliError::invalid_event(line_no, e.to_string());
                warn!(error = %err, "Skipping line");
                stats.record_rejected();
                emit(&GatewayResponse::with_body(StatusCode::BAD_REQUEST, err.to_string()))?;
                continue;
            }
        };

        let route = event.route();
        let handled_at = Instant::now();
        let response = gateway
            .handle_with_cancel(&event, shutdown.child_token())
            .await;
        stats.record(&route, &response, handled_at.elapsed());

        if response.is_success() {
            match route {
                Route::Connect => peers.attach(event.connection_id().clone()),
                Route::Disconnect => peers.detach(event.connection_id()).await,
                _ => {}
            }
        }
        emit(&response)?;
    }

    signal.abort();
    gateway.dispatcher().drain_cleanup().await;

    stats.duration = started.elapsed();
    stats.dispatch = gateway.dispatcher().metrics().snapshot();
    stats.received = peers.shutdown().await;

    info!(
        events = stats.events,
        rejected = stats.rejected,
        duration_secs = stats.duration.as_secs_f64(),
        "Gateway run finished"
    );
    stats.print_summary();

    Ok(())
}

fn emit(response: &GatewayResponse) -> Result<()> {
    let json = serde_json::to_string(response).context("Failed to serialize response")?;
    println!("{json}");
    Ok(())
}

/// Client ends of the in-process transport
///
/// Each attached connection gets a task that drains its queue; aborting the
/// task drops the receiver, which the transport then reports as gone.
struct Peers {
    transport: Arc<ChannelTransport>,
    consumers: HashMap<RecipientId, JoinHandle<()>>,
    received: Arc<AtomicU64>,
}

impl Peers {
    fn new(transport: Arc<ChannelTransport>) -> Self {
        Self {
            transport,
            consumers: HashMap::new(),
            received: Arc::new(AtomicU64::new(0)),
        }
    }

    fn attach(&mut self, id: RecipientId) {
        let mut rx = self.transport.attach(id.clone());
        let received = Arc::clone(&self.received);
        let conn = id.clone();
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                received.fetch_add(1, Ordering::Relaxed);
                debug!(connection = %conn, bytes = message.len(), "Message received");
            }
        });
        if let Some(previous) = self.consumers.insert(id, handle) {
            previous.abort();
        }
    }

    /// Close the client side only; the transport keeps the dead sender
    ///
    /// Returns once the receiver is dropped.
    async fn close(&mut self, id: &str) -> bool {
        let Some(handle) = self.consumers.remove(id) else {
            return false;
        };
        handle.abort();
        // Cancelled is the expected outcome here
        let _ = handle.await;
        true
    }

    /// Client disconnected cleanly
    async fn detach(&mut self, id: &RecipientId) {
        self.transport.detach(id);
        self.close(id).await;
    }

    /// Stop every consumer after its queue drains; returns messages received
    async fn shutdown(mut self) -> u64 {
        let ids: Vec<RecipientId> = self.consumers.keys().cloned().collect();
        for id in &ids {
            self.transport.detach(id);
        }
        for (id, handle) in self.consumers.drain() {
            if let Err(e) = handle.await {
                debug!(connection = %id, error = %e, "Consumer ended abnormally");
            }
        }
        self.received.load(Ordering::Relaxed)
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
