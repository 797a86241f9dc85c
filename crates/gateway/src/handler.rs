//! Gateway - routes inbound events to the registry and dispatcher

use std::sync::Arc;

use contracts::{ConnectionRecord, ConnectionRegistry, MessageTransport};
use dispatcher::{BroadcastResult, CancellationToken, FanoutDispatcher};
use registry::SnapshotReader;
use tracing::{debug, error, info, instrument, warn};

use crate::error::GatewayError;
use crate::event::{decode_message, InboundEvent, Route};
use crate::response::{GatewayResponse, StatusCode};

/// Event handler for one gateway deployment
pub struct Gateway<R, T> {
    registry: Arc<R>,
    reader: SnapshotReader<R>,
    dispatcher: FanoutDispatcher<R, T>,
}

impl<R, T> Gateway<R, T>
where
    R: ConnectionRegistry + 'static,
    T: MessageTransport + 'static,
{
    /// `dispatcher` must have been built over the same `registry`
    pub fn new(registry: Arc<R>, dispatcher: FanoutDispatcher<R, T>) -> Self {
        Self {
            reader: SnapshotReader::new(Arc::clone(&registry)),
            registry,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &FanoutDispatcher<R, T> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Handle one event; never fails, errors become status codes
    pub async fn handle(&self, event: &InboundEvent) -> GatewayResponse {
        self.handle_with_cancel(event, CancellationToken::new()).await
    }

    /// Handle one event, stopping a running broadcast when `cancel` fires
    #[instrument(
        name = "gateway_handle",
        skip_all,
        fields(
            route = %event.request_context.route_key,
            connection = %event.connection_id(),
        )
    )]
    pub async fn handle_with_cancel(
        &self,
        event: &InboundEvent,
        cancel: CancellationToken,
    ) -> GatewayResponse {
        let handled = match event.route() {
            Route::Connect => self.connect(event).await,
            Route::Disconnect => self.disconnect(event).await,
            Route::SendMessage => self.send_message(event, cancel).await,
            Route::Other(route) => Err(GatewayError::UnknownRoute { route }),
        };

        match handled {
            Ok(response) => response,
            Err(err) => {
                if err.is_client_error() {
                    warn!(error = %err, "Request rejected");
                } else {
                    error!(error = %err, "Request failed");
                }
                GatewayResponse::from(&err)
            }
        }
    }

    async fn connect(&self, event: &InboundEvent) -> Result<GatewayResponse, GatewayError> {
        if event.connection_id().is_blank() {
            return Err(GatewayError::BlankConnectionId);
        }
        let mut record = ConnectionRecord::new(event.connection_id().clone());
        let ctx = &event.request_context;
        if let Some(domain) = &ctx.domain_name {
            record
                .attributes
                .insert("domainName".to_string(), domain.clone().into());
        }
        if let Some(stage) = &ctx.stage {
            record
                .attributes
                .insert("stage".to_string(), stage.clone().into());
        }

        self.registry.put(record).await?;
        info!("Connection registered");
        Ok(GatewayResponse::ok())
    }

    async fn disconnect(&self, event: &InboundEvent) -> Result<GatewayResponse, GatewayError> {
        self.registry.delete(event.connection_id()).await?;
        info!("Connection removed");
        Ok(GatewayResponse::ok())
    }

    /// Decode, snapshot, dispatch. The registry is not read for a bad payload.
    async fn send_message(
        &self,
        event: &InboundEvent,
        cancel: CancellationToken,
    ) -> Result<GatewayResponse, GatewayError> {
        let message = decode_message(event)?;
        debug!(bytes = message.len(), "Message decoded");

        let snapshot = self.reader.snapshot().await?;
        observability::record_snapshot_size(snapshot.len());

        let result: BroadcastResult = self
            .dispatcher
            .broadcast_with_cancel(&message, &snapshot, cancel)
            .await;

        let body = serde_json::to_string(&result.summary())?;
        Ok(GatewayResponse::with_body(StatusCode::OK, body))
    }
}
