//! One-stop assembly of the RPC core for a single service process.

use crate::client::RpcClient;
use crate::config::{RpcConfig, ServiceIdentity};
use crate::dispatcher::ReplyDispatcher;
use crate::pending::{self, PendingCallStore};
use crate::registrar::declare_topology;
use crate::server::{RequestHandler, RpcServerAdapter};
use parking_lot::Mutex;
use relay_broker::{BrokerTransport, TransportError};
use relay_types::ExchangeDefinition;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// A running RPC node: declared topology, reply dispatcher, pending-call
/// sweeper, and any number of server adapters, wired to one transport.
///
/// Dropping the node aborts its background tasks.
pub struct RpcNode {
    transport: Arc<dyn BrokerTransport>,
    identity: ServiceIdentity,
    client: RpcClient,
    pending: Arc<PendingCallStore>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RpcNode {
    /// Declare `topology`, attach the reply dispatcher to the identity's
    /// reply queue, and start the sweeper.
    pub async fn start(
        transport: Arc<dyn BrokerTransport>,
        identity: ServiceIdentity,
        topology: &[ExchangeDefinition],
        config: RpcConfig,
    ) -> Result<Self, TransportError> {
        declare_topology(transport.as_ref(), topology).await?;

        let pending = Arc::new(PendingCallStore::new(config.default_timeout));
        let consumer = transport.consume(&identity.reply_queue).await?;
        let dispatcher = ReplyDispatcher::new(consumer, pending.clone());

        let tasks = vec![
            tokio::spawn(dispatcher.run()),
            tokio::spawn(pending::sweeper_task(pending.clone(), config.sweep_interval)),
        ];

        let client = RpcClient::new(
            transport.clone(),
            identity.clone(),
            pending.clone(),
            config,
        );
        info!(service = %identity.service_name, reply_queue = %identity.reply_queue, "RPC node started");

        Ok(Self {
            transport,
            identity,
            client,
            pending,
            tasks: Mutex::new(tasks),
        })
    }

    /// Attach `handler` as the consumer of `queue` and start serving it.
    pub async fn serve(
        &self,
        queue: &str,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), TransportError> {
        let consumer = self.transport.consume(queue).await?;
        let adapter = RpcServerAdapter::new(
            self.transport.clone(),
            self.identity.service_name.clone(),
            handler,
            consumer,
        );
        self.tasks.lock().push(tokio::spawn(adapter.run()));
        Ok(())
    }

    /// The calling surface of this node.
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Calls issued by this node still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }
}

impl Drop for RpcNode {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}
