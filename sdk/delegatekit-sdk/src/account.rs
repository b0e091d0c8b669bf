use crate::core::clock::{Clock, SystemClock};
use crate::core::connection::{ChainConnection, TransactionReceipt};
use crate::core::signer::{Authenticator, ConfirmationGate, CredentialRequestOptions, DelegationSigner};
use crate::credential::{CredentialManager, SessionKeyBuilder};
use crate::delegation::{CreateDelegationBuilder, DelegationManager};
use crate::error::Result;
use crate::events::{NotificationBus, NotificationEvent, NotificationKind};
use crate::execute::{ExecuteOptions, ExecutionPipeline, ExecutionRequest};
use crate::permission::{PermissionDetails, PermissionService};
use crate::store::{GrantStore, InMemoryStore};
use delegatekit_state::{Address, Passkey, TokenKind, VerifyStatus};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Entry point tying the managers together over one store, one bus and one
/// chain connection. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SmartAccount {
    address: Address,
    delegations: DelegationManager,
    credentials: CredentialManager,
    permissions: PermissionService,
    pipeline: ExecutionPipeline,
    bus: Arc<NotificationBus>,
}

impl SmartAccount {
    pub fn builder(
        connection: Arc<dyn ChainConnection>,
        signer: Arc<dyn DelegationSigner>,
    ) -> SmartAccountBuilder {
        SmartAccountBuilder::new(connection, signer)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn create_delegation(&self) -> CreateDelegationBuilder<'_> {
        self.delegations.create_delegation()
    }

    pub async fn revoke_delegation(&self, id: Uuid) -> Result<bool> {
        self.delegations.revoke(id).await
    }

    pub fn verify_delegation(&self, id: Uuid) -> Result<VerifyStatus> {
        self.delegations.verify(id)
    }

    pub async fn request_permission(
        &self,
        amount: u128,
        frequency: &str,
        token: TokenKind,
        recipient: Address,
    ) -> Result<Uuid> {
        self.permissions
            .request_permission(amount, frequency, token, recipient)
            .await
    }

    pub async fn cancel_permission(&self, id: Uuid) -> Result<bool> {
        self.permissions.cancel(id).await
    }

    pub fn permission_details(&self, id: Uuid) -> Result<PermissionDetails> {
        self.permissions.details(id)
    }

    pub fn create_session_key(&self) -> SessionKeyBuilder<'_> {
        self.credentials.create_session_key()
    }

    pub async fn register_passkey(&self, options: CredentialRequestOptions) -> Result<Passkey> {
        self.credentials.register_passkey(options).await
    }

    pub async fn execute(
        &self,
        request: ExecutionRequest,
        options: ExecuteOptions,
    ) -> Result<TransactionReceipt> {
        self.pipeline.execute(request, options).await
    }

    /// Raw event stream; every published event, unfiltered.
    pub fn events(&self) -> broadcast::Receiver<NotificationEvent> {
        self.bus.subscribe()
    }

    /// Spawn a handler for one event kind. Runs until the bus closes.
    pub fn on<F>(&self, kind: NotificationKind, handler: F) -> JoinHandle<()>
    where
        F: Fn(NotificationEvent) + Send + 'static,
    {
        self.bus.on(kind, handler)
    }

    pub fn delegations(&self) -> &DelegationManager {
        &self.delegations
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }
}

/// Builder wiring the account's collaborators. Connection and signer are
/// mandatory; everything else has a working default.
pub struct SmartAccountBuilder {
    connection: Arc<dyn ChainConnection>,
    signer: Arc<dyn DelegationSigner>,
    store: Option<Arc<dyn GrantStore>>,
    clock: Option<Arc<dyn Clock>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    gate: Option<Arc<dyn ConfirmationGate>>,
}

impl SmartAccountBuilder {
    pub fn new(connection: Arc<dyn ChainConnection>, signer: Arc<dyn DelegationSigner>) -> Self {
        Self {
            connection,
            signer,
            store: None,
            clock: None,
            authenticator: None,
            gate: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn GrantStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_confirmation_gate(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> SmartAccount {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let bus = Arc::new(NotificationBus::default());

        let delegations = DelegationManager::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&self.signer),
            Arc::clone(&clock),
        );
        let credentials = CredentialManager::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&clock),
            self.authenticator,
        );
        let permissions = PermissionService::new(
            delegations.clone(),
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&clock),
        );
        let pipeline = ExecutionPipeline::new(
            Arc::clone(&self.connection),
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&self.signer),
            Arc::clone(&clock),
            self.gate,
        );

        SmartAccount {
            address: self.signer.address(),
            delegations,
            credentials,
            permissions,
            pipeline,
            bus,
        }
    }
}
