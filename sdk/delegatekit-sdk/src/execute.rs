use crate::core::clock::Clock;
use crate::core::connection::{ChainConnection, ChainError, TransactionReceipt};
use crate::core::payload::{CallMode, CallPayload, SignedPayload};
use crate::core::signer::{CallSummary, ConfirmationGate, DelegationSigner};
use crate::error::{DelegateKitError, Result};
use crate::events::{NotificationBus, NotificationEvent};
use crate::store::GrantStore;
use crate::utils::{retry_with_backoff, CancelToken, RetryPolicy};
use delegatekit_state::{caveat, Address, Delegation, ExecutionContext, TokenKind, VerifyStatus};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Which credential authorizes an execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionCredential {
    /// The sender's own signer.
    None,
    /// A delegation held by the caller.
    Delegation(Uuid),
    /// An ephemeral session key.
    SessionKey(Uuid),
}

/// An authorized call to dispatch. Ephemeral, never persisted.
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    pub sender: Address,
    pub target: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub credential: ExecutionCredential,
}

impl ExecutionRequest {
    pub fn transfer(sender: Address, target: Address, value: u128) -> Self {
        Self {
            sender,
            target,
            value,
            data: Vec::new(),
            credential: ExecutionCredential::None,
        }
    }

    pub fn call(sender: Address, target: Address, value: u128, data: Vec<u8>) -> Self {
        Self {
            sender,
            target,
            value,
            data,
            credential: ExecutionCredential::None,
        }
    }

    pub fn via_delegation(mut self, delegation_id: Uuid) -> Self {
        self.credential = ExecutionCredential::Delegation(delegation_id);
        self
    }

    pub fn via_session_key(mut self, session_key_id: Uuid) -> Self {
        self.credential = ExecutionCredential::SessionKey(session_key_id);
        self
    }
}

/// Per-call knobs for the pipeline.
#[derive(Clone, Debug)]
pub struct ExecuteOptions {
    /// Confirmations to await before the receipt is considered final.
    pub confirmations: u32,
    /// How long to await the receipt before reporting the ambiguous
    /// `ConfirmationTimeout` outcome.
    pub receipt_timeout: Duration,
    pub retry: RetryPolicy,
    pub cancel: Option<CancelToken>,
    /// Token the transfer is denominated in, for the balance preflight.
    pub token: TokenKind,
    /// Same-day executions already performed under the delegation.
    /// Bookkeeping is the caller's responsibility.
    pub executed_today: u32,
    /// Permission this execution settles, for event correlation.
    pub permission_id: Option<Uuid>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            receipt_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            cancel: None,
            token: TokenKind::Native,
            executed_today: 0,
            permission_id: None,
        }
    }
}

impl ExecuteOptions {
    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_token(mut self, token: TokenKind) -> Self {
        self.token = token;
        self
    }

    pub fn with_executed_today(mut self, count: u32) -> Self {
        self.executed_today = count;
        self
    }

    pub fn for_permission(mut self, permission_id: Uuid) -> Self {
        self.permission_id = Some(permission_id);
        self
    }
}

/// Dispatches authorized calls through the account-abstraction substrate.
///
/// Ordering is the security boundary and is never reordered: credential
/// gate and caveat evaluation, then balance preflight, then payload
/// construction, then dispatch, then receipt.
#[derive(Clone)]
pub struct ExecutionPipeline {
    connection: Arc<dyn ChainConnection>,
    store: Arc<dyn GrantStore>,
    bus: Arc<NotificationBus>,
    signer: Arc<dyn DelegationSigner>,
    clock: Arc<dyn Clock>,
    gate: Option<Arc<dyn ConfirmationGate>>,
}

impl ExecutionPipeline {
    pub fn new(
        connection: Arc<dyn ChainConnection>,
        store: Arc<dyn GrantStore>,
        bus: Arc<NotificationBus>,
        signer: Arc<dyn DelegationSigner>,
        clock: Arc<dyn Clock>,
        gate: Option<Arc<dyn ConfirmationGate>>,
    ) -> Self {
        Self {
            connection,
            store,
            bus,
            signer,
            clock,
            gate,
        }
    }

    /// Execute a request. A `PaymentSuccess` or `PaymentFailure` event is
    /// published regardless of outcome, so observers learn of failures even
    /// when the caller swallows the error.
    pub async fn execute(
        &self,
        request: ExecutionRequest,
        options: ExecuteOptions,
    ) -> Result<TransactionReceipt> {
        let delegation_id = self.delegation_hint(&request.credential);
        let permission_id = options.permission_id;
        let value = request.value;

        match self.execute_inner(&request, &options).await {
            Ok(receipt) => {
                tracing::info!(hash = %receipt.hash, "execution confirmed");
                self.bus.publish(NotificationEvent::PaymentSuccess {
                    delegation_id,
                    permission_id,
                    tx_hash: receipt.hash,
                    value,
                });
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(%err, "execution failed");
                self.bus.publish(NotificationEvent::PaymentFailure {
                    delegation_id,
                    permission_id,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn execute_inner(
        &self,
        request: &ExecutionRequest,
        options: &ExecuteOptions,
    ) -> Result<TransactionReceipt> {
        let now = self.clock.now();

        // Step 1: credential gate and caveat evaluation. Semantic failures
        // abort here, before any network call.
        let (mode, session_signature) = match request.credential {
            ExecutionCredential::None => (CallMode::Direct, None),
            ExecutionCredential::Delegation(id) => {
                let delegation = self.gate_delegation(id, request, options, now).await?;
                (
                    CallMode::ViaDelegation {
                        delegation_id: *delegation.id.as_bytes(),
                        delegate: delegation.delegate,
                    },
                    None,
                )
            }
            ExecutionCredential::SessionKey(id) => {
                let key = self
                    .store
                    .session_key(&id)?
                    .ok_or(DelegateKitError::CredentialNotFound(id))?;
                if key.revoked {
                    return Err(DelegateKitError::CredentialRevoked(id));
                }
                if key.is_expired(now) {
                    return Err(DelegateKitError::CredentialExpired(id));
                }
                // A scoped key never widens the authority of its grant.
                if let Some(delegation_id) = key.delegation_id {
                    self.gate_delegation(delegation_id, request, options, now)
                        .await?;
                }
                (
                    CallMode::ViaSessionKey {
                        session_public_key: key.public_key_bytes(),
                    },
                    Some(key),
                )
            }
        };

        // Step 2: balance preflight. Advisory (a race with concurrent
        // spends is possible) but saves a doomed network round-trip.
        if request.value > 0 {
            let balance = self
                .connection
                .read_balance(&request.sender, &options.token)
                .await
                .map_err(map_chain_error)?;
            if balance < request.value {
                return Err(DelegateKitError::InsufficientFunds {
                    required: request.value,
                    available: balance,
                });
            }
        }

        // Step 3: construct and sign the call payload.
        let payload = CallPayload {
            mode,
            sender: request.sender,
            target: request.target,
            value: request.value,
            data: request.data.clone(),
        };
        let payload_bytes = payload
            .to_bytes()
            .map_err(|e| DelegateKitError::TransactionFailed(e.to_string()))?;
        let signature = match &session_signature {
            Some(key) => key.sign(&payload_bytes),
            None => self
                .signer
                .sign_message(&payload_bytes)
                .await
                .map_err(DelegateKitError::SigningFailed)?,
        };

        let _gas = self
            .connection
            .estimate_gas(&payload)
            .await
            .map_err(map_chain_error)?;

        let signed = SignedPayload { payload, signature };

        // Step 4: dispatch, retrying only transient network failures.
        let connection = Arc::clone(&self.connection);
        let handle = retry_with_backoff(&options.retry, options.cancel.as_ref(), {
            let signed = signed.clone();
            move || {
                let connection = Arc::clone(&connection);
                let signed = signed.clone();
                async move {
                    connection
                        .send_transaction(&signed)
                        .await
                        .map_err(map_chain_error)
                }
            }
        })
        .await
        .map_err(|err| match err {
            DelegateKitError::NetworkUnavailable(reason) => DelegateKitError::TransactionFailed(
                format!(
                    "submission failed after {} attempts: {reason}",
                    options.retry.max_attempts
                ),
            ),
            other => other,
        })?;
        tracing::debug!(hash = %handle.hash, "transaction submitted");

        // Step 5: await the receipt. A timeout is ambiguous (the
        // transaction may still land) and is surfaced as such.
        match self
            .connection
            .wait_for_receipt(&handle, options.confirmations, options.receipt_timeout)
            .await
        {
            Ok(receipt) if receipt.success => Ok(receipt),
            Ok(receipt) => Err(DelegateKitError::TransactionFailed(format!(
                "transaction {} reverted",
                receipt.hash
            ))),
            Err(ChainError::Timeout) => Err(DelegateKitError::ConfirmationTimeout(handle.hash)),
            Err(err) => Err(map_chain_error(err)),
        }
    }

    /// Verify a delegation is usable and evaluate its caveats against the
    /// request. The confirmation gate is consulted only when a caveat
    /// demands it, synchronously, before dispatch.
    async fn gate_delegation(
        &self,
        id: Uuid,
        request: &ExecutionRequest,
        options: &ExecuteOptions,
        now: i64,
    ) -> Result<Delegation> {
        let delegation = self
            .store
            .delegation(&id)?
            .ok_or(DelegateKitError::DelegationNotFound(id))?;

        match delegation.verify_at(now) {
            VerifyStatus::Active => {}
            VerifyStatus::Revoked | VerifyStatus::Expired => {
                return Err(DelegateKitError::DelegationRevokedOrExpired(id))
            }
            VerifyStatus::NotFound => return Err(DelegateKitError::DelegationNotFound(id)),
        }

        let confirmed = if delegation.needs_confirmation() {
            let summary = CallSummary {
                sender: request.sender,
                target: request.target,
                value: request.value,
                delegation_id: Some(id),
            };
            match &self.gate {
                Some(gate) => gate.confirm(&summary).await,
                None => false,
            }
        } else {
            false
        };

        let context = ExecutionContext {
            value: request.value,
            target: request.target,
            now,
            executed_today: options.executed_today,
            confirmed,
        };
        caveat::evaluate(&delegation.caveats, &context)
            .map_err(DelegateKitError::CaveatViolation)?;

        Ok(delegation)
    }

    fn delegation_hint(&self, credential: &ExecutionCredential) -> Option<Uuid> {
        match credential {
            ExecutionCredential::None => None,
            ExecutionCredential::Delegation(id) => Some(*id),
            ExecutionCredential::SessionKey(id) => self
                .store
                .session_key(id)
                .ok()
                .flatten()
                .and_then(|key| key.delegation_id),
        }
    }
}

fn map_chain_error(err: ChainError) -> DelegateKitError {
    match err {
        ChainError::Network(reason) => DelegateKitError::NetworkUnavailable(reason),
        ChainError::Rejected(reason) => DelegateKitError::TransactionFailed(reason),
        ChainError::Timeout => DelegateKitError::NetworkUnavailable("timed out".to_string()),
    }
}
