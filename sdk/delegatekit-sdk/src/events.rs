use crate::core::connection::TxHash;
use delegatekit_state::Address;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Discriminant for event subscription filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    DelegationCreated,
    DelegationFailed,
    DelegationRevoked,
    SessionKeyCreated,
    SessionKeyRevoked,
    PasskeyRegistered,
    PasskeyRevoked,
    PermissionGranted,
    PermissionCancelled,
    PaymentSuccess,
    PaymentFailure,
}

/// Typed event payloads published by the managers and the pipeline.
#[derive(Clone, Debug, Serialize)]
pub enum NotificationEvent {
    DelegationCreated {
        delegation_id: Uuid,
        delegator: Address,
        delegate: Address,
    },
    DelegationFailed {
        delegation_id: Uuid,
        reason: String,
    },
    DelegationRevoked {
        delegation_id: Uuid,
    },
    SessionKeyCreated {
        session_key_id: Uuid,
        expires_at: i64,
    },
    SessionKeyRevoked {
        session_key_id: Uuid,
    },
    PasskeyRegistered {
        passkey_id: Uuid,
    },
    PasskeyRevoked {
        passkey_id: Uuid,
    },
    PermissionGranted {
        permission_id: Uuid,
        delegation_id: Uuid,
    },
    PermissionCancelled {
        permission_id: Uuid,
    },
    PaymentSuccess {
        delegation_id: Option<Uuid>,
        permission_id: Option<Uuid>,
        tx_hash: TxHash,
        value: u128,
    },
    PaymentFailure {
        delegation_id: Option<Uuid>,
        permission_id: Option<Uuid>,
        reason: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::DelegationCreated { .. } => NotificationKind::DelegationCreated,
            NotificationEvent::DelegationFailed { .. } => NotificationKind::DelegationFailed,
            NotificationEvent::DelegationRevoked { .. } => NotificationKind::DelegationRevoked,
            NotificationEvent::SessionKeyCreated { .. } => NotificationKind::SessionKeyCreated,
            NotificationEvent::SessionKeyRevoked { .. } => NotificationKind::SessionKeyRevoked,
            NotificationEvent::PasskeyRegistered { .. } => NotificationKind::PasskeyRegistered,
            NotificationEvent::PasskeyRevoked { .. } => NotificationKind::PasskeyRevoked,
            NotificationEvent::PermissionGranted { .. } => NotificationKind::PermissionGranted,
            NotificationEvent::PermissionCancelled { .. } => NotificationKind::PermissionCancelled,
            NotificationEvent::PaymentSuccess { .. } => NotificationKind::PaymentSuccess,
            NotificationEvent::PaymentFailure { .. } => NotificationKind::PaymentFailure,
        }
    }
}

/// Fire-and-forget, multi-subscriber event channel. Publishing never blocks
/// the pipeline; subscribers that lag or disappear are ignored.
pub struct NotificationBus {
    tx: broadcast::Sender<NotificationEvent>,
}

impl NotificationBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: NotificationEvent) {
        tracing::debug!(kind = ?event.kind(), "publishing notification");
        // Best effort: an error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    /// Spawn a handler for one notification kind. The handler runs on its
    /// own task and never back-pressures publishers.
    pub fn on<F>(&self, kind: NotificationKind, handler: F) -> JoinHandle<()>
    where
        F: Fn(NotificationEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.kind() == kind => handler(event),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "notification subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
