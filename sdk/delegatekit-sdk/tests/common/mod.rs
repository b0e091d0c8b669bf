#![allow(dead_code)]

use async_trait::async_trait;
use delegatekit_sdk::state::{Address, TokenKind};
use delegatekit_sdk::{
    AssertionMaterial, Authenticator, CallPayload, CallSummary, ChainConnection, ChainError,
    ConfirmationGate, CredentialRequestOptions, DelegationSigner, GasEstimate, LocalSigner,
    ManualClock, PasskeyMaterial, SignedPayload, SmartAccount, SubmissionHandle,
    TransactionReceipt, TxHash,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

//=============================================================================
// Mock chain substrate
//=============================================================================

/// How the mock answers `wait_for_receipt`.
#[derive(Clone, Copy, Debug)]
pub enum ReceiptMode {
    Success,
    Revert,
    Timeout,
}

/// Scripted chain connection. Submissions are counted so tests can assert
/// exactly how many network attempts the pipeline made.
pub struct MockChain {
    balances: Mutex<HashMap<Address, u128>>,
    send_calls: AtomicU32,
    send_script: Mutex<VecDeque<ChainError>>,
    receipt_mode: Mutex<ReceiptMode>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            send_calls: AtomicU32::new(0),
            send_script: Mutex::new(VecDeque::new()),
            receipt_mode: Mutex::new(ReceiptMode::Success),
        }
    }

    pub fn fund(&self, account: Address, amount: u128) {
        self.balances.lock().unwrap().insert(account, amount);
    }

    /// Queue `n` transient network failures ahead of the next success.
    pub fn fail_next_sends(&self, n: usize) {
        let mut script = self.send_script.lock().unwrap();
        for _ in 0..n {
            script.push_back(ChainError::Network("connection refused".into()));
        }
    }

    /// Queue a permanent semantic rejection.
    pub fn reject_next_send(&self, reason: &str) {
        self.send_script
            .lock()
            .unwrap()
            .push_back(ChainError::Rejected(reason.into()));
    }

    pub fn set_receipt_mode(&self, mode: ReceiptMode) {
        *self.receipt_mode.lock().unwrap() = mode;
    }

    pub fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainConnection for MockChain {
    async fn estimate_gas(&self, _payload: &CallPayload) -> Result<GasEstimate, ChainError> {
        Ok(GasEstimate {
            gas_limit: 21_000,
            fee: 1,
        })
    }

    async fn send_transaction(
        &self,
        _payload: &SignedPayload,
    ) -> Result<SubmissionHandle, ChainError> {
        let n = self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.send_script.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut hash = [0u8; 32];
        hash[0] = n as u8;
        Ok(SubmissionHandle {
            hash: TxHash(hash),
        })
    }

    async fn wait_for_receipt(
        &self,
        handle: &SubmissionHandle,
        confirmations: u32,
        _timeout: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        match *self.receipt_mode.lock().unwrap() {
            ReceiptMode::Success => Ok(TransactionReceipt {
                hash: handle.hash,
                block_number: 1,
                confirmations,
                success: true,
            }),
            ReceiptMode::Revert => Ok(TransactionReceipt {
                hash: handle.hash,
                block_number: 1,
                confirmations,
                success: false,
            }),
            ReceiptMode::Timeout => Err(ChainError::Timeout),
        }
    }

    async fn read_balance(
        &self,
        account: &Address,
        _token: &TokenKind,
    ) -> Result<u128, ChainError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .unwrap_or(0))
    }
}

//=============================================================================
// Mock signer and authenticator
//=============================================================================

/// Signer whose user always declines.
pub struct DecliningSigner {
    pub address: Address,
}

#[async_trait]
impl DelegationSigner for DecliningSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, String> {
        Err("user declined".to_string())
    }
}

pub struct MockAuthenticator;

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn create_credential(
        &self,
        options: &CredentialRequestOptions,
    ) -> Result<PasskeyMaterial, String> {
        Ok(PasskeyMaterial {
            raw_credential_id: options.user_name.as_bytes().to_vec(),
            public_key: vec![4u8; 65],
        })
    }

    async fn get_credential(
        &self,
        options: &CredentialRequestOptions,
    ) -> Result<AssertionMaterial, String> {
        Ok(AssertionMaterial {
            raw_credential_id: options.user_name.as_bytes().to_vec(),
            signature: vec![1, 2, 3],
            authenticator_data: vec![0u8; 37],
            client_data_json: options.challenge.clone(),
        })
    }
}

pub struct AlwaysConfirm;

#[async_trait]
impl ConfirmationGate for AlwaysConfirm {
    async fn confirm(&self, _summary: &CallSummary) -> bool {
        true
    }
}

pub struct NeverConfirm;

#[async_trait]
impl ConfirmationGate for NeverConfirm {
    async fn confirm(&self, _summary: &CallSummary) -> bool {
        false
    }
}

//=============================================================================
// Test context
//=============================================================================

pub const T0: i64 = 1_700_000_000;

pub struct TestContext {
    pub chain: Arc<MockChain>,
    pub clock: Arc<ManualClock>,
    pub account: SmartAccount,
}

impl TestContext {
    pub fn owner(&self) -> Address {
        self.account.address()
    }
}

/// Standard wiring: funded owner account, manual clock at `T0`, mock chain,
/// mock authenticator, gate that always approves.
pub fn setup() -> TestContext {
    let chain = Arc::new(MockChain::new());
    let clock = Arc::new(ManualClock::new(T0));
    let owner = Address::from_low_byte(1);
    chain.fund(owner, 1_000_000);

    let account = SmartAccount::builder(
        Arc::clone(&chain) as Arc<dyn ChainConnection>,
        Arc::new(LocalSigner::random(owner)),
    )
    .with_clock(Arc::clone(&clock) as Arc<dyn delegatekit_sdk::Clock>)
    .with_authenticator(Arc::new(MockAuthenticator))
    .with_confirmation_gate(Arc::new(AlwaysConfirm))
    .build();

    TestContext {
        chain,
        clock,
        account,
    }
}
