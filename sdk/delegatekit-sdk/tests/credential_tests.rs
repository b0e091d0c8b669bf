mod common;

use common::{setup, MockChain, T0};
use delegatekit_sdk::state::{Address, CaveatError, SessionKey};
use delegatekit_sdk::{
    ChainConnection, CredentialRequestOptions, DelegateKitError, ExecuteOptions, ExecutionRequest,
    LocalSigner, ManualClock, SmartAccount,
};
use std::sync::Arc;

fn ceremony_options() -> CredentialRequestOptions {
    CredentialRequestOptions {
        relying_party: "wallet.example".to_string(),
        user_name: "alice".to_string(),
        challenge: vec![7u8; 32],
    }
}

//=============================================================================
// Session keys
//=============================================================================

#[tokio::test]
async fn session_key_defaults_to_thirty_days() -> anyhow::Result<()> {
    let ctx = setup();
    let key = ctx.account.create_session_key().build()?;
    assert_eq!(key.expires_at, T0 + SessionKey::DEFAULT_TTL_SECS);
    assert!(key.delegation_id.is_none());
    assert!(!key.revoked);
    Ok(())
}

#[tokio::test]
async fn scoped_key_must_not_outlive_its_delegation() -> anyhow::Result<()> {
    let ctx = setup();
    let delegation = ctx
        .account
        .create_delegation()
        .with_delegate(Address::from_low_byte(2))
        .with_ttl(3600)
        .build()
        .await?;

    let result = ctx
        .account
        .create_session_key()
        .scoped_to(delegation.id)
        .with_ttl(7200)
        .build();
    assert!(matches!(
        result,
        Err(DelegateKitError::InvalidCaveat(
            CaveatError::CredentialOutlivesDelegation { .. }
        ))
    ));

    let key = ctx
        .account
        .create_session_key()
        .scoped_to(delegation.id)
        .with_ttl(3600)
        .build()?;
    assert_eq!(key.delegation_id, Some(delegation.id));
    Ok(())
}

#[tokio::test]
async fn session_key_signs_executions() -> anyhow::Result<()> {
    let ctx = setup();
    let key = ctx.account.create_session_key().with_ttl(3600).build()?;

    let receipt = ctx
        .account
        .execute(
            ExecutionRequest::transfer(ctx.owner(), Address::from_low_byte(2), 10)
                .via_session_key(key.id),
            ExecuteOptions::default(),
        )
        .await?;
    assert!(receipt.success);
    Ok(())
}

#[tokio::test]
async fn scoped_key_inherits_delegation_bounds() -> anyhow::Result<()> {
    let ctx = setup();
    let delegation = ctx
        .account
        .create_delegation()
        .with_delegate(Address::from_low_byte(2))
        .with_ttl(3600)
        .build()
        .await?;
    let key = ctx
        .account
        .create_session_key()
        .scoped_to(delegation.id)
        .with_ttl(3600)
        .build()?;

    ctx.account.revoke_delegation(delegation.id).await?;

    let result = ctx
        .account
        .execute(
            ExecutionRequest::transfer(ctx.owner(), Address::from_low_byte(2), 10)
                .via_session_key(key.id),
            ExecuteOptions::default(),
        )
        .await;
    assert!(matches!(
        result,
        Err(DelegateKitError::DelegationRevokedOrExpired(id)) if id == delegation.id
    ));
    assert_eq!(ctx.chain.send_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn revoked_and_expired_keys_are_refused() -> anyhow::Result<()> {
    let ctx = setup();

    let key = ctx.account.create_session_key().with_ttl(3600).build()?;
    assert!(ctx.account.credentials().revoke_session_key(key.id)?);
    assert!(!ctx.account.credentials().revoke_session_key(key.id)?);
    let result = ctx
        .account
        .execute(
            ExecutionRequest::transfer(ctx.owner(), Address::from_low_byte(2), 10)
                .via_session_key(key.id),
            ExecuteOptions::default(),
        )
        .await;
    assert!(matches!(
        result,
        Err(DelegateKitError::CredentialRevoked(id)) if id == key.id
    ));

    let key = ctx.account.create_session_key().with_ttl(60).build()?;
    ctx.clock.advance(61);
    let result = ctx
        .account
        .execute(
            ExecutionRequest::transfer(ctx.owner(), Address::from_low_byte(2), 10)
                .via_session_key(key.id),
            ExecuteOptions::default(),
        )
        .await;
    assert!(matches!(
        result,
        Err(DelegateKitError::CredentialExpired(id)) if id == key.id
    ));

    assert_eq!(ctx.chain.send_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_session_key_is_not_found() -> anyhow::Result<()> {
    let ctx = setup();
    let missing = uuid::Uuid::new_v4();
    let result = ctx
        .account
        .execute(
            ExecutionRequest::transfer(ctx.owner(), Address::from_low_byte(2), 10)
                .via_session_key(missing),
            ExecuteOptions::default(),
        )
        .await;
    assert!(matches!(
        result,
        Err(DelegateKitError::CredentialNotFound(id)) if id == missing
    ));
    Ok(())
}

//=============================================================================
// Passkeys
//=============================================================================

#[tokio::test]
async fn passkey_registration_stores_public_material_only() -> anyhow::Result<()> {
    let ctx = setup();
    let passkey = ctx.account.register_passkey(ceremony_options()).await?;
    assert_eq!(passkey.raw_credential_id, b"alice".to_vec());
    assert!(!passkey.public_key.is_empty());
    assert!(!passkey.credential_id_b64().is_empty());

    let stored = ctx.account.credentials().passkey(passkey.id)?;
    assert!(stored.is_some());
    Ok(())
}

#[tokio::test]
async fn passkey_assertion_requires_live_credential() -> anyhow::Result<()> {
    let ctx = setup();
    let passkey = ctx.account.register_passkey(ceremony_options()).await?;

    let assertion = ctx
        .account
        .credentials()
        .assert_passkey(passkey.id, ceremony_options())
        .await?;
    assert_eq!(assertion.client_data_json, vec![7u8; 32]);

    assert!(ctx.account.credentials().revoke_passkey(passkey.id)?);
    assert!(!ctx.account.credentials().revoke_passkey(passkey.id)?);
    let result = ctx
        .account
        .credentials()
        .assert_passkey(passkey.id, ceremony_options())
        .await;
    assert!(matches!(
        result,
        Err(DelegateKitError::CredentialRevoked(id)) if id == passkey.id
    ));
    Ok(())
}

#[tokio::test]
async fn registration_without_authenticator_fails() -> anyhow::Result<()> {
    let chain = Arc::new(MockChain::new());
    let account = SmartAccount::builder(
        chain as Arc<dyn ChainConnection>,
        Arc::new(LocalSigner::random(Address::from_low_byte(1))),
    )
    .with_clock(Arc::new(ManualClock::new(T0)))
    .build();

    let result = account.register_passkey(ceremony_options()).await;
    assert!(matches!(result, Err(DelegateKitError::AgentActionFailed(_))));
    Ok(())
}
