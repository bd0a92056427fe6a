//! Abstraction over injected wallet providers (EIP-1193 `window.ethereum`,
//! or the in-memory mock used by tests and the CLI).

use std::fmt;

use futures::channel::mpsc::UnboundedReceiver;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 "user rejected the request" error code.
pub const USER_REJECTED: i64 = 4001;

/// Errors reported by a wallet provider.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("request rejected ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("provider error: {0}")]
    Rpc(String),
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
    #[error("wallet returned no accounts")]
    NoAccounts,
}

impl ProviderError {
    pub fn user_rejected(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code == USER_REJECTED)
    }
}

/// Notification pushed by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    /// Raw chain id as delivered by the provider (usually hex).
    ChainChanged(String),
}

/// Stream of provider notifications, in arrival order.
pub type ProviderEvents = UnboundedReceiver<ProviderEvent>;

/// Result of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
    pub block_number: Option<u64>,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
}

/// Listener registration. Dropping the handle (or calling
/// [`Subscription::unsubscribe`]) removes the listeners from the provider.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// Capability surface of an injected wallet.
///
/// All calls are single-threaded and may suspend until the user answers a
/// wallet prompt; none of them time out.
#[allow(async_fn_in_trait)]
pub trait WalletProvider {
    /// Prompt the user for account access (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Accounts already authorised for this origin, without prompting
    /// (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Current chain id as a hex string (`eth_chainId`).
    async fn chain_id(&self) -> Result<String, ProviderError>;

    /// Native balance of `address` in wei.
    async fn balance(&self, address: &str) -> Result<u128, ProviderError>;

    /// Sign and broadcast a native transfer. Returns the transaction hash.
    async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        value_wei: u128,
    ) -> Result<String, ProviderError>;

    /// Wait until the transaction is mined.
    async fn wait_for_receipt(&self, hash: &str) -> Result<TxReceipt, ProviderError>;

    /// Register for `accountsChanged` / `chainChanged` notifications.
    fn subscribe(&self) -> Result<(Subscription, ProviderEvents), ProviderError>;

    /// Human-readable provider name (e.g. "MetaMask", "mock").
    fn provider_name(&self) -> &str;
}
