//! Transfer submission: on-chain native transfers through the wallet, and
//! the simulated bank-to-crypto transfer.

use std::rc::Rc;

use tracing::{info, warn};

use crate::amount::{format_ether, parse_ether};
use crate::config::WalletConfig;
use crate::error::{SessionError, TransferError};
use crate::ledger::Ledger;
use crate::network::native_currency;
use crate::provider::WalletProvider;
use crate::session::WalletSession;
use crate::store::KeyValueStore;
use crate::timer::Timer;
use crate::transaction::{TransactionKind, TransactionRecord, TransactionStatus};

pub const WALLET_TRANSFER_SENT: &str = "Transaction sent successfully!";
pub const BANK_TRANSFER_COMPLETED: &str = "Bank transfer completed successfully!";

/// Status line shown after a successful submission.
pub fn success_message(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::BankTransfer => BANK_TRANSFER_COMPLETED,
        _ => WALLET_TRANSFER_SENT,
    }
}

/// Validated transfer form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: String,
    /// Canonical decimal amount in display units.
    pub amount: String,
    pub value_wei: u128,
    pub description: Option<String>,
}

impl TransferRequest {
    pub fn parse(to: &str, amount: &str, description: &str) -> Result<Self, TransferError> {
        let to = to.trim();
        if to.is_empty() {
            return Err(TransferError::MissingField("recipient"));
        }
        if amount.trim().is_empty() {
            return Err(TransferError::MissingField("amount"));
        }
        let value_wei = parse_ether(amount)?;
        if value_wei == 0 {
            return Err(TransferError::ZeroAmount);
        }
        let description = description.trim();
        Ok(Self {
            to: to.to_string(),
            amount: format_ether(value_wei),
            value_wei,
            description: (!description.is_empty()).then(|| description.to_string()),
        })
    }
}

pub struct TransferService<P, S, T> {
    session: WalletSession<P>,
    ledger: Rc<Ledger<S>>,
    timer: T,
    config: WalletConfig,
}

impl<P, S, T> TransferService<P, S, T>
where
    P: WalletProvider + 'static,
    S: KeyValueStore,
    T: Timer,
{
    pub fn new(
        session: WalletSession<P>,
        ledger: Rc<Ledger<S>>,
        timer: T,
        config: WalletConfig,
    ) -> Self {
        Self {
            session,
            ledger,
            timer,
            config,
        }
    }

    pub fn session(&self) -> &WalletSession<P> {
        &self.session
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// Send `amount` of the native asset to `to` through the connected
    /// wallet.
    ///
    /// A `pending` record is appended before the wallet is asked to sign,
    /// so the ledger shows the submission immediately. The same record is
    /// then settled to `confirmed` or `failed`; one submission never yields
    /// two records.
    pub async fn submit_wallet_transfer(
        &self,
        to: &str,
        amount: &str,
        description: &str,
    ) -> Result<TransactionRecord, TransferError> {
        let request = TransferRequest::parse(to, amount, description)?;
        let provider = self
            .session
            .provider()
            .ok_or(SessionError::ProviderUnavailable)?;
        let from = self.session.address().ok_or(SessionError::NotConnected)?;

        let pending = TransactionRecord::new(
            TransactionKind::WalletTransfer,
            from.as_str(),
            request.to.as_str(),
            request.amount.as_str(),
            native_currency(self.session.chain_id()),
        )
        .with_description(request.description.clone());
        let id = pending.id.clone();
        self.ledger.append(pending.clone());
        info!(%id, to = %request.to, amount = %request.amount, "submitting wallet transfer");

        let hash = match provider
            .send_transaction(&from, &request.to, request.value_wei)
            .await
        {
            Ok(hash) => hash,
            Err(source) => {
                warn!(%id, error = %source, "wallet refused transfer");
                self.settle(&id, TransactionStatus::Failed);
                return Err(TransferError::Provider { id, source });
            }
        };
        if let Err(e) = self.ledger.set_tx_hash(&id, &hash) {
            warn!(%id, error = %e, "could not record transaction hash");
        }

        let outcome = match provider.wait_for_receipt(&hash).await {
            Ok(receipt) if receipt.success => {
                info!(%id, %hash, block = ?receipt.block_number, "wallet transfer confirmed");
                self.settle(&id, TransactionStatus::Confirmed);
                Ok(())
            }
            Ok(_) => {
                warn!(%id, %hash, "wallet transfer reverted");
                self.settle(&id, TransactionStatus::Failed);
                Err(TransferError::Reverted(id.clone()))
            }
            Err(source) => {
                warn!(%id, %hash, error = %source, "waiting for receipt failed");
                self.settle(&id, TransactionStatus::Failed);
                Err(TransferError::Provider {
                    id: id.clone(),
                    source,
                })
            }
        };
        self.session.refresh_balance().await;

        outcome.map(|()| self.ledger.get(&id).unwrap_or(pending))
    }

    /// Simulated bank-to-crypto transfer. Waits the configured delay, then
    /// records a confirmed transfer from the placeholder bank address. No
    /// wallet involvement; works while disconnected.
    pub async fn submit_bank_transfer(
        &self,
        to: &str,
        amount: &str,
        description: &str,
    ) -> Result<TransactionRecord, TransferError> {
        let request = TransferRequest::parse(to, amount, description)?;
        info!(to = %request.to, amount = %request.amount, "processing bank transfer");
        self.timer.sleep(self.config.bank_transfer_delay()).await;

        let record = TransactionRecord::new(
            TransactionKind::BankTransfer,
            self.config.bank_address.as_str(),
            request.to,
            request.amount,
            native_currency(self.session.chain_id()),
        )
        .with_status(TransactionStatus::Confirmed)
        .with_description(request.description);
        self.ledger.append(record.clone());
        info!(id = %record.id, "bank transfer completed");
        Ok(record)
    }

    fn settle(&self, id: &str, status: TransactionStatus) {
        if let Err(e) = self.ledger.settle(id, status) {
            warn!(%id, error = %e, "could not settle transaction");
        }
    }
}
