//! Composition root: owns the session, the ledger and the transfer service,
//! and exposes what the dashboard pages read and trigger.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use dbank_common::format::{format_currency, shorten_address};
use dbank_common::ledger::{Ledger, LedgerFilter};
use dbank_common::network::{native_currency, network_name};
use dbank_common::provider::{Subscription, WalletProvider};
use dbank_common::session::{Session, WalletSession};
use dbank_common::store::KeyValueStore;
use dbank_common::timer::Timer;
use dbank_common::transaction::{TransactionKind, TransactionRecord};
use dbank_common::transfer::{success_message, TransferService};
use dbank_common::{SessionError, TransferError, WalletConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Transactions shown on the dashboard.
pub const RECENT_LIMIT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Pending,
    Success,
    Error,
}

/// Transient status line under the transfer forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub tone: Tone,
    pub message: String,
}

impl StatusLine {
    fn new(tone: Tone, message: impl Into<String>) -> Self {
        Self {
            tone,
            message: message.into(),
        }
    }
}

/// Everything the dashboard page renders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub wallet_available: bool,
    pub connected: bool,
    pub connecting: bool,
    pub address: Option<String>,
    pub short_address: Option<String>,
    pub network: String,
    pub balance: String,
    pub recent: Vec<TransactionRecord>,
    pub status: Option<StatusLine>,
}

pub struct WalletApp<P, S, T> {
    transfers: TransferService<P, S, T>,
    subscription: RefCell<Option<Subscription>>,
    status: RefCell<Option<StatusLine>>,
}

impl<P, S, T> WalletApp<P, S, T>
where
    P: WalletProvider + 'static,
    S: KeyValueStore,
    T: Timer,
{
    pub fn new(provider: Option<P>, store: S, timer: T, config: WalletConfig) -> Self {
        if provider.is_none() {
            info!("no wallet provider detected");
        }
        let ledger = Rc::new(Ledger::with_config(store, &config));
        let session = WalletSession::new(provider);
        Self {
            transfers: TransferService::new(session, ledger, timer, config),
            subscription: RefCell::new(None),
            status: RefCell::new(None),
        }
    }

    pub fn session(&self) -> &WalletSession<P> {
        self.transfers.session()
    }

    pub fn ledger(&self) -> &Ledger<S> {
        self.transfers.ledger()
    }

    /// Load the previous session's ledger and subscribe to wallet
    /// notifications. Returns the event pump for the host to spawn, or
    /// `None` when there is no wallet to listen to.
    pub fn start(&self) -> Option<impl Future<Output = ()> + 'static> {
        let loaded = self.ledger().load_from_store();
        debug!(loaded, "ledger loaded from store");
        match self.session().listen() {
            Ok((subscription, events)) => {
                self.subscription.replace(Some(subscription));
                Some(self.session().clone().run_events(events))
            }
            Err(e) => {
                debug!(error = %e, "wallet notifications unavailable");
                None
            }
        }
    }

    /// Reconnect silently if the wallet already authorised this page.
    pub async fn restore(&self) {
        if let Err(e) = self.session().restore().await {
            warn!(error = %e, "silent reconnect failed");
        }
    }

    pub async fn connect(&self) -> Result<Session, SessionError> {
        let result = self.session().connect().await;
        match &result {
            Ok(_) => self.status.replace(None),
            Err(e) => self
                .status
                .replace(Some(StatusLine::new(Tone::Error, e.status_message()))),
        };
        result
    }

    pub fn disconnect(&self) {
        self.session().disconnect();
    }

    /// Wallet-to-wallet transfer from the connected account.
    pub async fn send(&self, to: &str, amount: &str, description: &str) -> StatusLine {
        self.set_status(StatusLine::new(Tone::Pending, "Processing transaction..."));
        let result = self
            .transfers
            .submit_wallet_transfer(to, amount, description)
            .await;
        self.finish(TransactionKind::WalletTransfer, result)
    }

    /// Simulated bank-to-crypto transfer.
    pub async fn bank_transfer(&self, to: &str, amount: &str, description: &str) -> StatusLine {
        self.set_status(StatusLine::new(Tone::Pending, "Processing bank transfer..."));
        let result = self
            .transfers
            .submit_bank_transfer(to, amount, description)
            .await;
        self.finish(TransactionKind::BankTransfer, result)
    }

    pub fn status(&self) -> Option<StatusLine> {
        self.status.borrow().clone()
    }

    pub fn clear_status(&self) {
        self.status.replace(None);
    }

    pub fn dashboard(&self) -> Dashboard {
        let session = self.session().snapshot();
        let currency = native_currency(session.chain_id);
        Dashboard {
            wallet_available: self.session().provider().is_some(),
            connected: session.connected(),
            connecting: self.session().is_connecting(),
            short_address: session.address.as_deref().map(|a| shorten_address(a, 4)),
            network: network_name(session.chain_id),
            balance: format_currency(&session.balance(), currency),
            address: session.address,
            recent: self.ledger().recent(RECENT_LIMIT),
            status: self.status(),
        }
    }

    /// Transactions page listing.
    pub fn transactions(&self, filter: &LedgerFilter) -> Vec<TransactionRecord> {
        self.ledger().filtered(filter)
    }

    /// Stop listening to the wallet and persist the ledger.
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Err(e) = self.ledger().flush() {
            warn!(error = %e, "ledger not flushed on shutdown");
        }
    }

    fn set_status(&self, status: StatusLine) {
        self.status.replace(Some(status));
    }

    fn finish(
        &self,
        kind: TransactionKind,
        result: Result<TransactionRecord, TransferError>,
    ) -> StatusLine {
        let status = match result {
            Ok(_) => StatusLine::new(Tone::Success, success_message(kind)),
            Err(e) => {
                debug!(error = %e, "transfer not completed");
                StatusLine::new(Tone::Error, e.status_message())
            }
        };
        self.set_status(status.clone());
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbank_common::mock::{MockTimer, MockWallet};
    use dbank_common::store::MemoryStore;
    use dbank_common::transaction::TransactionStatus;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    const ALICE: &str = "0xABC0000000000000000000000000000000000001";
    const BOB: &str = "0xB0B0000000000000000000000000000000000002";
    const TWO_ETH: u128 = 2_000_000_000_000_000_000;

    type App = WalletApp<MockWallet, MemoryStore, MockTimer>;

    fn app(wallet: Option<MockWallet>, store: MemoryStore) -> App {
        WalletApp::new(wallet, store, MockTimer::new(), WalletConfig::default())
    }

    #[test]
    fn dashboard_reflects_connected_wallet() {
        let wallet = MockWallet::new().with_account(ALICE, TWO_ETH);
        let app = app(Some(wallet), MemoryStore::new());

        let before = app.dashboard();
        assert!(before.wallet_available);
        assert!(!before.connected);
        assert_eq!(before.network, "Unknown Network");
        assert_eq!(before.balance, "0.0000 ETH");

        block_on(app.connect()).unwrap();
        let after = app.dashboard();
        assert!(after.connected);
        assert_eq!(after.short_address.as_deref(), Some("0xABC0...0001"));
        assert_eq!(after.network, "Ethereum Mainnet");
        assert_eq!(after.balance, "2.0000 ETH");
    }

    #[test]
    fn restore_and_events_until_shutdown() {
        let wallet = MockWallet::new().with_account(ALICE, TWO_ETH).authorised();
        wallet.set_balance(BOB, 1);
        let app = app(Some(wallet.clone()), MemoryStore::new());

        let mut pool = LocalPool::new();
        let pump = app.start().expect("provider present");
        pool.spawner().spawn_local(pump).unwrap();
        pool.run_until(app.restore());
        assert_eq!(app.session().address().as_deref(), Some(ALICE));
        assert_eq!(wallet.account_requests(), 0);

        wallet.switch_accounts(&[BOB]);
        pool.run_until_stalled();
        assert_eq!(app.session().address().as_deref(), Some(BOB));

        app.shutdown();
        pool.run_until_stalled();
        assert_eq!(wallet.listener_count(), 0);
        wallet.switch_accounts(&[]);
        pool.run_until_stalled();
        assert!(app.session().is_connected());
    }

    #[test]
    fn no_wallet_reports_install_prompt() {
        let app = app(None, MemoryStore::new());
        assert!(app.start().is_none());
        assert_eq!(
            block_on(app.connect()),
            Err(SessionError::ProviderUnavailable)
        );
        let status = app.status().unwrap();
        assert_eq!(status.tone, Tone::Error);
        assert!(status.message.contains("MetaMask"));
        assert!(!app.dashboard().wallet_available);
    }

    #[test]
    fn transfer_status_lines() {
        let wallet = MockWallet::new().with_account(ALICE, TWO_ETH);
        let app = app(Some(wallet), MemoryStore::new());
        block_on(app.connect()).unwrap();

        let missing = block_on(app.send("", "1", ""));
        assert_eq!(missing.message, "Please fill in all required fields");
        assert_eq!(missing.tone, Tone::Error);

        let sent = block_on(app.send(BOB, "0.5", "coffee"));
        assert_eq!(sent, StatusLine::new(Tone::Success, "Transaction sent successfully!"));

        let bank = block_on(app.bank_transfer(ALICE, "3", ""));
        assert_eq!(bank.message, "Bank transfer completed successfully!");

        let dashboard = app.dashboard();
        assert_eq!(dashboard.recent.len(), 2);
        assert_eq!(dashboard.recent[0].kind, TransactionKind::BankTransfer);
        assert_eq!(dashboard.recent[1].status, TransactionStatus::Confirmed);
        assert_eq!(dashboard.balance, "1.5000 ETH");
        assert_eq!(app.status(), Some(bank));
    }

    #[test]
    fn ledger_survives_reload_and_caps_recent() {
        let store = MemoryStore::new();
        let first = app(None, store.clone());
        for i in 0..7 {
            block_on(first.bank_transfer(&format!("0x{i}"), "1", ""));
        }
        first.shutdown();

        let second = app(None, store);
        assert!(second.start().is_none());
        assert_eq!(second.ledger().len(), 7);
        let recent = second.dashboard().recent;
        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(recent[0].to, "0x6");

        let filter = LedgerFilter {
            search: Some("0x3".into()),
            ..Default::default()
        };
        assert_eq!(second.transactions(&filter).len(), 1);
    }
}
