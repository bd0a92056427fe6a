//! In-memory wallet provider and timer for development and tests.
//!
//! All state sits behind an `Rc`, so a test keeps one clone to script the
//! wallet while the session owns another. Calls can be held in flight with
//! a [`Gate`] to exercise overlapping requests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use futures::channel::{mpsc, oneshot};

use crate::provider::{
    ProviderError, ProviderEvent, ProviderEvents, Subscription, TxReceipt, WalletProvider,
    USER_REJECTED,
};
use crate::timer::Timer;

/// Holds calls until released. Open by default.
#[derive(Debug, Default)]
pub struct Gate {
    paused: Cell<bool>,
    waiters: RefCell<VecDeque<oneshot::Sender<()>>>,
}

impl Gate {
    async fn pass(&self) {
        if !self.paused.get() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.waiters.borrow_mut().push_back(tx);
        let _ = rx.await;
    }

    pub fn pause(&self) {
        self.paused.set(true);
    }

    /// Reopen the gate and release every held call.
    pub fn resume(&self) {
        self.paused.set(false);
        for waiter in self.waiters.borrow_mut().drain(..) {
            let _ = waiter.send(());
        }
    }

    pub fn release_oldest(&self) -> bool {
        let waiter = self.waiters.borrow_mut().pop_front();
        waiter.map(|w| w.send(()).is_ok()).unwrap_or(false)
    }

    pub fn release_newest(&self) -> bool {
        let waiter = self.waiters.borrow_mut().pop_back();
        waiter.map(|w| w.send(()).is_ok()).unwrap_or(false)
    }

    pub fn waiting(&self) -> usize {
        self.waiters.borrow().len()
    }
}

/// A transaction broadcast through [`MockWallet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value_wei: u128,
}

#[derive(Default)]
struct MockState {
    accounts: RefCell<Vec<String>>,
    authorised: Cell<bool>,
    chain_id: RefCell<String>,
    balances: RefCell<HashMap<String, u128>>,
    reject_accounts: Cell<bool>,
    fail_balance: Cell<bool>,
    reject_sends: Cell<bool>,
    revert_receipts: Cell<bool>,
    sent: RefCell<Vec<SentTransaction>>,
    blocks: Cell<u64>,
    listeners: RefCell<Vec<(u64, mpsc::UnboundedSender<ProviderEvent>)>>,
    next_listener: Cell<u64>,
    account_requests: Cell<usize>,
    balance_requests: Cell<usize>,
    accounts_gate: Gate,
    balance_gate: Gate,
    receipt_gate: Gate,
}

/// Scriptable wallet. Clones share state.
#[derive(Clone)]
pub struct MockWallet {
    state: Rc<MockState>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    /// Wallet on chain `0x1` with no accounts.
    pub fn new() -> Self {
        let state = MockState::default();
        *state.chain_id.borrow_mut() = "0x1".to_string();
        Self {
            state: Rc::new(state),
        }
    }

    pub fn with_account(self, address: &str, balance_wei: u128) -> Self {
        self.state.accounts.borrow_mut().push(address.to_string());
        self.set_balance(address, balance_wei);
        self
    }

    pub fn with_chain(self, chain_id_hex: &str) -> Self {
        *self.state.chain_id.borrow_mut() = chain_id_hex.to_string();
        self
    }

    /// Mark accounts as already authorised for this origin, so the silent
    /// `accounts()` call returns them.
    pub fn authorised(self) -> Self {
        self.state.authorised.set(true);
        self
    }

    pub fn set_balance(&self, address: &str, balance_wei: u128) {
        self.state
            .balances
            .borrow_mut()
            .insert(address.to_string(), balance_wei);
    }

    pub fn balance_of(&self, address: &str) -> u128 {
        self.state
            .balances
            .borrow()
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub fn reject_accounts(&self, reject: bool) {
        self.state.reject_accounts.set(reject);
    }

    pub fn fail_balance(&self, fail: bool) {
        self.state.fail_balance.set(fail);
    }

    pub fn reject_sends(&self, reject: bool) {
        self.state.reject_sends.set(reject);
    }

    pub fn revert_receipts(&self, revert: bool) {
        self.state.revert_receipts.set(revert);
    }

    pub fn account_requests(&self) -> usize {
        self.state.account_requests.get()
    }

    pub fn balance_requests(&self) -> usize {
        self.state.balance_requests.get()
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.state.sent.borrow().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    pub fn accounts_gate(&self) -> &Gate {
        &self.state.accounts_gate
    }

    pub fn balance_gate(&self) -> &Gate {
        &self.state.balance_gate
    }

    pub fn receipt_gate(&self) -> &Gate {
        &self.state.receipt_gate
    }

    /// Switch accounts in the wallet UI and notify listeners.
    pub fn switch_accounts(&self, accounts: &[&str]) {
        let accounts: Vec<String> = accounts.iter().map(|a| a.to_string()).collect();
        *self.state.accounts.borrow_mut() = accounts.clone();
        self.emit(ProviderEvent::AccountsChanged(accounts));
    }

    /// Switch networks in the wallet UI and notify listeners.
    pub fn switch_chain(&self, chain_id_hex: &str) {
        *self.state.chain_id.borrow_mut() = chain_id_hex.to_string();
        self.emit(ProviderEvent::ChainChanged(chain_id_hex.to_string()));
    }

    pub fn emit(&self, event: ProviderEvent) {
        self.state
            .listeners
            .borrow_mut()
            .retain(|(_, tx)| tx.unbounded_send(event.clone()).is_ok());
    }
}

impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        let state = &self.state;
        state.account_requests.set(state.account_requests.get() + 1);
        state.accounts_gate.pass().await;
        if state.reject_accounts.get() {
            return Err(ProviderError::Rejected {
                code: USER_REJECTED,
                message: "User rejected the request.".to_string(),
            });
        }
        state.authorised.set(true);
        Ok(state.accounts.borrow().clone())
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.state.accounts_gate.pass().await;
        if self.state.authorised.get() {
            Ok(self.state.accounts.borrow().clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> Result<String, ProviderError> {
        Ok(self.state.chain_id.borrow().clone())
    }

    async fn balance(&self, address: &str) -> Result<u128, ProviderError> {
        let state = &self.state;
        state.balance_requests.set(state.balance_requests.get() + 1);
        // Value is read when the request is issued, not when it resolves.
        let balance = self.balance_of(address);
        state.balance_gate.pass().await;
        if state.fail_balance.get() {
            return Err(ProviderError::Rpc("balance lookup failed".to_string()));
        }
        Ok(balance)
    }

    async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        value_wei: u128,
    ) -> Result<String, ProviderError> {
        let state = &self.state;
        if state.reject_sends.get() {
            return Err(ProviderError::Rejected {
                code: USER_REJECTED,
                message: "User denied transaction signature.".to_string(),
            });
        }
        let mut sent = state.sent.borrow_mut();
        let hash = format!("0x{:064x}", sent.len() + 1);
        sent.push(SentTransaction {
            hash: hash.clone(),
            from: from.to_string(),
            to: to.to_string(),
            value_wei,
        });
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TxReceipt, ProviderError> {
        let state = &self.state;
        state.receipt_gate.pass().await;
        let tx = state
            .sent
            .borrow()
            .iter()
            .find(|tx| tx.hash == hash)
            .cloned()
            .ok_or_else(|| ProviderError::Rpc(format!("unknown transaction {hash}")))?;

        state.blocks.set(state.blocks.get() + 1);
        let success = !state.revert_receipts.get();
        if success {
            let from_balance = self.balance_of(&tx.from);
            self.set_balance(&tx.from, from_balance.saturating_sub(tx.value_wei));
            let to_balance = self.balance_of(&tx.to);
            self.set_balance(&tx.to, to_balance.saturating_add(tx.value_wei));
        }
        Ok(TxReceipt {
            hash: tx.hash,
            block_number: Some(state.blocks.get()),
            success,
        })
    }

    fn subscribe(&self) -> Result<(Subscription, ProviderEvents), ProviderError> {
        let (tx, rx) = mpsc::unbounded();
        let id = self.state.next_listener.get();
        self.state.next_listener.set(id + 1);
        self.state.listeners.borrow_mut().push((id, tx));

        let state = self.state.clone();
        let subscription = Subscription::new(move || {
            state.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
        });
        Ok((subscription, rx))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// Timer that records requested delays and, unless its gate is paused,
/// returns immediately.
#[derive(Clone, Default)]
pub struct MockTimer {
    slept: Rc<RefCell<Vec<Duration>>>,
    gate: Rc<Gate>,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

impl Timer for MockTimer {
    async fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
        self.gate.pass().await;
    }
}
