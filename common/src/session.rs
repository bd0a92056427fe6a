//! Wallet session manager.
//!
//! [`WalletSession`] is the single source of truth for connection state.
//! It is a cheap-clone handle over single-threaded shared state: the
//! composition root creates one and hands clones to whatever needs it.
//! Every mutation goes through its methods.
//!
//! Two states exist, `Disconnected` and `Connected`. Connecting commits
//! address, chain and balance in one step; provider notifications update
//! attributes in place or drop back to `Disconnected` when the wallet
//! reports no accounts.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::amount::format_ether;
use crate::error::SessionError;
use crate::format::shorten_address;
use crate::network::parse_chain_id;
use crate::provider::{ProviderError, ProviderEvent, ProviderEvents, Subscription, WalletProvider};

/// Point-in-time view of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    pub balance_wei: u128,
}

impl Session {
    pub fn connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.connected() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Balance in display units (`"2.0"`).
    pub fn balance(&self) -> String {
        format_ether(self.balance_wei)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    Connected,
}

/// Where a connection attempt gets its accounts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AccountSource {
    /// `eth_requestAccounts`; may prompt the user.
    Prompt,
    /// `eth_accounts`; never prompts.
    Authorised,
}

type ConnectFuture = Shared<LocalBoxFuture<'static, Result<Session, SessionError>>>;

struct InFlight {
    epoch: u64,
    source: AccountSource,
    attempt: ConnectFuture,
}

struct SessionInner<P> {
    provider: Option<P>,
    state: RefCell<Session>,
    connecting: RefCell<Option<InFlight>>,
    /// Bumped by every disconnect. A connection attempt only commits if the
    /// epoch it started in is still current.
    epoch: Cell<u64>,
    /// Bumped by every balance read and every reset; only the holder of the
    /// latest ticket may write `balance_wei`.
    balance_ticket: Cell<u64>,
    /// Bumped by every chain notification; chain reads that started under
    /// an older ticket are discarded.
    chain_ticket: Cell<u64>,
}

pub struct WalletSession<P> {
    inner: Rc<SessionInner<P>>,
}

impl<P> Clone for WalletSession<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: WalletProvider + 'static> WalletSession<P> {
    /// `None` means no wallet extension is installed.
    pub fn new(provider: Option<P>) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                provider,
                state: RefCell::new(Session::default()),
                connecting: RefCell::new(None),
                epoch: Cell::new(0),
                balance_ticket: Cell::new(0),
                chain_ticket: Cell::new(0),
            }),
        }
    }

    pub fn provider(&self) -> Option<&P> {
        self.inner.provider.as_ref()
    }

    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().connected()
    }

    pub fn address(&self) -> Option<String> {
        self.inner.state.borrow().address.clone()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.inner.state.borrow().chain_id
    }

    pub fn balance_wei(&self) -> u128 {
        self.inner.state.borrow().balance_wei
    }

    /// True while a connect or restore is waiting on the provider.
    pub fn is_connecting(&self) -> bool {
        self.inner.connecting.borrow().is_some()
    }

    /// Ask the wallet for account access and load chain and balance.
    ///
    /// Overlapping calls share the in-flight attempt: the provider sees a
    /// single account request.
    pub async fn connect(&self) -> Result<Session, SessionError> {
        if self.inner.provider.is_none() {
            warn!("connect requested but no wallet provider is installed");
            return Err(SessionError::ProviderUnavailable);
        }

        let epoch = self.inner.epoch.get();
        let (source, attempt) = self.join_or_start(AccountSource::Prompt);
        let result = attempt.await;
        // Joined a silent restore that found nothing; now prompt. A
        // disconnect in the meantime wins.
        let restore_found_nothing = source == AccountSource::Authorised
            && epoch == self.inner.epoch.get()
            && matches!(&result, Ok(session) if !session.connected());
        if restore_found_nothing {
            return self.join_or_start(AccountSource::Prompt).1.await;
        }
        result
    }

    /// Reconnect silently if the wallet already authorised this origin.
    /// Stays disconnected (without error) when it has not, or when no
    /// provider is installed.
    pub async fn restore(&self) -> Result<Session, SessionError> {
        if self.inner.provider.is_none() {
            debug!("no wallet provider; skipping session restore");
            return Ok(self.snapshot());
        }
        self.join_or_start(AccountSource::Authorised).1.await
    }

    fn join_or_start(&self, source: AccountSource) -> (AccountSource, ConnectFuture) {
        let mut slot = self.inner.connecting.borrow_mut();
        if let Some(in_flight) = slot.as_ref() {
            debug!(source = ?in_flight.source, "joining in-flight wallet connection");
            return (in_flight.source, in_flight.attempt.clone());
        }

        let epoch = self.inner.epoch.get();
        let session = self.clone();
        let attempt = async move {
            let result = session.establish(source, epoch).await;
            let mut slot = session.inner.connecting.borrow_mut();
            if slot
                .as_ref()
                .is_some_and(|in_flight| in_flight.epoch == epoch)
            {
                slot.take();
            }
            result
        }
        .boxed_local()
        .shared();
        *slot = Some(InFlight {
            epoch,
            source,
            attempt: attempt.clone(),
        });
        (source, attempt)
    }

    /// True once a disconnect has happened since `epoch` was read.
    fn superseded(&self, epoch: u64) -> bool {
        epoch != self.inner.epoch.get()
    }

    async fn establish(&self, source: AccountSource, epoch: u64) -> Result<Session, SessionError> {
        let provider = self
            .inner
            .provider
            .as_ref()
            .ok_or(SessionError::ProviderUnavailable)?;

        let accounts = match source {
            AccountSource::Prompt => provider.request_accounts().await,
            AccountSource::Authorised => provider.accounts().await,
        }
        .map_err(|e| {
            warn!(error = %e, "wallet account request failed");
            SessionError::from(e)
        })?;

        let Some(address) = accounts.into_iter().next() else {
            return match source {
                AccountSource::Prompt => {
                    warn!("wallet granted access but returned no accounts");
                    Err(ProviderError::NoAccounts.into())
                }
                AccountSource::Authorised => {
                    debug!("no previously authorised wallet accounts");
                    Ok(self.snapshot())
                }
            };
        };

        // Independent reads; both must land before the session is marked
        // connected. A chain switch while they are out makes the balance
        // stale, so read both again.
        let (chain_id, balance_wei) = loop {
            if self.superseded(epoch) {
                debug!("wallet disconnected while connecting; dropping attempt");
                return Ok(self.snapshot());
            }
            let chain_ticket = self.inner.chain_ticket.get();
            let (chain, balance) = futures::join!(provider.chain_id(), provider.balance(&address));
            let chain_id = chain.and_then(|raw| parse_chain_id(&raw)).map_err(|e| {
                warn!(error = %e, "failed to read chain id while connecting");
                SessionError::from(e)
            })?;
            let balance_wei = balance.map_err(|e| {
                warn!(error = %e, "failed to read balance while connecting");
                SessionError::from(e)
            })?;
            if chain_ticket == self.inner.chain_ticket.get() {
                break (chain_id, balance_wei);
            }
            debug!("wallet chain changed while connecting; reading again");
        };
        if self.superseded(epoch) {
            debug!("wallet disconnected while connecting; dropping attempt");
            return Ok(self.snapshot());
        }

        let session = {
            let mut state = self.inner.state.borrow_mut();
            if state
                .address
                .as_deref()
                .is_some_and(|current| current != address)
            {
                debug!("wallet account changed while connecting; keeping the newer account");
                return Ok(state.clone());
            }
            self.next_balance_ticket();
            *state = Session {
                address: Some(address),
                chain_id: Some(chain_id),
                balance_wei,
            };
            state.clone()
        };
        info!(
            address = %shorten_address(session.address.as_deref().unwrap_or_default(), 4),
            chain_id,
            provider = provider.provider_name(),
            "wallet connected"
        );
        Ok(session)
    }

    /// Local reset only; injected wallets have no reliable disconnect call.
    /// A connection attempt still in flight is abandoned.
    pub fn disconnect(&self) {
        self.inner.epoch.set(self.inner.epoch.get() + 1);
        if self.inner.connecting.borrow_mut().take().is_some() {
            debug!("abandoning in-flight wallet connection");
        }
        self.next_balance_ticket();
        let mut state = self.inner.state.borrow_mut();
        if state.connected() {
            info!("wallet disconnected");
        }
        *state = Session::default();
    }

    /// Re-read the balance of the current account. No-op while
    /// disconnected; provider errors are logged and the last known balance
    /// is kept. When reads overlap, the last one issued wins.
    pub async fn refresh_balance(&self) {
        let Some(provider) = self.inner.provider.as_ref() else {
            return;
        };
        let Some(address) = self.address() else {
            debug!("balance refresh skipped: wallet disconnected");
            return;
        };

        let ticket = self.next_balance_ticket();
        match provider.balance(&address).await {
            Ok(balance) => {
                if ticket != self.inner.balance_ticket.get() {
                    debug!(ticket, "discarding superseded balance read");
                    return;
                }
                let mut state = self.inner.state.borrow_mut();
                if state.address.as_deref() == Some(address.as_str()) {
                    state.balance_wei = balance;
                }
            }
            Err(e) => warn!(error = %e, "balance refresh failed; keeping last known balance"),
        }
    }

    /// `accountsChanged` handler.
    pub async fn on_accounts_changed(&self, accounts: Vec<String>) {
        let Some(address) = accounts.into_iter().next() else {
            debug!("wallet reported no accounts");
            self.disconnect();
            return;
        };

        let chain_known = {
            let mut state = self.inner.state.borrow_mut();
            if state.address.as_deref() != Some(address.as_str()) {
                info!(address = %shorten_address(&address, 4), "wallet account changed");
                state.address = Some(address);
                state.balance_wei = 0;
            }
            state.chain_id.is_some()
        };
        if !chain_known {
            self.refresh_chain().await;
        }
        self.refresh_balance().await;
    }

    /// `chainChanged` handler. Balances are chain-scoped, so a connected
    /// session re-reads its balance. While disconnected the chain is not
    /// recorded; the next connect reads it.
    pub async fn on_chain_changed(&self, raw_chain_id: &str) {
        let chain_id = match parse_chain_id(raw_chain_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "ignoring chain change");
                return;
            }
        };
        self.inner
            .chain_ticket
            .set(self.inner.chain_ticket.get() + 1);
        debug!(chain_id, "wallet chain changed");
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.connected() {
                return;
            }
            state.chain_id = Some(chain_id);
        }
        self.refresh_balance().await;
    }

    pub async fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.on_accounts_changed(accounts).await,
            ProviderEvent::ChainChanged(chain) => self.on_chain_changed(&chain).await,
        }
    }

    /// Register for provider notifications. Keep the returned handle alive
    /// for as long as events should flow; dropping it unregisters.
    pub fn listen(&self) -> Result<(Subscription, ProviderEvents), SessionError> {
        let provider = self
            .inner
            .provider
            .as_ref()
            .ok_or(SessionError::ProviderUnavailable)?;
        Ok(provider.subscribe()?)
    }

    /// Apply provider notifications in arrival order until the stream ends.
    pub async fn run_events(self, mut events: ProviderEvents) {
        while let Some(event) = events.next().await {
            debug!(?event, "provider event");
            self.handle_event(event).await;
        }
        debug!("provider event stream closed");
    }

    async fn refresh_chain(&self) {
        let Some(provider) = self.inner.provider.as_ref() else {
            return;
        };
        let ticket = self.inner.chain_ticket.get();
        match provider
            .chain_id()
            .await
            .and_then(|raw| parse_chain_id(&raw))
        {
            Ok(_) if ticket != self.inner.chain_ticket.get() => {
                debug!("discarding chain read superseded by a chain change");
            }
            Ok(chain_id) => {
                let mut state = self.inner.state.borrow_mut();
                if state.connected() {
                    state.chain_id = Some(chain_id);
                }
            }
            Err(e) => warn!(error = %e, "failed to read chain id"),
        }
    }

    fn next_balance_ticket(&self) -> u64 {
        let ticket = self.inner.balance_ticket.get() + 1;
        self.inner.balance_ticket.set(ticket);
        ticket
    }
}
