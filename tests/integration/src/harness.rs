use std::future::Future;
use std::path::Path;
use std::rc::Rc;

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use tempfile::TempDir;

use dbank_common::ledger::Ledger;
use dbank_common::mock::{MockTimer, MockWallet};
use dbank_common::store::FileStore;
use dbank_common::{TransferService, WalletConfig, WalletSession};

use crate::{init_tracing, ALICE, ONE_ETH};

pub type Service = TransferService<MockWallet, FileStore, MockTimer>;

/// One dashboard "page load": a session and ledger over a file store in a
/// temporary directory, driven by a local executor.
pub struct Harness {
    dir: Rc<TempDir>,
    pub wallet: MockWallet,
    pub timer: MockTimer,
    pub service: Rc<Service>,
    pub pool: LocalPool,
}

impl Harness {
    /// Alice's wallet on mainnet holding 2 ETH.
    pub fn new() -> Self {
        Self::with_wallet(MockWallet::new().with_account(ALICE, 2 * ONE_ETH))
    }

    pub fn with_wallet(wallet: MockWallet) -> Self {
        init_tracing();
        let dir = Rc::new(tempfile::tempdir().expect("tempdir"));
        Self::open(dir, wallet)
    }

    fn open(dir: Rc<TempDir>, wallet: MockWallet) -> Self {
        let config = WalletConfig::default();
        let ledger = Rc::new(Ledger::with_config(FileStore::new(dir.path()), &config));
        ledger.load_from_store();
        let timer = MockTimer::new();
        let session = WalletSession::new(Some(wallet.clone()));
        let service = Rc::new(TransferService::new(session, ledger, timer.clone(), config));
        Self {
            dir,
            wallet,
            timer,
            service,
            pool: LocalPool::new(),
        }
    }

    /// A fresh page load over the same storage directory and wallet.
    pub fn reload(&self) -> Self {
        Self::open(self.dir.clone(), self.wallet.clone())
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn session(&self) -> &WalletSession<MockWallet> {
        self.service.session()
    }

    pub fn ledger(&self) -> &Ledger<FileStore> {
        self.service.ledger()
    }

    pub fn spawn(&self, fut: impl Future<Output = ()> + 'static) {
        self.pool.spawner().spawn_local(fut).expect("spawn");
    }

    /// Run every spawned task until none can make progress.
    pub fn settle(&mut self) {
        self.pool.run_until_stalled();
    }

    pub fn block_on<F: Future>(&mut self, fut: F) -> F::Output {
        self.pool.run_until(fut)
    }

    /// Start forwarding wallet notifications to the session.
    pub fn listen(&self) -> dbank_common::provider::Subscription {
        let (subscription, events) = self.session().listen().expect("listen");
        self.spawn(self.session().clone().run_events(events));
        subscription
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
