use dbank_common::mock::MockWallet;
use dbank_common::{SessionError, SessionState};
use dbank_integration::harness::Harness;
use dbank_integration::{ALICE, ONE_ETH};

const BOB: &str = "0xB0B0000000000000000000000000000000000002";

/// Several connects issued before the first resolves reach the wallet as a
/// single account request and all observe the same session.
#[test]
fn overlapping_connects_prompt_once() {
    let mut h = Harness::new();
    h.wallet.accounts_gate().pause();

    for _ in 0..4 {
        let session = h.session().clone();
        h.spawn(async move {
            let connected = session.connect().await.unwrap();
            assert_eq!(connected.address.as_deref(), Some(ALICE));
        });
    }
    h.settle();
    assert!(h.session().is_connecting());
    assert_eq!(h.wallet.account_requests(), 1);

    h.wallet.accounts_gate().resume();
    h.settle();
    assert_eq!(h.wallet.account_requests(), 1);
    assert!(!h.session().is_connecting());
    assert_eq!(h.session().balance_wei(), 2 * ONE_ETH);
}

#[test]
fn disconnect_clears_everything() {
    let mut h = Harness::new();
    let session = h.session().clone();
    h.block_on(session.connect()).unwrap();
    assert_eq!(h.session().state(), SessionState::Connected);

    h.session().disconnect();
    let snapshot = h.session().snapshot();
    assert_eq!(snapshot.address, None);
    assert_eq!(snapshot.chain_id, None);
    assert_eq!(snapshot.balance_wei, 0);

    // Disconnecting twice is harmless.
    h.session().disconnect();
    assert_eq!(h.session().state(), SessionState::Disconnected);
}

#[test]
fn account_notifications_drive_state() {
    let mut h = Harness::with_wallet(MockWallet::new().with_account(ALICE, ONE_ETH));
    h.wallet.set_balance(BOB, 3 * ONE_ETH);
    let _subscription = h.listen();

    // A wallet that starts reporting an account connects the session.
    h.wallet.switch_accounts(&[BOB]);
    h.settle();
    assert_eq!(h.session().state(), SessionState::Connected);
    assert_eq!(h.session().address().as_deref(), Some(BOB));
    assert_eq!(h.session().chain_id(), Some(1));
    assert_eq!(h.session().balance_wei(), 3 * ONE_ETH);

    h.wallet.switch_accounts(&[]);
    h.settle();
    assert_eq!(h.session().state(), SessionState::Disconnected);
    assert_eq!(h.session().balance_wei(), 0);
}

#[test]
fn chain_switch_rereads_balance() {
    let mut h = Harness::new();
    let _subscription = h.listen();
    let session = h.session().clone();
    h.block_on(session.connect()).unwrap();
    let reads = h.wallet.balance_requests();

    h.wallet.set_balance(ALICE, 7 * ONE_ETH);
    h.wallet.switch_chain("0x89");
    h.settle();

    assert_eq!(h.session().chain_id(), Some(137));
    assert_eq!(h.wallet.balance_requests(), reads + 1);
    assert_eq!(h.session().balance_wei(), 7 * ONE_ETH);
}

/// A network switch that lands while connect is still reading the balance
/// must not leave the old chain (or its balance) behind.
#[test]
fn chain_switch_during_connect_is_not_lost() {
    let mut h = Harness::new();
    let _subscription = h.listen();
    h.wallet.balance_gate().pause();

    let session = h.session().clone();
    h.spawn(async move {
        session.connect().await.unwrap();
    });
    h.settle();

    h.wallet.set_balance(ALICE, 7 * ONE_ETH);
    h.wallet.switch_chain("0x89");
    h.settle();
    assert!(!h.session().is_connected());

    h.wallet.balance_gate().resume();
    h.settle();
    assert_eq!(h.session().state(), SessionState::Connected);
    assert_eq!(h.session().chain_id(), Some(137));
    assert_eq!(h.session().balance_wei(), 7 * ONE_ETH);
}

#[test]
fn disconnect_during_connect_wins() {
    let mut h = Harness::new();
    h.wallet.balance_gate().pause();

    let session = h.session().clone();
    h.spawn(async move {
        let outcome = session.connect().await.unwrap();
        assert!(!outcome.connected());
    });
    h.settle();
    assert!(h.session().is_connecting());

    h.session().disconnect();
    h.wallet.balance_gate().resume();
    h.settle();
    assert_eq!(h.session().state(), SessionState::Disconnected);
    assert_eq!(h.session().snapshot().chain_id, None);
    assert_eq!(h.session().balance_wei(), 0);
}

#[test]
fn wallet_lock_during_connect_wins() {
    let mut h = Harness::new();
    let _subscription = h.listen();
    h.wallet.balance_gate().pause();

    let session = h.session().clone();
    h.spawn(async move {
        session.connect().await.unwrap();
    });
    h.settle();

    h.wallet.switch_accounts(&[]);
    h.settle();
    h.wallet.balance_gate().resume();
    h.settle();
    assert_eq!(h.session().state(), SessionState::Disconnected);
    assert!(!h.session().is_connecting());
}

#[test]
fn account_switch_during_connect_keeps_newer_account() {
    let mut h = Harness::new();
    h.wallet.set_balance(BOB, 3 * ONE_ETH);
    let _subscription = h.listen();
    h.wallet.balance_gate().pause();

    let session = h.session().clone();
    h.spawn(async move {
        session.connect().await.unwrap();
    });
    h.settle();

    h.wallet.switch_accounts(&[BOB]);
    h.settle();
    h.wallet.balance_gate().resume();
    h.settle();
    assert_eq!(h.session().address().as_deref(), Some(BOB));
    assert_eq!(h.session().balance_wei(), 3 * ONE_ETH);
}

/// Only the most recently issued balance read may land, whatever order the
/// wallet answers in.
#[test]
fn newest_balance_read_wins() {
    let mut h = Harness::new();
    let session = h.session().clone();
    h.block_on(session.connect()).unwrap();

    h.wallet.balance_gate().pause();
    h.wallet.set_balance(ALICE, 5 * ONE_ETH);
    let first = h.session().clone();
    h.spawn(async move { first.refresh_balance().await });
    h.settle();

    h.wallet.set_balance(ALICE, 9 * ONE_ETH);
    let second = h.session().clone();
    h.spawn(async move { second.refresh_balance().await });
    h.settle();

    assert!(h.wallet.balance_gate().release_newest());
    h.settle();
    assert_eq!(h.session().balance_wei(), 9 * ONE_ETH);

    assert!(h.wallet.balance_gate().release_oldest());
    h.settle();
    assert_eq!(h.session().balance_wei(), 9 * ONE_ETH);
}

#[test]
fn restore_is_silent() {
    let mut h = Harness::with_wallet(MockWallet::new().with_account(ALICE, ONE_ETH));
    let session = h.session().clone();
    let restored = h.block_on(session.restore()).unwrap();
    assert!(!restored.connected());
    assert_eq!(h.wallet.account_requests(), 0);

    let mut h = Harness::with_wallet(MockWallet::new().with_account(ALICE, ONE_ETH).authorised());
    let session = h.session().clone();
    let restored = h.block_on(session.restore()).unwrap();
    assert_eq!(restored.address.as_deref(), Some(ALICE));
    assert_eq!(h.wallet.account_requests(), 0);
}

#[test]
fn rejected_prompt_leaves_session_disconnected() {
    let mut h = Harness::new();
    h.wallet.reject_accounts(true);
    let session = h.session().clone();
    let err = h.block_on(session.connect()).unwrap_err();
    assert!(matches!(err, SessionError::ProviderRequestFailed(ref e) if e.user_rejected()));
    assert_eq!(h.session().state(), SessionState::Disconnected);
}
