use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dbank_common::config::BANK_ADDRESS;
use dbank_common::transfer::{BANK_TRANSFER_COMPLETED, WALLET_TRANSFER_SENT};
use dbank_common::{TransactionKind, TransactionStatus, TransferError};
use dbank_integration::harness::Harness;
use dbank_integration::{ALICE, DAVE, ONE_ETH};

/// Connect, then send half an ether: the record shows up pending right
/// away and is confirmed (with its hash) once the wallet reports the
/// receipt.
#[test]
fn connect_then_send() {
    let mut h = Harness::new();
    let session = h.session().clone();
    let connected = h.block_on(session.connect()).unwrap();
    assert!(connected.connected());
    assert_eq!(connected.balance_wei, 2_000_000_000_000_000_000);

    h.wallet.receipt_gate().pause();
    let outcome = Rc::new(RefCell::new(None));
    let (service, out) = (h.service.clone(), outcome.clone());
    h.spawn(async move {
        let result = service.submit_wallet_transfer(DAVE, "0.5", "lunch").await;
        *out.borrow_mut() = Some(result);
    });
    h.settle();

    let list = h.ledger().list();
    assert_eq!(list[0].status, TransactionStatus::Pending);
    assert_eq!(list[0].from, ALICE);
    assert!(outcome.borrow().is_none());

    h.wallet.receipt_gate().resume();
    h.settle();

    let list = h.ledger().list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].status, TransactionStatus::Confirmed);
    assert!(list[0].tx_hash.is_some());
    assert!(matches!(outcome.borrow().as_ref(), Some(Ok(_))));
    assert_eq!(h.session().balance_wei(), 3 * ONE_ETH / 2);

    // The confirmed record is what the next page load sees.
    assert_eq!(h.reload().ledger().list(), list);
}

#[test]
fn failed_send_keeps_a_single_failed_record() {
    let mut h = Harness::new();
    let session = h.session().clone();
    h.block_on(session.connect()).unwrap();
    h.wallet.reject_sends(true);

    let service = h.service.clone();
    let err = h
        .block_on(service.submit_wallet_transfer(DAVE, "0.5", ""))
        .unwrap_err();
    assert!(matches!(err, TransferError::Provider { .. }));
    assert_eq!(err.status_message(), "Transaction failed. Please try again.");

    let list = h.reload().ledger().list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].status, TransactionStatus::Failed);
    assert_eq!(h.session().balance_wei(), 2 * ONE_ETH);
}

#[test]
fn invalid_amounts_are_rejected_before_recording() {
    let mut h = Harness::new();
    let session = h.session().clone();
    h.block_on(session.connect()).unwrap();
    let service = h.service.clone();

    for amount in ["", "abc", "0", "-1", "0.0000000000000000001"] {
        let result = h.block_on(service.submit_wallet_transfer(DAVE, amount, ""));
        assert!(result.is_err(), "amount {amount:?} accepted");
    }
    assert!(h.ledger().is_empty());
    assert!(h.wallet.sent().is_empty());
}

#[test]
fn bank_transfer_after_fixed_delay() {
    let mut h = Harness::new();
    h.timer.gate().pause();

    let service = h.service.clone();
    h.spawn(async move {
        let record = service.submit_bank_transfer(DAVE, "10", "rent").await.unwrap();
        assert_eq!(record.description.as_deref(), Some("rent"));
    });
    h.settle();
    assert!(h.ledger().is_empty());
    assert_eq!(h.timer.slept(), vec![Duration::from_millis(2_000)]);

    h.timer.gate().resume();
    h.settle();
    let list = h.ledger().list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind, TransactionKind::BankTransfer);
    assert_eq!(list[0].status, TransactionStatus::Confirmed);
    assert_eq!(list[0].from, BANK_ADDRESS);
    assert_eq!(h.wallet.account_requests(), 0);
}

#[test]
fn mixed_history_is_newest_first() {
    let mut h = Harness::new();
    let session = h.session().clone();
    h.block_on(session.connect()).unwrap();
    let service = h.service.clone();

    h.block_on(service.submit_bank_transfer(ALICE, "1", "")).unwrap();
    h.block_on(service.submit_wallet_transfer(DAVE, "0.1", "")).unwrap();
    h.block_on(service.submit_bank_transfer(ALICE, "2", "")).unwrap();

    let kinds: Vec<_> = h.ledger().list().iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        [
            TransactionKind::BankTransfer,
            TransactionKind::WalletTransfer,
            TransactionKind::BankTransfer
        ]
    );
    assert_eq!(WALLET_TRANSFER_SENT, "Transaction sent successfully!");
    assert_eq!(BANK_TRANSFER_COMPLETED, "Bank transfer completed successfully!");
}
