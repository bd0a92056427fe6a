use std::fs;

use dbank_common::ledger::Ledger;
use dbank_common::store::{FileStore, KeyValueStore};
use dbank_common::{TransactionKind, TransactionRecord, TransactionStatus};
use dbank_integration::harness::Harness;
use dbank_integration::DAVE;

fn bank_record(to: &str, amount: &str) -> TransactionRecord {
    TransactionRecord::new(TransactionKind::BankTransfer, "0xBANK", to, amount, "ETH")
        .with_status(TransactionStatus::Confirmed)
}

#[test]
fn appends_are_never_dropped_and_list_is_stable() {
    let h = Harness::new();
    for i in 0..20 {
        let record = bank_record(DAVE, &format!("{i}.0"));
        h.ledger().append(record.clone());
        assert_eq!(h.ledger().list()[0], record);
        assert_eq!(h.ledger().len(), i + 1);
    }
    assert_eq!(h.ledger().list(), h.ledger().list());
}

#[test]
fn reload_reproduces_prior_session_field_for_field() {
    let h = Harness::new();
    h.ledger().append(bank_record(DAVE, "1.0"));
    h.ledger().append(
        TransactionRecord::new(TransactionKind::WalletTransfer, "0xA", DAVE, "0.5", "ETH")
            .with_tx_hash("0xfeed")
            .with_description(Some("lunch".to_string())),
    );
    h.ledger().append(bank_record("0xC", "2.5"));
    let before = h.ledger().list();

    let next = h.reload();
    assert_eq!(next.ledger().list(), before);
}

#[test]
fn corrupt_file_loads_empty_and_is_replaced_on_next_write() {
    let h = Harness::new();
    h.ledger().append(bank_record(DAVE, "1.0"));
    let path = h.data_dir().join("transactions.json");
    assert!(path.exists());
    fs::write(&path, "[{\"id\": tru").unwrap();

    let next = h.reload();
    assert!(next.ledger().is_empty());

    next.ledger().append(bank_record(DAVE, "3.0"));
    let raw = fs::read_to_string(&path).unwrap();
    let stored: Vec<TransactionRecord> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn legacy_snapshot_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let legacy = r#"[
        {"id":"1700000000001","type":"BANK_TO_BANK",
         "from":"0x89205A3A3b2A69De6Dbf7f01ED13B2108B2c43e7","to":"0xDEF","amount":"10",
         "currency":"ETH","timestamp":1700000000001,"status":"CONFIRMED","description":"rent"},
        {"id":"1700000000000","type":"WALLET_TO_WALLET","from":"0xABC","to":"0xDEF","amount":"0.5",
         "currency":"ETH","timestamp":1700000000000,"status":"PENDING","hash":"0xabc","extra":true}
    ]"#;
    store.set("transactions", legacy).unwrap();

    let ledger = Ledger::new(store, "transactions");
    assert_eq!(ledger.load_from_store(), 2);
    let records = ledger.list();
    assert_eq!(records[0].kind, TransactionKind::BankTransfer);
    assert_eq!(records[0].status, TransactionStatus::Confirmed);
    assert_eq!(records[0].description.as_deref(), Some("rent"));
    assert_eq!(records[1].kind, TransactionKind::WalletTransfer);
    assert_eq!(records[1].tx_hash.as_deref(), Some("0xabc"));
    assert_eq!(records[1].created_at, 1_700_000_000_000);
}

#[test]
fn separate_keys_are_separate_ledgers() {
    let dir = tempfile::tempdir().unwrap();
    let main = Ledger::new(FileStore::new(dir.path()), "transactions");
    let other = Ledger::new(FileStore::new(dir.path()), "sandbox");
    main.append(bank_record(DAVE, "1.0"));

    assert_eq!(other.load_from_store(), 0);
    assert_eq!(
        Ledger::new(FileStore::new(dir.path()), "transactions").load_from_store(),
        1
    );
}
