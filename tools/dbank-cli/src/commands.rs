use std::rc::Rc;

use anyhow::{Context, Result};
use dbank_common::amount::parse_ether;
use dbank_common::format::{format_currency, format_timestamp, shorten_address};
use dbank_common::ledger::{Ledger, LedgerFilter};
use dbank_common::mock::MockWallet;
use dbank_common::network::{native_currency, network_name};
use dbank_common::store::FileStore;
use dbank_common::transfer::{BANK_TRANSFER_COMPLETED, WALLET_TRANSFER_SENT};
use dbank_common::{
    TransactionRecord, TransferService, WalletConfig, WalletProvider, WalletSession,
};
use tracing::debug;

use crate::cli::{Cli, Command, ListArgs, TransferArgs};
use crate::timer::TokioTimer;

/// Second account the demo switches to.
const DEMO_SECOND_ACCOUNT: &str = "0xB0B0000000000000000000000000000000000002";
const RECENT_LIMIT: usize = 5;

pub type CliService = TransferService<MockWallet, FileStore, TokioTimer>;

/// Wallet (unless `--no-wallet`) and a transfer service over the ledger
/// stored in the data directory.
pub fn build(cli: &Cli, config: WalletConfig) -> Result<(Option<MockWallet>, CliService)> {
    let wallet = if cli.no_wallet {
        None
    } else {
        let balance = parse_ether(&cli.mock_balance).context("invalid --mock-balance")?;
        Some(
            MockWallet::new()
                .with_account(&cli.mock_account, balance)
                .with_chain(&cli.mock_chain),
        )
    };

    let ledger = Rc::new(Ledger::with_config(FileStore::new(&cli.data_dir), &config));
    let loaded = ledger.load_from_store();
    debug!(loaded, dir = %cli.data_dir.display(), "ledger loaded");

    let session = WalletSession::new(wallet.clone());
    Ok((wallet, TransferService::new(session, ledger, TokioTimer, config)))
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.wallet_config()?;
    let (wallet, service) = build(&cli, config)?;

    let outcome = match &cli.command {
        Command::Status => status(&service).await,
        Command::Send(args) => send(&service, args).await,
        Command::Bank(args) => bank(&service, args).await.map(|_| ()),
        Command::List(args) => list(&service, args),
        Command::Demo => match wallet.as_ref() {
            Some(wallet) => demo(&service, wallet, &cli.mock_account).await,
            None => Err(anyhow::anyhow!("the demo needs the simulated wallet; drop --no-wallet")),
        },
    };

    service.ledger().flush().context("persisting ledger")?;
    outcome
}

async fn connect(service: &CliService) -> Result<()> {
    if let Err(e) = service.session().connect().await {
        println!("{}", e.status_message());
        return Err(e.into());
    }
    Ok(())
}

async fn status(service: &CliService) -> Result<()> {
    connect(service).await?;
    print_dashboard(service);
    Ok(())
}

pub async fn send(service: &CliService, args: &TransferArgs) -> Result<()> {
    connect(service).await?;
    println!("Processing transaction...");
    match service
        .submit_wallet_transfer(&args.to, &args.amount, &args.description)
        .await
    {
        Ok(record) => {
            println!("{WALLET_TRANSFER_SENT}");
            print_record(&record);
            Ok(())
        }
        Err(e) => {
            println!("{}", e.status_message());
            Err(e.into())
        }
    }
}

pub async fn bank(service: &CliService, args: &TransferArgs) -> Result<TransactionRecord> {
    println!("Processing bank transfer...");
    match service
        .submit_bank_transfer(&args.to, &args.amount, &args.description)
        .await
    {
        Ok(record) => {
            println!("{BANK_TRANSFER_COMPLETED}");
            print_record(&record);
            Ok(record)
        }
        Err(e) => {
            println!("{}", e.status_message());
            Err(e.into())
        }
    }
}

fn list(service: &CliService, args: &ListArgs) -> Result<()> {
    let filter = LedgerFilter {
        kind: args.kind,
        status: args.status,
        search: args.search.clone(),
    };
    let records = service.ledger().filtered(&filter);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No transactions yet");
    } else {
        records.iter().for_each(print_record);
    }
    Ok(())
}

async fn demo(service: &CliService, wallet: &MockWallet, first_account: &str) -> Result<()> {
    let session = service.session();
    let (subscription, events) = session.listen()?;
    let pump = tokio::task::spawn_local(session.clone().run_events(events));

    connect(service).await?;
    print_dashboard(service);

    println!("\n-- wallet switches to another account");
    wallet.set_balance(DEMO_SECOND_ACCOUNT, parse_ether("3")?);
    wallet.switch_accounts(&[DEMO_SECOND_ACCOUNT, first_account]);
    let_events_settle().await;
    print_dashboard(service);

    println!("\n-- wallet switches to Polygon");
    wallet.switch_chain("0x89");
    let_events_settle().await;
    print_dashboard(service);

    println!("\n-- paying the first account");
    let payment = TransferArgs {
        to: first_account.to_string(),
        amount: "0.25".to_string(),
        description: "demo payment".to_string(),
    };
    send(service, &payment).await?;

    println!("\n-- bank deposit");
    bank(
        service,
        &TransferArgs {
            description: "demo deposit".to_string(),
            ..payment
        },
    )
    .await?;

    println!("\n-- wallet locks");
    wallet.switch_accounts(&[]);
    let_events_settle().await;
    print_dashboard(service);

    subscription.unsubscribe();
    pump.await.context("event pump")?;
    Ok(())
}

/// The mock answers without suspending, so a few scheduler turns let the
/// pump apply an event and its follow-up reads.
async fn let_events_settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn print_dashboard(service: &CliService) {
    let session = service.session().snapshot();
    let provider = service
        .session()
        .provider()
        .map(|p| p.provider_name().to_string())
        .unwrap_or_else(|| "none".to_string());
    match &session.address {
        Some(address) => println!("Wallet:   {} ({provider})", shorten_address(address, 4)),
        None => println!("Wallet:   not connected ({provider})"),
    }
    println!("Network:  {}", network_name(session.chain_id));
    println!(
        "Balance:  {}",
        format_currency(&session.balance(), native_currency(session.chain_id))
    );

    let recent = service.ledger().recent(RECENT_LIMIT);
    if recent.is_empty() {
        println!("No transactions yet");
    } else {
        println!("Recent transactions:");
        recent.iter().for_each(print_record);
    }
}

fn print_record(record: &TransactionRecord) {
    println!(
        "  {} | {:<20} | {:<9} | {:>16} | {} -> {}{}",
        format_timestamp(record.created_at),
        record.kind.as_str(),
        record.status.as_str(),
        format_currency(&record.amount, &record.currency),
        shorten_address(&record.from, 4),
        shorten_address(&record.to, 4),
        record
            .description
            .as_deref()
            .map(|d| format!(" | {d}"))
            .unwrap_or_default(),
    );
}
