use std::process;
#[macro_use]
extern crate log;

use anyhow::{bail, Context};
use clap::{Arg, ArgMatches, Command};
use rust_decimal::Decimal;

use ledger_store::{Ledger, TransactionKind};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e:#}");
        process::exit(1);
    }
}

fn cli() -> Command<'static> {
    Command::new("ledger-store")
        .about("Persistent account store: users, balances and a transaction log")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("data-file")
                .long("data-file")
                .takes_value(true)
                .global(true)
                .help("Snapshot file path (default: database.json)"),
        )
        .subcommand(
            Command::new("register")
                .about("Register a user (idempotent)")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("display-name").required(true))
                .arg(Arg::new("username").long("username").takes_value(true)),
        )
        .subcommand(
            Command::new("adjust")
                .about("Add a (possibly negative) delta to a user's balance")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("delta").required(true).allow_hyphen_values(true)),
        )
        .subcommand(
            Command::new("log")
                .about("Append a transaction to the log")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("amount").required(true).allow_hyphen_values(true))
                .arg(
                    Arg::new("kind")
                        .required(true)
                        .possible_values(["deposit", "withdrawal", "adjustment"]),
                ),
        )
        .subcommand(
            Command::new("user")
                .about("Show one user")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(Command::new("users").about("List all users"))
        .subcommand(Command::new("stats").about("Show aggregate totals"))
}

fn run() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let (name, sub) = matches.subcommand().context("a subcommand is required")?;
    let data_file = sub
        .value_of("data-file")
        .or_else(|| matches.value_of("data-file"))
        .unwrap_or("database.json");
    let ledger =
        Ledger::open(data_file).with_context(|| format!("opening ledger at {data_file}"))?;

    match name {
        "register" => register(&ledger, sub),
        "adjust" => adjust(&ledger, sub),
        "log" => log_transaction(&ledger, sub),
        "user" => show_user(&ledger, sub),
        "users" => {
            for user in ledger.list_users() {
                print_user(&user);
            }
            Ok(())
        }
        "stats" => {
            let stats = ledger.aggregate_stats();
            println!("Users: {}", stats.user_count);
            println!("Total balance: ${:.2}", stats.total_balance);
            println!("Transactions: {}", stats.transaction_count);
            Ok(())
        }
        _ => unreachable!("subcommand is required"),
    }
}

fn register(ledger: &Ledger, sub: &ArgMatches) -> anyhow::Result<()> {
    let id = sub.value_of("id").context("id is required")?;
    let display_name = sub.value_of("display-name").context("name is required")?;
    let created = ledger.register_user(id, sub.value_of("username"), display_name)?;
    if created {
        println!("registered {id}");
    } else {
        println!("{id} is already registered");
    }
    Ok(())
}

fn adjust(ledger: &Ledger, sub: &ArgMatches) -> anyhow::Result<()> {
    let id = sub.value_of("id").context("id is required")?;
    let delta: Decimal = sub
        .value_of("delta")
        .context("delta is required")?
        .parse()
        .context("delta is not a decimal number")?;
    if ledger.adjust_balance(id, delta)? {
        println!("balance of {id} is now ${:.2}", balance_of(ledger, id)?);
    } else {
        bail!("no such user: {id}");
    }
    Ok(())
}

fn log_transaction(ledger: &Ledger, sub: &ArgMatches) -> anyhow::Result<()> {
    let id = sub.value_of("id").context("id is required")?;
    let amount: Decimal = sub
        .value_of("amount")
        .context("amount is required")?
        .parse()
        .context("amount is not a decimal number")?;
    let kind = match sub.value_of("kind") {
        Some("deposit") => TransactionKind::Deposit,
        Some("withdrawal") => TransactionKind::Withdrawal,
        Some("adjustment") => TransactionKind::Adjustment,
        other => bail!("unknown transaction kind: {other:?}"),
    };
    let tx = ledger.record_transaction(id, amount, kind)?;
    println!("logged {:?} of ${:.2} for {id} at {}", tx.kind, tx.amount, tx.timestamp);
    Ok(())
}

fn show_user(ledger: &Ledger, sub: &ArgMatches) -> anyhow::Result<()> {
    let id = sub.value_of("id").context("id is required")?;
    match ledger.get_user(id) {
        Some(user) => {
            print_user(&user);
            Ok(())
        }
        None => bail!("no such user: {id}"),
    }
}

fn balance_of(ledger: &Ledger, id: &str) -> anyhow::Result<Decimal> {
    ledger
        .get_user(id)
        .map(|u| u.balance)
        .with_context(|| format!("no such user: {id}"))
}

fn print_user(user: &ledger_store::User) {
    let username = user.username.as_deref().unwrap_or("-");
    println!(
        "{} ({}) @{} balance ${:.2} joined {} last seen {}",
        user.id, user.display_name, username, user.balance, user.joined_at, user.last_seen
    );
}
