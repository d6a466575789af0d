//! Command-line front end for the expense dashboard.
//!
//! Drives the same bindings and session store as the browser views. The
//! session persists between invocations as JSON files in the state directory.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use dashboard::domain::schema::{Expense, Group, GroupBalances};
use dashboard::domain::{DashboardClient, DashboardError, SessionStore};
use dashboard::outbound::http::ReqwestExecutor;
use dashboard::outbound::session_store::{FileCookieJar, FileStorage};
use dashboard::settings::DashboardSettings;

/// `dashboard-cli` arguments.
#[derive(Debug, Parser)]
#[command(
    name = "dashboard-cli",
    about = "Sign in and manage shared expenses from the terminal",
    version
)]
struct CliArgs {
    /// API base URL. Falls back to `DASHBOARD_API_BASE_URL` or the default.
    #[arg(long = "api-base-url", value_name = "url", global = true)]
    api_base_url: Option<String>,
    /// Session state directory. Falls back to `DASHBOARD_STATE_DIR`.
    #[arg(long = "state-dir", value_name = "path", global = true)]
    state_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and persist the session.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the persisted session.
    Logout,
    /// List your groups.
    Groups,
    /// Create a group.
    CreateGroup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
    },
    /// List the expenses of a group.
    Expenses {
        #[arg(long = "group", value_name = "id")]
        group_id: String,
    },
    /// Show balances and suggested settlements of a group.
    Balances {
        #[arg(long = "group", value_name = "id")]
        group_id: String,
    },
    /// Record an expense split equally across a group.
    AddExpense {
        #[arg(long = "group", value_name = "id")]
        group_id: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        category: String,
    },
    /// Add a member to a group by email.
    AddMember {
        #[arg(long = "group", value_name = "id")]
        group_id: String,
        #[arg(long)]
        email: String,
    },
    /// Show who the stored session belongs to.
    Whoami,
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let mut settings =
        DashboardSettings::load_without_args("dashboard-cli").map_err(io::Error::other)?;
    if let Some(api_base_url) = args.api_base_url {
        settings.api_base_url = api_base_url;
    }
    if let Some(state_dir) = args.state_dir {
        settings.state_dir = state_dir;
    }

    let client = connect(&settings)?;
    run(&client, args.command).await.map_err(io::Error::other)
}

fn connect(settings: &DashboardSettings) -> io::Result<DashboardClient> {
    let state_dir = settings.state_dir();
    let cookies = FileCookieJar::open(state_dir).map_err(io::Error::other)?;
    let storage = FileStorage::open(state_dir).map_err(io::Error::other)?;
    let session = SessionStore::new(Arc::new(cookies), Arc::new(storage));
    session.restore().map_err(io::Error::other)?;

    let base = settings.api_base_url().map_err(io::Error::other)?;
    let executor = ReqwestExecutor::with_base_url(base, settings.request_timeout())
        .map_err(|error| io::Error::other(format!("build HTTP client: {error}")))?;
    Ok(DashboardClient::new(Arc::new(executor), session))
}

/// Failure of one subcommand.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

async fn run(client: &DashboardClient, command: Command) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    match command {
        Command::Login { email, password } => {
            let user = client.login(&email, &password).await?;
            writeln!(out, "signed in as {} <{}>", user.name, user.email)?;
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let user = client.register(&name, &email, &password).await?;
            writeln!(out, "registered {} <{}>", user.name, user.email)?;
        }
        Command::Logout => {
            client.logout()?;
            writeln!(out, "signed out")?;
        }
        Command::Groups => print_groups(&mut out, &client.groups().await?)?,
        Command::CreateGroup {
            name,
            description,
            category,
        } => {
            let created = client.create_group(&name, &description, &category).await?;
            print_json(&mut out, &created)?;
        }
        Command::Expenses { group_id } => {
            print_expenses(&mut out, &client.group_expenses(&group_id).await?)?;
        }
        Command::Balances { group_id } => {
            print_balances(&mut out, &client.group_balances(&group_id).await?)?;
        }
        Command::AddExpense {
            group_id,
            description,
            amount,
            category,
        } => {
            let created = client
                .create_expense(&group_id, &description, &amount, &category)
                .await?;
            print_json(&mut out, &created)?;
        }
        Command::AddMember { group_id, email } => {
            let response = client.add_member(&group_id, &email).await?;
            print_json(&mut out, &response)?;
        }
        Command::Whoami => print_json(&mut out, &client.whoami().await?)?,
    }
    Ok(())
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<(), CliError> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn print_groups(out: &mut impl Write, groups: &[Group]) -> io::Result<()> {
    if groups.is_empty() {
        return writeln!(out, "no groups yet");
    }
    for group in groups {
        writeln!(
            out,
            "{}\t{}\t{}\t{:.2}\t{} members",
            group.id,
            group.name,
            group.category,
            group.total_expense,
            group.members.len()
        )?;
    }
    Ok(())
}

fn print_expenses(out: &mut impl Write, expenses: &[Expense]) -> io::Result<()> {
    if expenses.is_empty() {
        return writeln!(out, "no expenses recorded");
    }
    for expense in expenses {
        writeln!(
            out,
            "{}\t{:.2}\t{}\tpaid by {}",
            expense.description, expense.amount, expense.category, expense.paid_by.name
        )?;
    }
    Ok(())
}

fn print_balances(out: &mut impl Write, balances: &GroupBalances) -> io::Result<()> {
    writeln!(
        out,
        "{}: {:.2} spent",
        balances.group_name, balances.total_group_expenses
    )?;
    for member in &balances.user_balances {
        writeln!(
            out,
            "  {}\t{:.2}\t{}",
            member.user_name,
            member.balance,
            String::from(member.balance_status.clone())
        )?;
    }
    for settlement in &balances.suggested_settlements {
        writeln!(
            out,
            "  {} pays {} {:.2}",
            settlement.payer_name, settlement.receiver_name, settlement.amount
        )?;
    }
    if balances.group_settled {
        writeln!(out, "settled")?;
    } else if !balances.summary.is_empty() {
        writeln!(out, "{}", balances.summary)?;
    }
    Ok(())
}
