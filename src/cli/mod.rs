use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::api::{AppState, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
use crate::catalog::Catalog;
use crate::core::{
    MAX_INVEST_RATE, RenderIntent, Step, WizardAction, WizardError, WizardState, suggest,
};

#[derive(Parser, Debug)]
#[command(
    name = "smart-invest",
    about = "Guided savings questionnaire with an affordable, high-growth stock shortlist"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "SMART_INVEST_LOG_JSON",
        help = "Emit logs as JSON lines"
    )]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the wizard over a JSON HTTP API
    Serve {
        #[arg(long, env = "SMART_INVEST_PORT", default_value_t = 8080)]
        port: u16,
        #[arg(
            long,
            env = "SMART_INVEST_SESSION_TTL_SECS",
            default_value_t = DEFAULT_SESSION_TTL.as_secs(),
            help = "Drop wizard sessions idle for this many seconds"
        )]
        session_ttl_secs: u64,
        #[arg(
            long,
            env = "SMART_INVEST_MAX_SESSIONS",
            default_value_t = DEFAULT_MAX_SESSIONS,
            help = "Maximum number of live wizard sessions"
        )]
        max_sessions: usize,
        #[command(flatten)]
        catalog: CatalogArgs,
    },
    /// Walk through the questionnaire in the terminal
    Chat {
        #[command(flatten)]
        catalog: CatalogArgs,
    },
    /// Print a one-shot shortlist for a given budget
    Suggest {
        #[arg(long, conflicts_with = "savings", help = "Monthly amount available to invest")]
        investable_amount: Option<f64>,
        #[arg(long, help = "Monthly savings; 10% of it is used as the investable amount")]
        savings: Option<f64>,
        #[command(flatten)]
        catalog: CatalogArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    #[arg(
        long = "catalog",
        env = "SMART_INVEST_CATALOG",
        default_value = "data/stock_data.csv",
        help = "CSV with Company, Ticker, Price and Monthly_Growth columns"
    )]
    pub path: PathBuf,
}

impl CatalogArgs {
    pub fn load(&self) -> Result<Catalog> {
        Catalog::from_path(&self.path)
            .with_context(|| format!("loading catalog from {}", self.path.display()))
    }
}

pub fn resolve_investable_amount(
    investable_amount: Option<f64>,
    savings: Option<f64>,
) -> Result<f64> {
    match (investable_amount, savings) {
        (Some(amount), _) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        (Some(_), _) => bail!("--investable-amount must be >= 0"),
        (None, Some(savings)) if savings.is_finite() && savings > 0.0 => {
            Ok(savings * MAX_INVEST_RATE)
        }
        (None, Some(_)) => bail!("--savings must be > 0"),
        (None, None) => bail!("one of --investable-amount or --savings is required"),
    }
}

pub fn print_shortlist<W: Write>(
    catalog: &Catalog,
    investable_amount: f64,
    out: &mut W,
) -> Result<()> {
    let picks = suggest(catalog.instruments(), investable_amount);
    let intent = if picks.is_empty() {
        RenderIntent::NoAffordableInstruments { investable_amount }
    } else {
        RenderIntent::Shortlist {
            investable_amount,
            picks,
        }
    };
    writeln!(out, "{}", intent.message())?;
    Ok(())
}

enum Reply {
    Amount(f64),
    Analyze,
    Reset,
    Quit,
    Unrecognized,
}

fn read_reply<R: BufRead>(input: &mut R, step: Step) -> Result<Reply> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Reply::Quit);
    }
    let answer = line.trim().to_ascii_lowercase();
    if matches!(answer.as_str(), "q" | "quit" | "exit") {
        return Ok(Reply::Quit);
    }

    let reply = match step {
        Step::CollectIncome | Step::CollectExpenses => answer
            .trim_start_matches('₹')
            .replace(',', "")
            .parse::<f64>()
            .map(Reply::Amount)
            .unwrap_or(Reply::Unrecognized),
        Step::ReviewSavings => match answer.as_str() {
            "a" | "analyze" | "analyse" | "" => Reply::Analyze,
            "r" | "reset" | "re-enter" => Reply::Reset,
            _ => Reply::Unrecognized,
        },
        Step::ShowRecommendations => match answer.as_str() {
            "y" | "yes" | "r" | "restart" => Reply::Reset,
            "" | "n" | "no" => Reply::Quit,
            _ => Reply::Unrecognized,
        },
    };
    Ok(reply)
}

fn choices(state: &WizardState) -> &'static str {
    match state.step {
        Step::CollectIncome => "Monthly income (₹): ",
        Step::CollectExpenses => "Monthly expenses (₹): ",
        Step::ReviewSavings if state.investable_amount.is_some() => {
            "[a]nalyze stocks or [r]e-enter income & expenses: "
        }
        Step::ReviewSavings => "Press [r] to re-enter income & expenses: ",
        Step::ShowRecommendations => "Start over? [y/N]: ",
    }
}

/// Runs the questionnaire over a line-based terminal until the user quits.
pub fn run_chat<R: BufRead, W: Write>(catalog: &Catalog, mut input: R, mut out: W) -> Result<()> {
    let mut state = WizardState::default();
    writeln!(out, "{}", state.intent().message())?;

    loop {
        write!(out, "{}", choices(&state))?;
        out.flush()?;

        let action = match read_reply(&mut input, state.step)? {
            Reply::Quit => break,
            Reply::Unrecognized => {
                writeln!(out, "Sorry, I didn't understand that.")?;
                continue;
            }
            Reply::Amount(amount) if state.step == Step::CollectIncome => {
                WizardAction::SubmitIncome(amount)
            }
            Reply::Amount(amount) => WizardAction::SubmitExpenses(amount),
            Reply::Analyze => WizardAction::Analyze,
            Reply::Reset => WizardAction::Reset,
        };

        match state.apply(action, catalog.instruments()) {
            Ok(transition) => {
                if transition.state.step == Step::ShowRecommendations {
                    writeln!(out, "Analyzing current stock trends...")?;
                }
                writeln!(out, "{}", transition.intent.message())?;
                state = transition.state;
            }
            Err(err) => {
                debug!(code = err.code(), "chat input rejected");
                writeln!(out, "{}", rejection_hint(&err))?;
            }
        }
    }

    writeln!(out, "Goodbye!")?;
    Ok(())
}

fn rejection_hint(err: &WizardError) -> String {
    match err {
        WizardError::InvalidIncome { .. } => {
            "Please enter your monthly income to continue.".to_string()
        }
        WizardError::InvalidExpenses { .. } => "Expenses cannot be negative.".to_string(),
        WizardError::NoSavings { .. } => {
            "There are no savings to invest; re-enter your income and expenses.".to_string()
        }
        other => other.to_string(),
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve {
            port,
            session_ttl_secs,
            max_sessions,
            catalog,
        } => {
            let catalog = catalog.load()?;
            let state = AppState::with_session_limits(
                catalog,
                Duration::from_secs(session_ttl_secs),
                max_sessions,
            );
            crate::api::run_http_server(port, state)
                .await
                .context("HTTP server failed")
        }
        Command::Chat { catalog } => {
            let catalog = catalog.load()?;
            let stdin = std::io::stdin();
            run_chat(&catalog, stdin.lock(), std::io::stdout())
        }
        Command::Suggest {
            investable_amount,
            savings,
            catalog,
        } => {
            let amount = resolve_investable_amount(investable_amount, savings)?;
            let catalog = catalog.load()?;
            print_shortlist(&catalog, amount, &mut std::io::stdout())
        }
    }
}
