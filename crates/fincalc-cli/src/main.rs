mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::amortize::AmortizeArgs;
use commands::auto_loan::AutoLoanArgs;
use commands::cash_back::CashBackArgs;
use commands::compare::CompareArgs;
use commands::credit_card::CreditCardArgs;
use commands::loan_terms::LoanTermsArgs;
use commands::rent_vs_buy::RentVsBuyArgs;
use commands::roi::RoiArgs;
use commands::RunContext;

/// Loan, comparison and investment return calculations
#[derive(Parser)]
#[command(
    name = "fincalc",
    version,
    about = "Loan, comparison and investment return calculations",
    long_about = "A CLI for consumer finance calculations with decimal precision. \
                  Supports amortization schedules, auto loans, credit card payoff, \
                  loan comparisons, cash back vs. low APR, rent vs. buy and ROI."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Emit the formatted summary record instead of the full result
    #[arg(long, global = true)]
    summary: bool,

    /// Engine limits file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Currency used by --summary
    #[arg(long, default_value = "USD", global = true)]
    currency: String,

    /// Log engine diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an amortization schedule for a fixed-rate loan
    Amortize(AmortizeArgs),
    /// Auto loan with trade-in, sales tax and fees
    AutoLoan(AutoLoanArgs),
    /// Credit card payoff timeline
    CreditCard(CreditCardArgs),
    /// Compare two loans and find the break-even period
    Compare(CompareArgs),
    /// Cash rebate vs. promotional APR
    CashBack(CashBackArgs),
    /// Rent vs. buy net-worth projection
    RentVsBuy(RentVsBuyArgs),
    /// Side-by-side loan term comparison
    LoanTerms(LoanTermsArgs),
    /// Investment returns (ROI, NPV, IRR, MIRR, CAGR)
    Roi(RoiArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Version = cli.command {
        println!("fincalc {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let ctx = match RunContext::load(cli.config.as_deref(), cli.summary, &cli.currency) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };
    debug!(limits = ?ctx.limits, "engine limits loaded");

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortize(args) => commands::amortize::run_amortize(args, &ctx),
        Commands::AutoLoan(args) => commands::auto_loan::run_auto_loan(args, &ctx),
        Commands::CreditCard(args) => commands::credit_card::run_credit_card(args, &ctx),
        Commands::Compare(args) => commands::compare::run_compare(args, &ctx),
        Commands::CashBack(args) => commands::cash_back::run_cash_back(args, &ctx),
        Commands::RentVsBuy(args) => commands::rent_vs_buy::run_rent_vs_buy(args, &ctx),
        Commands::LoanTerms(args) => commands::loan_terms::run_loan_terms(args, &ctx),
        Commands::Roi(args) => commands::roi::run_roi(args, &ctx),
        Commands::Version => return,
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
