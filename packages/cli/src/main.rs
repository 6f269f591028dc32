use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;

use confidential_cfmm::constants::{BPS_DENOMINATOR, MAX_FEE_RATE_BPS};
use confidential_cfmm::instructions::compute_swap;
use confidential_cfmm::{FheOps, SimulatedFhe};

mod scenario;

use scenario::{Scenario, Session, SessionReport};

/// Print the banner to stdout.
fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  Confidential CFMM  v{ver}  ·  constant-product AMM over encrypted state");
    println!("  {}", "─".repeat(66));
    println!("  Backend   simulated FHE (in-process)");
    println!("  Fees      0.01%–10.00% per pool, routed to the pool owner");
    println!("  Reveal    ed25519-authenticated, sealed to a caller X25519 key");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// Confidential CFMM: scripted sessions against an encrypted constant-product pool.
///
/// Every command supports --json for machine-readable output.
/// Logging is controlled by CFMM_LOG (e.g. CFMM_LOG=info).
#[derive(Parser)]
#[command(
    name    = "confidential-cfmm",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Constant-product AMM whose reserves, shares and fees stay encrypted.",
    after_help = "\
ENVIRONMENT:
  CFMM_SCENARIO  Scenario file for `run` and `validate`
  CFMM_LOG       Log filter  [default: warn]

QUICK START:
  confidential-cfmm validate --scenario scenarios/owner-fees.toml
  confidential-cfmm run      --scenario scenarios/owner-fees.toml
  confidential-cfmm quote    --reserve-in 500 --reserve-out 500 --amount-in 500 --fee-bps 500"
)]
struct Cli {
    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario file step by step and print the outcome
    ///
    /// Failed steps are rolled back and reported; later steps still run.
    /// Account balances at the end are revealed with each account's own key.
    #[command(
        after_help = "\
EXAMPLES:
  confidential-cfmm run --scenario scenarios/owner-fees.toml
  CFMM_LOG=info confidential-cfmm run --scenario scenarios/owner-fees.toml --json"
    )]
    Run {
        /// TOML scenario file
        #[arg(long, value_name = "FILE", env = "CFMM_SCENARIO")]
        scenario: PathBuf,
    },

    /// Check a scenario file without running it
    Validate {
        /// TOML scenario file
        #[arg(long, value_name = "FILE", env = "CFMM_SCENARIO")]
        scenario: PathBuf,
    },

    /// Preview a trade through the encrypted swap formula
    #[command(
        after_help = "\
EXAMPLES:
  # 5% fee, balanced 500/500 pool, sell 500
  confidential-cfmm quote --reserve-in 500 --reserve-out 500 --amount-in 500 --fee-bps 500"
    )]
    Quote {
        #[arg(long, value_name = "AMOUNT")]
        reserve_in: u64,

        #[arg(long, value_name = "AMOUNT")]
        reserve_out: u64,

        #[arg(long, value_name = "AMOUNT")]
        amount_in: u64,

        /// Pool fee rate in basis points (1 bp = 0.01%). Range 1–1000.
        #[arg(long, value_name = "BPS", default_value_t = 30)]
        fee_bps: u16,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("CFMM_LOG", "warn")).init();

    // When invoked with no arguments, show banner + full help and exit cleanly.
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { scenario } => cmd_run(scenario, cli.json)?,
        Commands::Validate { scenario } => cmd_validate(scenario, cli.json)?,
        Commands::Quote { reserve_in, reserve_out, amount_in, fee_bps } => {
            cmd_quote(*reserve_in, *reserve_out, *amount_in, *fee_bps, cli.json)?;
        }
    }
    Ok(())
}

fn load_checked(path: &Path) -> Result<Scenario> {
    let scenario = scenario::load(path)?;
    scenario::validate(&scenario)
        .with_context(|| format!("Scenario '{}' failed validation", path.display()))?;
    Ok(scenario)
}

// ─── run ──────────────────────────────────────────────────────────────────────

fn cmd_run(path: &Path, json_output: bool) -> Result<()> {
    let scenario = load_checked(path)?;
    let mut session = Session::new(&scenario)?;
    let steps = session.run(&scenario.steps);
    let report = session.report(steps)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("─── Pool ─────────────────────────────────────────────────────────");
    println!("  Address          {}", report.pool);
    println!("  Owner            {}", report.owner);
    println!("  Token A          {}", report.token_a);
    println!("  Token B          {}", report.token_b);
    println!(
        "  Fee rate         {} bps  ({:.2}% per trade)",
        report.fee_rate_bps,
        report.fee_rate_bps as f64 / 100.0
    );
    println!("  Paused           {}", report.paused);
    println!();
    println!("─── Steps ────────────────────────────────────────────────────────");
    for s in &report.steps {
        let outcome = match (&s.error, s.revealed) {
            (Some(err), _) => format!("FAILED  {err}"),
            (None, Some(v)) => format!("ok      revealed {v}"),
            (None, None) => "ok".to_string(),
        };
        println!("  {:>3}  {:<17} {:<10} {}", s.index, s.op, s.account, outcome);
    }
    println!();
    println!("─── Accounts ─────────────────────────────────────────────────────");
    println!("  {:<10} {:>14} {:>14} {:>14}", "name", "token A", "token B", "shares");
    for a in &report.accounts {
        println!("  {:<10} {:>14} {:>14} {:>14}", a.name, a.token_a, a.token_b, a.shares);
    }
}

// ─── validate ─────────────────────────────────────────────────────────────────

fn cmd_validate(path: &Path, json_output: bool) -> Result<()> {
    let scenario = load_checked(path)?;
    if json_output {
        println!("{}", json!({
            "status":       "ok",
            "command":      "validate",
            "scenario":     path.display().to_string(),
            "owner":        scenario.owner,
            "accounts":     scenario.accounts.len(),
            "steps":        scenario.steps.len(),
            "fee_rate_bps": scenario.pool.fee_rate_bps,
            "stoppable":    scenario.pool.stoppable,
        }));
    } else {
        println!(
            "  {}: ok  ({} accounts, {} steps, fee {} bps)",
            path.display(),
            scenario.accounts.len(),
            scenario.steps.len(),
            scenario.pool.fee_rate_bps
        );
    }
    Ok(())
}

// ─── quote ────────────────────────────────────────────────────────────────────

fn cmd_quote(reserve_in: u64, reserve_out: u64, amount_in: u64, fee_bps: u16, json_output: bool) -> Result<()> {
    if !(1..=MAX_FEE_RATE_BPS).contains(&fee_bps) {
        return Err(anyhow!(
            "--fee-bps {} is out of range. Allowed: 1–{} (0.01%–10.00%).",
            fee_bps,
            MAX_FEE_RATE_BPS
        ));
    }

    let mut fhe = SimulatedFhe::with_domain(b"confidential-cfmm-quote");
    let amt = fhe.encrypt(amount_in as u128);
    let r_in = fhe.encrypt(reserve_in as u128);
    let r_out = fhe.encrypt(reserve_out as u128);
    let amounts = compute_swap(&mut fhe, &amt, fee_bps, &r_in, &r_out)?;
    let fee = fhe.decrypt(&amounts.fee)?;
    let net_in = fhe.decrypt(&amounts.net_in)?;
    let amount_out = fhe.decrypt(&amounts.amount_out)?;

    // Spot output at the pre-trade price, for the impact figure.
    let spot_out = if reserve_in == 0 {
        0.0
    } else {
        net_in as f64 * reserve_out as f64 / reserve_in as f64
    };
    let price_impact_pct = if spot_out > 0.0 {
        (1.0 - amount_out as f64 / spot_out) * 100.0
    } else {
        0.0
    };

    if json_output {
        println!("{}", json!({
            "status":           "ok",
            "command":          "quote",
            "amount_in":        amount_in,
            "fee_rate_bps":     fee_bps,
            "fee":              fee as u64,
            "net_in":           net_in as u64,
            "amount_out":       amount_out as u64,
            "price_impact_pct": price_impact_pct,
            "operations":       fhe.operation_count(),
        }));
    } else {
        println!("─── Quote ────────────────────────────────────────────────────────");
        println!("  Amount in        {amount_in}");
        println!(
            "  Fee              {fee}  ({:.2}%)",
            fee_bps as f64 * 100.0 / BPS_DENOMINATOR as f64
        );
        println!("  Net into pool    {net_in}");
        println!("  Amount out       {amount_out}");
        println!("  Price impact     {price_impact_pct:.3}%");
        println!("  Encrypted ops    {}", fhe.operation_count());
    }
    Ok(())
}
