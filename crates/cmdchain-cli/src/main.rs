//! cmdchain CLI
//!
//! Drives the demo command set from a terminal:
//! - an interactive REPL, or scripts and one-off commands
//! - compiling a search expression into a predicate tree, SQL, or matches
//! - printing the effective framework configuration

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cmdchain_core::search::PredicateBackend;
use cmdchain_core::{FrameworkConfig, Search};
use std::path::PathBuf;

mod demo;
mod repl;
mod sql;

#[derive(Parser)]
#[command(name = "cmdchain")]
#[command(author, version, about = "cmdchain: command chains and search predicates for chat bots")]
struct Cli {
    /// Framework configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Name the commands run as. Only the operator (`console`) holds the demo permissions.
    #[arg(long, global = true, default_value = "console")]
    sender: String,
    /// Debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell over the demo commands.
    Repl {
        /// Run a non-interactive script (one command per line). Use `-` to read from stdin.
        #[arg(long)]
        script: Option<PathBuf>,
        /// Run one command (may be repeated).
        #[arg(long, value_name = "CMD")]
        cmd: Vec<String>,
        /// Continue executing script/commands after a failure (default is fail-fast).
        #[arg(long)]
        continue_on_error: bool,
        /// Do not echo commands while running a script / `--cmd`.
        #[arg(long)]
        quiet: bool,
    },

    /// Compile a search over the demo user table.
    Search {
        /// The search expression, e.g. `name:"John Doe" active | age:>40`.
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        expression: Vec<String>,
        #[arg(long, value_enum, default_value_t = SearchFormat::Json)]
        format: SearchFormat,
    },

    /// Print the effective configuration as JSON.
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SearchFormat {
    /// The predicate tree as JSON
    Json,
    /// A parameterized SQL WHERE clause
    Sql,
    /// Names of the matching demo users
    Table,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<FrameworkConfig> {
    match path {
        Some(path) => {
            let config = FrameworkConfig::load(path)?;
            tracing::info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(FrameworkConfig::default()),
    }
}

fn cmd_search(config: FrameworkConfig, expression: &[String], format: SearchFormat) -> Result<()> {
    let demo = demo::build(config, demo::OPERATOR)?;
    let lexer = demo.dispatcher.config().lexer;
    let source = expression.join(" ");
    let search = Search::parse(&lexer, &source).map_err(|e| anyhow!(demo.dispatcher.render_error(&e)))?;
    let tree = demo
        .handlers
        .compile(&search)
        .map_err(|e| anyhow!(demo.dispatcher.render_error(&e)))?;
    tracing::debug!(search = %search, "compiled search");

    match format {
        SearchFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
        SearchFormat::Sql => {
            let lowered = sql::SqlBackend::new().lower(&tree)?;
            println!("{}", serde_json::to_string_pretty(&lowered)?);
        }
        SearchFormat::Table => {
            let rows = demo.users.select(&tree)?;
            println!("{}", demo::describe_rows(&rows));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Repl {
            script,
            cmd,
            continue_on_error,
            quiet,
        } => {
            let demo = demo::build(config, demo::OPERATOR)?;
            let sender = demo::ConsoleSender::new(&cli.sender);
            if script.is_some() || !cmd.is_empty() {
                repl::cmd_repl_script(&demo.dispatcher, &sender, script.as_ref(), &cmd, continue_on_error, quiet)?;
            } else {
                repl::cmd_repl(&demo, &sender)?;
            }
        }
        Commands::Search { expression, format } => {
            cmd_search(config, &expression, format)?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
