use brewmaint::api::BrewApi;
use brewmaint::colors;
use brewmaint::commands::{self, BumpArgs, GenerateZapArgs};
use brewmaint::config::Config;
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "brewmaint")]
#[command(author, version, about = "Maintainer tools for Homebrew formulae and casks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for newer versions of formulae and casks
    Bump(BumpArgs),

    /// Generate a zap stanza for a cask
    GenerateZap(GenerateZapArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warn, or debug with --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    colors::init_colors();

    let config = Config::from_env();
    let api = BrewApi::new(&config.api_domain)?;

    match cli.command {
        Some(Commands::Bump(args)) => {
            commands::bump(&api, &config, &args).await?;
        }
        Some(Commands::GenerateZap(args)) => {
            commands::generate_zap(&api, &config, &args).await?;
        }
        None => {
            println!("{} brewmaint - Homebrew maintainer tools", "==>".bold().green());
            println!("\nRun {} to see available commands.", "brewmaint --help".cyan());
        }
    }

    Ok(())
}
