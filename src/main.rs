//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `country_lookup` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting

use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use country_lookup::config::{
    DEFAULT_STORE_DIR, DEFAULT_UPDATE_HOUR, DEFAULT_UPDATE_URL, FETCH_TIMEOUT, LICENSE_KEY_ENV,
};
use country_lookup::initialization::init_logger_with;
use country_lookup::{
    country_index, country_name, parse_ipv4, CountryLookup, LogFormat, LogLevel,
    LookupConfig, TrieBuilder, UpdateOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "country_lookup", version, about = "IP-to-country lookups")]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Log format: plain or json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    log_format: LogFormat,

    /// Directory holding the database file
    #[arg(long, env = "COUNTRY_LOOKUP_STORE_DIR", default_value = DEFAULT_STORE_DIR, global = true)]
    store_dir: PathBuf,

    /// License key for database updates
    #[arg(long, env = LICENSE_KEY_ENV, hide_env_values = true, global = true)]
    license_key: Option<String>,

    /// Update endpoint
    #[arg(long, env = "COUNTRY_LOOKUP_UPDATE_URL", default_value = DEFAULT_UPDATE_URL, global = true)]
    update_url: String,

    /// Local hour (0-23) of the daily update check
    #[arg(
        long,
        env = "COUNTRY_LOOKUP_UPDATE_HOUR",
        default_value_t = DEFAULT_UPDATE_HOUR,
        value_parser = clap::value_parser!(u32).range(0..24),
        global = true
    )]
    update_hour: u32,

    /// Update request timeout in seconds
    #[arg(long, default_value_t = FETCH_TIMEOUT.as_secs(), global = true)]
    timeout_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look up one or more addresses
    Lookup {
        /// IPv4 addresses
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Check for a database update now
    Update,
    /// Print information about the active database as JSON
    Info,
    /// Keep the database current and answer lookups from stdin
    Watch,
    /// Build a database file from `cidr,country_code` lines
    Build {
        /// Input CSV file
        input: PathBuf,
        /// Output database file
        output: PathBuf,
    },
}

impl Cli {
    fn lookup_config(&self) -> LookupConfig {
        LookupConfig {
            license_key: self.license_key.clone(),
            store_dir: self.store_dir.clone(),
            update_hour: self.update_hour,
            update_url: self.update_url.clone(),
            fetch_timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run(cli).await {
        eprintln!("country_lookup error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let lookup =
        CountryLookup::new(cli.lookup_config()).context("Failed to create lookup service")?;

    match &cli.command {
        Command::Lookup { addresses } => {
            lookup.ensure_ready().await;
            for address in addresses {
                println!("{}", format_answer(&lookup, address));
            }
        }
        Command::Update => {
            let outcome = lookup
                .check_now()
                .await
                .context("Database update failed")?;
            match outcome {
                UpdateOutcome::Skipped => {
                    println!("No license key configured (set {})", LICENSE_KEY_ENV)
                }
                UpdateOutcome::NoUpdate => println!("Database is up to date"),
                UpdateOutcome::Applied { bytes } => {
                    println!("Database updated ({} bytes)", bytes)
                }
            }
        }
        Command::Info => {
            let info = lookup
                .store()
                .info()
                .context("Failed to read database file")?;
            match info {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => bail!(
                    "no database at {}",
                    lookup.store().db_path().display()
                ),
            }
        }
        Command::Watch => watch(&lookup).await?,
        Command::Build { input, output } => build_database(input, output)?,
    }

    lookup.shutdown().await;
    Ok(())
}

fn format_answer(lookup: &CountryLookup, address: &str) -> String {
    match parse_ipv4(address) {
        Ok(addr) => format!(
            "{}\t{}\t{}",
            addr,
            lookup.lookup_country_code(&addr).unwrap_or("--"),
            lookup.lookup_country_name(&addr).unwrap_or("--")
        ),
        Err(e) => format!("{}\t--\t{}", address, e),
    }
}

async fn watch(lookup: &CountryLookup) -> Result<()> {
    lookup.ensure_ready().await;
    log::info!("Reading addresses from stdin (Ctrl-C to stop)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Interrupted, shutting down");
                break;
            }
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => println!("{}", format_answer(lookup, line.trim())),
                    None => break,
                }
            }
        }
    }
    Ok(())
}

fn build_database(input: &Path, output: &Path) -> Result<()> {
    let csv = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let mut builder = TrieBuilder::new();
    let mut networks = 0usize;
    for (line_no, line) in csv.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (network, prefix_len, country) = parse_network_line(line)
            .with_context(|| format!("{}:{}", input.display(), line_no + 1))?;
        builder
            .insert(network, prefix_len, country)
            .with_context(|| format!("{}:{}", input.display(), line_no + 1))?;
        networks += 1;
    }

    fs::write(output, builder.build())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Wrote {} ({} networks, {} nodes)",
        output.display(),
        networks,
        builder.node_count()
    );
    Ok(())
}

/// Parses `a.b.c.d/len,CC`. A bare address means `/32`.
fn parse_network_line(line: &str) -> Result<(Ipv4Addr, u8, usize)> {
    let Some((cidr, code)) = line.split_once(',') else {
        bail!("expected `cidr,country_code`, got {:?}", line);
    };

    let (addr, prefix_len) = match cidr.trim().split_once('/') {
        Some((addr, len)) => (
            addr,
            len.parse::<u8>()
                .with_context(|| format!("invalid prefix length {:?}", len))?,
        ),
        None => (cidr.trim(), 32),
    };
    let network = parse_ipv4(addr)?;

    let code = code.trim();
    let country = country_index(code).with_context(|| format!("unknown country code {:?}", code))?;
    log::trace!(
        "{}/{} -> {}",
        network,
        prefix_len,
        country_name(country).unwrap_or("?")
    );

    Ok((network, prefix_len, country))
}

#[cfg(test)]
mod tests {
    use super::*;
    use country_lookup::country_code;

    #[test]
    fn test_parse_network_line() {
        let (network, len, country) = parse_network_line("1.0.0.0/24,AU").unwrap();
        assert_eq!(network, Ipv4Addr::new(1, 0, 0, 0));
        assert_eq!(len, 24);
        assert_eq!(country_code(country), Some("AU"));
    }

    #[test]
    fn test_parse_network_line_bare_address() {
        let (_, len, _) = parse_network_line("8.8.8.8, us").unwrap();
        assert_eq!(len, 32);
    }

    #[test]
    fn test_parse_network_line_errors() {
        assert!(parse_network_line("1.0.0.0/24").is_err());
        assert!(parse_network_line("1.0.0.0/x,AU").is_err());
        assert!(parse_network_line("1.0.0/24,AU").is_err());
        assert!(parse_network_line("1.0.0.0/24,ZZ").is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "country_lookup",
            "lookup",
            "8.8.8.8",
            "--store-dir",
            "/tmp/db",
            "--update-hour",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.store_dir, PathBuf::from("/tmp/db"));
        assert_eq!(cli.lookup_config().update_hour, 3);
        assert!(matches!(cli.command, Command::Lookup { ref addresses } if addresses.len() == 1));
    }

    #[test]
    fn test_cli_rejects_bad_hour() {
        assert!(Cli::try_parse_from(["country_lookup", "--update-hour", "24", "update"]).is_err());
    }
}
