//! Anchor Layout CLI
//!
//! Usage:
//!   anchor-layout [OPTIONS] [FILE]
//!
//! Options:
//!   -W, --width <N>        Root width (default 800)
//!   -H, --height <N>       Root height (default 600)
//!   -l, --log-level <L>    off, error, warn, info, debug or trace
//!   -h, --help             Print help

use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::Parser;
use log::{debug, info, LevelFilter};

use anchor_layout::{render_document, LayoutDocument};

#[derive(Parser, Debug)]
#[command(name = "anchor-layout")]
#[command(about = "Resolve an anchor layout document and print element geometry")]
struct Cli {
    /// Layout document (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Width of the root container
    #[arg(short = 'W', long, default_value_t = 800.0)]
    width: f64,

    /// Height of the root container
    #[arg(short = 'H', long, default_value_t = 600.0)]
    height: f64,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
    debug!(cli:?; "Parsed arguments");

    let document = match &cli.input {
        Some(path) => LayoutDocument::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading '{}': {}", path.display(), e.report());
            process::exit(1);
        }),
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("Error reading from stdin: {}", e);
                process::exit(1);
            }
            LayoutDocument::from_str(&buffer).unwrap_or_else(|e| {
                eprintln!("Error: {}", e.report());
                process::exit(1);
            })
        }
    };
    info!(elements = document.elements.len(), width = cli.width, height = cli.height; "Laying out document");

    match render_document(&document, cli.width, cli.height) {
        Ok(report) => println!("{}", report),
        Err(e) => {
            eprintln!("Error: {}", e.report());
            process::exit(1);
        }
    }
}
