//! Reads HTML from stdin and prints the extraction result as JSON.
//!
//! Usage: `extract_stdin <page-url> [name=selector ...] [--custom-only]`
//!
//! Log verbosity follows `RUST_LOG` (default `warn`); logs go to stderr.

use std::env;
use std::io::{self, Read};
use std::process;

use rs_harvester::{export, extract_html, ScrapeOptions};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: extract_stdin <page-url> [name=selector ...] [--custom-only]");
        process::exit(2);
    };

    let mut options = ScrapeOptions::default();
    for arg in args {
        if arg == "--custom-only" {
            options = options.with_extract_all(false);
        } else if let Some((name, selector)) = arg.split_once('=') {
            options = options.with_selector(name, selector);
        } else {
            eprintln!("ignoring argument {arg:?}: expected name=selector");
        }
    }

    let mut html = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut html) {
        eprintln!("Failed to read from stdin: {e}");
        process::exit(1);
    }

    let output = extract_html(&html, &url, &options).and_then(|result| export::to_json_pretty(&result));
    match output {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
