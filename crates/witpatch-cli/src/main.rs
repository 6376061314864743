//! witpatch sample driver - work item operations through the patch-document
//! engine, narrated on the console.

mod args;
mod scenarios;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();

    // No arguments at all is a request for help, not an error.
    if raw.is_empty() {
        args::print_usage();
        return;
    }

    let options = match args::parse(&raw) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}");
            args::print_usage();
            std::process::exit(-1);
        }
    };

    if let Err(e) = scenarios::run(&options) {
        eprintln!("Failed to run the samples: {e:#}");
        std::process::exit(1);
    }
}
