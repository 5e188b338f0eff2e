use clap::Parser;
use tracing_subscriber::EnvFilter;

use som_compiler_cli::{run, Cli};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("somc: {:#}", error);
            std::process::exit(2);
        }
    }
}
