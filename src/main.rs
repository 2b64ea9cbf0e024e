mod cli;
mod convert;
mod data;
mod error;

use std::process::ExitCode;

use clap::Parser;
use log::debug;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();
    debug!("{cli:?}");

    let result = cli.into_options().and_then(|opts| convert::run(&opts));
    match result {
        Ok(summary) => {
            print!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
