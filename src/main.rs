mod commands;
mod config;
mod ghrepo;
mod git;
mod github;
mod repl;
mod utils;

use std::process::ExitCode;

use clap::Parser;
use commands::Opts;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // No arguments at all: interactive mode
    if std::env::args_os().len() <= 1 {
        return repl::run().await;
    }
    let opts = Opts::parse();
    ghrepo::cli(opts).await
}
