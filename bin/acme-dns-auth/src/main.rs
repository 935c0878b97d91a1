use acme_dns_auth::{init_logging, run_hook, setup_template, CliInput};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let args = CliInput::parse();
    if args.setup {
        print!("{}", setup_template());
        return ExitCode::SUCCESS;
    }

    match run_hook(args).await {
        Ok(outcome) => {
            tracing::debug!(base_domain = %outcome.base_domain, "acme-dns auth hook finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("acme-dns auth hook failed");
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
