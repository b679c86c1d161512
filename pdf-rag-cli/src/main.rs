use std::process::ExitCode;

use clap::Parser;
use pdf_rag::CancellationToken;
use pdf_rag_cli::{Cli, exit, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { exit::CONFIGURATION } else { exit::SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    telemetry::init(cli.settings.log_format);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match pdf_rag_cli::execute(cli, cancel).await {
        Ok(()) => ExitCode::from(exit::SUCCESS),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit::code_for_error(&err))
        }
    }
}
