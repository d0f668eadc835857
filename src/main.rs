use std::process;

use clap::Parser;
use clap::error::ErrorKind;

use unpyc::cli::args::Cli;
use unpyc::dispatch::CancelToken;
use unpyc::error::BatchError;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version come through here too and exit cleanly;
            // real parse failures keep the legacy -1 exit status.
            let is_display =
                matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            let _ = err.print();
            process::exit(if is_display { 0 } else { -1 });
        }
    };

    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    // The batch is blocking work; keep it off the async runtime so the
    // signal listener stays responsive.
    let outcome = tokio::task::spawn_blocking(move || cli.run(cancel)).await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            eprintln!("unpyc: {err:#}");
            process::exit(exit_code(&err));
        }
        Err(join_err) => {
            eprintln!("unpyc: batch thread panicked: {join_err}");
            process::exit(1);
        }
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BatchError>()
        .map_or(1, BatchError::exit_code)
}
