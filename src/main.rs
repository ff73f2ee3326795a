use accidents_processor::cli::{Args, setup_logging};
use accidents_processor::processor::DatasetProcessor;
use accidents_processor::{ProcessorError, RunStats};
use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        // Ctrl-C only requests a stop; the pipeline honours it between chunks
        let signal_token = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nReceived CTRL+C, stopping after the current chunk...");
                signal_token.cancel();
            }
        });

        let worker = tokio::task::spawn_blocking(move || run(args, cancellation_token));
        match worker.await {
            Ok(result) => result,
            Err(e) => Err(ProcessorError::Interrupted {
                reason: format!("processing task failed: {}", e),
            }),
        }
    });

    match result {
        Ok(_stats) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

fn run(args: Args, cancellation_token: CancellationToken) -> Result<RunStats, ProcessorError> {
    let config = args.to_config()?;
    let mut processor = DatasetProcessor::new(config)?.with_cancellation(cancellation_token);
    processor.process()
}
