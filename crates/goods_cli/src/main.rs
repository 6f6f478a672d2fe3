use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use goods_chain::{ChainClient, NetworkProfile, RpcClient};
use goods_cli::output::render;
use goods_cli::{Cli, Env, run};
use goods_core::logging::init_logging;
use goods_core::{GoodsConfig, GoodsError, Journal};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GoodsConfig::load() {
        Ok(config) => config,
        Err(e) => return fail(&GoodsError::Config(format!("{e:#}"))),
    };

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = match init_logging(&config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: file logging disabled: {e:#}");
            None
        }
    };

    let journal = match GoodsConfig::journal_path() {
        Ok(path) if config.journal_enabled => Journal::new(path),
        _ => Journal::disabled(),
    };
    let env = Env::from_process();
    let connect = |profile: &NetworkProfile| -> Arc<dyn ChainClient> {
        Arc::new(RpcClient::connect(profile))
    };

    match run(cli.command, &env, &config, &journal, &connect).await {
        Ok(report) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = render(&report, &mut stdout) {
                error!("Failed to write output: {e}");
                return ExitCode::FAILURE;
            }
            info!("done");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn fail(err: &GoodsError) -> ExitCode {
    error!(category = ?err.category(), "{err}");
    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
    ExitCode::from(err.exit_code() as u8)
}
