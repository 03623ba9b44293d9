//! CLI smoke entry point for the symbol loaders.
//!
//! # Responsibility
//! - Verify `glbind_core` linkage and the detected loader strategy.
//! - `glbind_cli <library> <symbol>...` prints one `bound|unbound` line per
//!   symbol; exits non-zero when the library cannot be loaded.
//! - `GLBIND_LOG_DIR` turns on rolling file logs for the run.

use glbind_core::{create_loader, default_log_level, init_logging, log_dir_from_env, LoaderConfig};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Some(log_dir) = log_dir_from_env() {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }
    println!("glbind_core version={}", glbind_core::core_version());

    let config = match LoaderConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    let loader = match create_loader(&config) {
        Ok(loader) => loader,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    println!("loader strategy={}", loader.kind());

    let mut args = std::env::args().skip(1);
    let Some(library) = args.next() else {
        return ExitCode::SUCCESS;
    };
    for symbol in args {
        match loader.get_proc_address(&library, &symbol) {
            Ok(Some(address)) => {
                info!("event=cli_lookup module=cli status=ok library={library} symbol={symbol} bound=true");
                println!("{symbol} bound {address}");
            }
            Ok(None) => {
                info!("event=cli_lookup module=cli status=ok library={library} symbol={symbol} bound=false");
                println!("{symbol} unbound");
            }
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
