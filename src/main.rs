//! changecache - content-hash change detection
//!
//! Entry point for the changecache CLI application.

use changecache::{
    cli::Cli,
    error::{CacheError, ExitCode, StructuredError},
};
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match changecache::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            // Strict mode aborts on an unreadable item; it still counts as an item failure.
            let exit_code = if err
                .downcast_ref::<CacheError>()
                .is_some_and(CacheError::is_item_local)
            {
                ExitCode::PartialSuccess
            } else {
                ExitCode::GeneralError
            };

            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                if let Ok(json) = serde_json::to_string_pretty(&structured) {
                    eprintln!("{}", json);
                } else {
                    eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
