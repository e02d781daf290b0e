//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `playerhud_core` linkage and schema bootstrap.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `playerhud_cli [DB_PATH]`. Without a path an in-memory database
//! is opened.

use playerhud_core::db::migrations::latest_version;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("playerhud_core ping={}", playerhud_core::ping());
    println!("playerhud_core version={}", playerhud_core::core_version());

    let opened = match std::env::args().nth(1) {
        Some(path) => playerhud_core::open_db(path),
        None => playerhud_core::open_db_in_memory(),
    };
    match opened {
        Ok(_conn) => {
            println!("playerhud_core schema_version={}", latest_version());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("playerhud_core db_open error={err}");
            ExitCode::FAILURE
        }
    }
}
