//! Deploy Binary
//!
//! Full pipeline run by default; `restore`, `dump`, `status` and `stages`
//! subcommands for manual operation.
//!
//! Options: --keep-up, --skip-restore, --skip-version, --skip-report, --source

use deployer::*;

#[tokio::main]
async fn main() {
    log();
    kys();
    std::process::exit(Mode::run().await);
}
