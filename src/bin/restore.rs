//! Restore Binary
//!
//! Truncate the restorable tables of the running database and load one
//! snapshot. Usage: restore <SNAPSHOT.sql[.gz]>

use deployer::*;

#[tokio::main]
async fn main() {
    log();
    kys();
    std::process::exit(Mode::restore().await);
}
