//! `arkeon` binary entrypoint.

#[tokio::main]
async fn main() {
    let code = arkeon_cli::run().await;
    std::process::exit(code);
}
