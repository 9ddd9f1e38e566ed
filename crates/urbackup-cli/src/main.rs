//! Entry point for the `urbackup-admin` binary.

#[tokio::main]
async fn main() {
    std::process::exit(urbackup_cli::run().await);
}
