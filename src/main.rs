#[tokio::main]
async fn main() {
    if let Err(e) = session_sync::run().await {
        tracing::error!(error = %e, "console driver failed");
        std::process::exit(1);
    }
}
