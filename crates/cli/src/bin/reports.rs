use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    reports_cli::main_entry().await
}
