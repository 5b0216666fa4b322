use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    layout_cli::main_entry().await
}
