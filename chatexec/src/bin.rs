// Binary entry point; all logic lives in the library.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    chatexec::cli::run().await
}
