use anyhow::Result;
use clap::Parser;

use pmo::Args;

#[tokio::main]
async fn main() -> Result<()> {
    pmo::run(Args::parse()).await
}
