use clap::Parser;
use uniguide_cli::{Cli, commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.log_format);
    commands::run(cli).await
}
