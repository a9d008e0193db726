use clap::Parser;
use gtree_core::cli::Cli;
use gtree_core::config::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    if let Err(e) = gtree_core::logging::init(&config().logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let cli = Cli::parse();

    if let Err(e) = gtree_core::cli::run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
