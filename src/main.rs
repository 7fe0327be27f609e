use cat_studio::config::{StudioSettings, setup_logging};
use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = cat_studio::cli::CliOptions::parse();

    if let Err(err) = setup_logging(cli.debug) {
        eprintln!("Logging setup failed: {}", err);
    }

    let settings = match StudioSettings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            error!("Configuration error: {}", err);
            return;
        }
    };

    if let Err(err) = cat_studio::web::setup_server(&cli.listen_address, cli.port, settings).await
    {
        error!("Application error: {}", err);
    }
}
