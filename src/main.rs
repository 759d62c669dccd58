mod ai;
mod app;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod pipeline;
mod scheduler;
mod services;
mod store;

#[cfg(test)]
mod testing;

use app::App;
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = match cli::parse_args(&args) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("{}\n\n{}", e, cli::USAGE);
            std::process::exit(2);
        }
    };

    let config = Config::load()?;
    let mut app = App::new(config).await?;

    if let Err(e) = app.handle_action(action).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
