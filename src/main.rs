use clap::Parser;
use color_eyre::Result;
use keepsake::{Config, MemoryBook, Profile, cli::{self, Cli, Commands}};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "keepsake=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    // An explicit --config file wins over the profile's config
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_with_profile(profile)?,
    };

    let session = cli::open_session(&config, cli.passphrase.as_deref())?;
    let book = MemoryBook::open(config.get_data_dir(), config.reveal_gate())?;

    cli::dispatch(cli.command.unwrap_or(Commands::Home), &session, &book, &config)?;

    Ok(())
}
