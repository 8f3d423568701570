mod gateway;

use clap::{Parser, Subcommand};
use papagaio_channels::WhatsAppConnector;
use papagaio_core::{
    chance::RandomChance,
    config::{self, Config},
    delay::compute_delay_with,
    phrase::PhraseSource,
};
use papagaio_media::{GoogleTts, RandomImage};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "papagaio",
    version,
    about = "WhatsApp auto-responder with text, voice, photo and location replies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Link the device (QR on first run) and answer messages until logged out.
    Start,
    /// Show the resolved configuration and what is on disk.
    Status,
    /// Print one random phrase and its typing delay.
    Phrase,
}

// Current-thread: the WhatsApp adapter relies on it to keep event order.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // A missing .env is fine.
    dotenv::dotenv().ok();

    let mut cfg = config::load(&cli.config)?;
    cfg.apply_env();
    cfg.validate()?;

    match cli.command {
        Commands::Start => {
            let _guard = init_logging(&cfg, true)?;
            info!(
                "papagaio starting as '{}' ({})",
                cfg.bot.client_name, cfg.bot.display_name
            );

            let gw = gateway::Gateway::new(
                Arc::new(WhatsAppConnector::from_config(&cfg)),
                Arc::new(GoogleTts::from_config(&cfg.media)?),
                Arc::new(RandomImage::from_config(&cfg.media)),
                Box::new(RandomChance::new()),
                &cfg.reply,
                cfg.location.clone(),
            );
            gw.run().await?;
        }
        Commands::Status => {
            let _guard = init_logging(&cfg, false)?;
            print_status(&cli.config, &cfg).await;
        }
        Commands::Phrase => {
            let _guard = init_logging(&cfg, false)?;
            let source = PhraseSource::new(&cfg.reply.corpus_path);
            let phrase = source.next_phrase(&mut RandomChance::new()).await?;
            let delay = compute_delay_with(&phrase, cfg.reply.ms_per_word);
            println!("{phrase}");
            println!("(typing for {} ms)", delay.as_millis());
        }
    }

    Ok(())
}

/// Console logging, plus a daily log file under `<data_dir>/logs` when `to_file`.
///
/// `RUST_LOG` wins over `bot.log_level`. Keep the returned guard alive or
/// buffered file lines are lost.
fn init_logging(cfg: &Config, to_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.bot.log_level));

    let (file_layer, guard) = if to_file {
        let dir = cfg.log_dir();
        std::fs::create_dir_all(&dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("papagaio")
            .filename_suffix("log")
            .build(&dir)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn print_status(config_path: &str, cfg: &Config) {
    println!("papagaio — status\n");
    println!("Config:        {config_path}");
    println!("Client name:   {}", cfg.bot.client_name);
    println!("Display name:  {}", cfg.bot.display_name);
    println!(
        "WhatsApp:      {}",
        if cfg!(feature = "whatsapp-web") {
            "enabled"
        } else {
            "not compiled in (build with --features whatsapp-web)"
        }
    );

    let auth = cfg.auth_path();
    println!(
        "Credentials:   {} ({})",
        auth.display(),
        if auth.exists() {
            "present"
        } else {
            "missing, QR pairing on start"
        }
    );

    let source = PhraseSource::new(&cfg.reply.corpus_path);
    match source.read().await {
        Ok(corpus) => println!(
            "Corpus:        {} ({} phrases)",
            source.path().display(),
            corpus.len()
        ),
        Err(e) => println!("Corpus:        {e}"),
    }

    println!("Audio file:    {}", cfg.media.audio_path().display());
    println!("Image file:    {}", cfg.media.image_path().display());
    println!("Image source:  {}", cfg.media.image_url);
    println!("Log dir:       {}", cfg.log_dir().display());
}
