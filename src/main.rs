use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cloud_voice_adapter::{
    AudioStreamPacket, CloudServices, CloudVoiceAdapter, Config, LanguageModel, Protocol,
    ProtocolEvent, SendOutcome, SpeechRecognizer, SpeechSynthesizer,
};

/// Cloud voice - Baidu STT/TTS and Gemini for voice-assistant devices
#[derive(Parser)]
#[command(name = "cloud-voice", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/cloud-voice/config.toml)
    #[arg(short, long, env = "CLOUD_VOICE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate credentials and fetch a Baidu access token
    Check,
    /// Transcribe a raw audio file
    Transcribe {
        /// Audio file in the configured STT format
        file: PathBuf,
    },
    /// Ask the language model a question
    Ask {
        /// Prompt text
        prompt: String,
    },
    /// Synthesize speech to a file
    Say {
        /// Text to speak
        text: String,
        /// Output file for the synthesized audio
        #[arg(short, long, default_value = "speech.mp3")]
        output: PathBuf,
    },
    /// Stream a raw audio file through the full pipeline
    Run {
        /// Audio file in the configured STT format
        file: PathBuf,
        /// Bytes per simulated microphone packet
        #[arg(long, default_value = "4000")]
        chunk: usize,
        /// Write synthesized replies here (appended in order)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,cloud_voice_adapter=info",
        1 => "info,cloud_voice_adapter=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Check => check(&config).await,
        Command::Transcribe { file } => transcribe(&config, &file).await,
        Command::Ask { prompt } => ask(&config, &prompt).await,
        Command::Say { text, output } => say(&config, &text, &output).await,
        Command::Run {
            file,
            chunk,
            output,
        } => run_pipeline(&config, &file, chunk, output.as_deref()).await,
    }
}

/// Validate credentials and fetch a token
async fn check(config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    let services = CloudServices::from_config(config)?;
    services.tokens.refresh().await?;
    println!("Configuration OK, Baidu access token acquired");
    Ok(())
}

async fn transcribe(config: &Config, file: &Path) -> anyhow::Result<()> {
    let audio = tokio::fs::read(file).await?;
    let services = CloudServices::from_config(config)?;

    let transcript = services.stt.transcribe(&audio).await?;
    if transcript.is_empty() {
        println!("(no speech recognized)");
    } else {
        println!("{transcript}");
    }
    Ok(())
}

async fn ask(config: &Config, prompt: &str) -> anyhow::Result<()> {
    let services = CloudServices::from_config(config)?;

    let reply = services.llm.generate(prompt).await?;
    if reply.is_empty() {
        anyhow::bail!("language model returned no text");
    }
    println!("{reply}");
    Ok(())
}

async fn say(config: &Config, text: &str, output: &Path) -> anyhow::Result<()> {
    let services = CloudServices::from_config(config)?;

    let audio = services.tts.synthesize(text).await?;
    tokio::fs::write(output, &audio).await?;
    println!("Wrote {} bytes to {}", audio.len(), output.display());
    Ok(())
}

/// Feed a file through the adapter chunk by chunk, printing events as they arrive
async fn run_pipeline(
    config: &Config,
    file: &Path,
    chunk: usize,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    if chunk == 0 {
        anyhow::bail!("--chunk must be greater than zero");
    }

    let audio = tokio::fs::read(file).await?;
    let (adapter, mut events) = CloudVoiceAdapter::from_config(config).await?;
    adapter.start()?;

    let output = output.map(Path::to_path_buf);
    let printer = tokio::spawn(async move {
        let mut speech = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                ProtocolEvent::AudioChannelOpened => println!("[channel opened]"),
                ProtocolEvent::AudioChannelClosed => println!("[channel closed]"),
                ProtocolEvent::IncomingJson(json) => println!("{json}"),
                ProtocolEvent::IncomingAudio(packet) => {
                    println!(
                        "[audio {} bytes @ {} Hz, {} ms frames]",
                        packet.payload.len(),
                        packet.sample_rate,
                        packet.frame_duration
                    );
                    speech.extend_from_slice(&packet.payload);
                }
            }
        }
        speech
    });

    adapter.open_audio_channel().await?;
    let mut flushes = 0usize;
    for piece in audio.chunks(chunk) {
        let outcome = adapter
            .send_audio(AudioStreamPacket::from_payload(piece.to_vec()))
            .await?;
        if let SendOutcome::Flushed { outcome, .. } = outcome {
            flushes += 1;
            tracing::info!(flush = flushes, ?outcome, "pipeline finished");
        }
    }
    adapter.close_audio_channel().await;

    // Dropping the adapter closes the event channel and ends the printer
    drop(adapter);
    let speech = printer.await?;

    if let Some(path) = output {
        tokio::fs::write(&path, &speech).await?;
        println!("Wrote {} bytes to {}", speech.len(), path.display());
    }
    println!("{flushes} flush(es) from {} bytes of audio", audio.len());
    Ok(())
}
