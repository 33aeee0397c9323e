use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::Parser;

use streamfold::config::{load_config, AppConfig};
use streamfold::observability::init_tracing;
use streamfold::{DecoderOptions, SseEventSource, StreamSession};

#[derive(Parser, Debug)]
#[command(name = "streamfold")]
#[command(about = "Replay a captured Messages-API event stream and print one JSON chunk per line")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// SSE capture to replay; reads stdin when omitted
    input: Option<PathBuf>,
}

fn main() {
    let args = Cli::parse();

    let config = match args.config.as_deref() {
        Some(path) => load_config(path).unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }),
        None => AppConfig::default(),
    };

    init_tracing(&config.log_level);

    let input: Box<dyn Read> = match args.input.as_deref() {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                eprintln!("Failed to open {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    if let Err(message) = replay(input, &config) {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

/// Decode an SSE capture and print one JSON line per chunk.
fn replay(input: Box<dyn Read>, config: &AppConfig) -> Result<(), String> {
    let options = DecoderOptions::from(&config.decoder);
    let session = StreamSession::with_options(SseEventSource::new(input), options);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for chunk in session {
        let chunk = chunk.map_err(|e| format!("stream failed: {e}"))?;
        serde_json::to_writer(&mut out, &chunk).map_err(|e| e.to_string())?;
        out.write_all(b"\n").map_err(|e| e.to_string())?;
    }
    out.flush().map_err(|e| e.to_string())
}
