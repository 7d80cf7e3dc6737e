use clap::Parser;
use std::fs;
use std::io::{self, Read};
use triage_context::{ChunkConfig, chunk_document};

/// A CLI tool to chunk documentation text into JSON output using triage-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Source identifier used to build each chunk's doc_id.
    #[arg(short, long, default_value = "stdin")]
    source_id: String,

    /// Optional document title prefixed onto each chunk's text.
    #[arg(short, long)]
    title: Option<String>,

    /// Window length in characters (0 = whole input as one chunk).
    #[arg(short, long, default_value_t = 800)]
    chunk_size: usize,

    /// Characters of overlap between adjacent windows.
    #[arg(short, long, default_value_t = 150)]
    overlap: usize,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let text = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let config = ChunkConfig::new(args.chunk_size, args.overlap)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let chunks = chunk_document(&args.source_id, args.title.as_deref(), &text, &config);
    let json = serde_json::to_string_pretty(&chunks)?;
    println!("{json}");

    Ok(())
}
