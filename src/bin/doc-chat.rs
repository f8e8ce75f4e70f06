use clap::{Parser, Subcommand};
use doc_chat::chat::clean_apply_response;
use doc_chat::{Block, Document, extract_suggested_change};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parses markup and prints the document tree as JSON
    Parse {
        /// Input file (stdin if omitted)
        input: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Renders a JSON document tree as markup
    Render { input: Option<PathBuf> },
    /// Parses and re-serializes markup
    Roundtrip {
        input: Option<PathBuf>,
        /// Fail unless a second pass reproduces the first output
        #[arg(long)]
        check: bool,
    },
    /// Prints the plain text of markup
    PlainText {
        input: Option<PathBuf>,
        /// Print word and character counts as JSON instead
        #[arg(long)]
        stats: bool,
    },
    /// Extracts a suggested change from a collaborator reply
    ExtractSuggestion { input: Option<PathBuf> },
    /// Cleans and validates an apply-changes reply
    ApplyResponse { input: Option<PathBuf> },
}

#[derive(Serialize)]
struct TextStats {
    words: usize,
    characters: usize,
    blocks: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Parse { input, pretty } => parse_command(input.as_deref(), *pretty),
        Commands::Render { input } => render_command(input.as_deref()),
        Commands::Roundtrip { input, check } => roundtrip_command(input.as_deref(), *check),
        Commands::PlainText { input, stats } => plain_text_command(input.as_deref(), *stats),
        Commands::ExtractSuggestion { input } => extract_command(input.as_deref()),
        Commands::ApplyResponse { input } => apply_response_command(input.as_deref()),
    }
}

fn read_input(path: Option<&Path>) -> String {
    let result = match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map(|_| buffer)
        }
    };
    match result {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn parse_command(input: Option<&Path>, pretty: bool) {
    let doc = Document::parse(&read_input(input));
    print_json(&doc, pretty);
}

fn render_command(input: Option<&Path>) {
    let blocks: Vec<Block> = match serde_json::from_str(&read_input(input)) {
        Ok(blocks) => blocks,
        Err(err) => {
            eprintln!("Error: invalid document JSON: {err}");
            std::process::exit(1);
        }
    };
    println!("{}", Document::from_blocks(blocks).serialize());
}

fn roundtrip_command(input: Option<&Path>, check: bool) {
    let first = Document::parse(&read_input(input)).serialize();
    if check {
        let second = Document::parse(&first).serialize();
        if second != first {
            eprintln!("Round-trip is not stable:\n{first}\n---\n{second}");
            std::process::exit(1);
        }
    }
    println!("{first}");
}

fn plain_text_command(input: Option<&Path>, stats: bool) {
    let doc = Document::parse(&read_input(input));
    if stats {
        print_json(
            &TextStats {
                words: doc.word_count(),
                characters: doc.char_count(),
                blocks: doc.blocks().len(),
            },
            false,
        );
    } else {
        println!("{}", doc.plain_text());
    }
}

fn extract_command(input: Option<&Path>) {
    match extract_suggested_change(&read_input(input)) {
        Some(change) => print_json(&change, true),
        None => {
            println!("No suggested change found.");
            std::process::exit(1);
        }
    }
}

fn apply_response_command(input: Option<&Path>) {
    match clean_apply_response(&read_input(input)) {
        Ok(markup) => println!("{}", Document::parse(&markup).serialize()),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
