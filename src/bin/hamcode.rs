use clap::{ArgAction, Parser};
use hamcode::ecc::DEFAULT_BLOCK_SIZE;
use hamcode::job::{Job, Mode};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(
    name = "hamcode",
    version,
    about = "Hamming-code error correction for files",
    long_about = "Encodes a file into Hamming blocks, or decodes and corrects a .hcode file.\n\
                  Files with the .hcode extension are decoded, anything else is encoded."
)]
struct Cli {
    /// Input file
    file: PathBuf,
    /// Bits per block, control bits included
    #[arg(default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    /// Output file (default: input with its extension replaced)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Encode regardless of the file extension
    #[arg(long, conflicts_with = "decode")]
    encode: bool,
    /// Decode regardless of the file extension
    #[arg(long)]
    decode: bool,
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mode = if cli.encode {
        Some(Mode::Encode)
    } else if cli.decode {
        Some(Mode::Decode)
    } else {
        None
    };

    let job = Job::new(cli.file, cli.block_size, mode, cli.output).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    println!("Input file: {}", job.input.display());
    println!("Output file: {}", job.output.display());
    println!("Block size: {}", job.code.block_size());

    match job.run() {
        Ok(summary) => println!("Completed ({}): {summary}", job.mode),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // The default `tracing-log` feature forwards the library's `log` records
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
