//! redblock-gen: CLI tool for building and inspecting redblock datasets.

use clap::{Parser, Subcommand};
use redblock::converter::{ListParser, ParseStats, DEFAULT_KIND};
use redblock::dataset::{
    ByteOrder, DatasetLoader, DatasetWriter, IntermediateRanges, DEFAULT_DATASET_PATH,
};
use redblock::feeds::{FeedClient, DEFAULT_FEED_INDEX, DEFAULT_THREADS};
use redblock::{Engine, Error};
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "redblock-gen")]
#[command(author = "safebuffer")]
#[command(version = "0.1.0")]
#[command(about = "Build and inspect redblock IP range datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a plain-text address list to a binary dataset
    Convert {
        /// Input list (CIDR, single address or a-b range per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Output binary file
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,

        /// Kind written for every range
        #[arg(short, long, default_value_t = DEFAULT_KIND)]
        kind: u32,

        /// Byte order of the output records
        #[arg(long, default_value = "native")]
        byte_order: ByteOrder,

        /// Fail on the first invalid line
        #[arg(long)]
        strict: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Download plain-text feeds (EDL lists) and merge them into one dataset
    Download {
        /// Feed URL; repeat to merge several, earlier feeds take precedence.
        /// Without any, feeds are discovered from the index page
        #[arg(short, long = "url")]
        urls: Vec<String>,

        /// Index page listing the feeds to download
        #[arg(long, default_value = DEFAULT_FEED_INDEX)]
        index: String,

        /// Concurrent downloads
        #[arg(short, long, default_value_t = DEFAULT_THREADS)]
        threads: usize,

        /// Output binary file
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,

        /// Kind written for every range
        #[arg(short, long, default_value_t = DEFAULT_KIND)]
        kind: u32,

        /// Byte order of the output records
        #[arg(long, default_value = "native")]
        byte_order: ByteOrder,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the records of a dataset
    Inspect {
        /// Dataset file
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        input: PathBuf,

        /// Byte order of the records
        #[arg(long, default_value = "native")]
        byte_order: ByteOrder,

        /// Emit records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate addresses against a dataset
    Check {
        /// Dataset file
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,

        /// Byte order of the records
        #[arg(long, default_value = "native")]
        byte_order: ByteOrder,

        /// Addresses to check (IPv4 or IPv6)
        #[arg(required = true)]
        addrs: Vec<IpAddr>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            kind,
            byte_order,
            strict,
            verbose,
        } => convert_file(&input, &output, kind, byte_order, strict, verbose),
        Commands::Download {
            urls,
            index,
            threads,
            output,
            kind,
            byte_order,
            verbose,
        } => download_and_generate(&urls, &index, threads, &output, kind, byte_order, verbose)
            .map_err(Into::into),
        Commands::Inspect {
            input,
            byte_order,
            json,
        } => inspect(&input, byte_order, json),
        Commands::Check {
            dataset,
            byte_order,
            addrs,
        } => check(&dataset, byte_order, &addrs),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn convert_file(
    input: &PathBuf,
    output: &PathBuf,
    kind: u32,
    byte_order: ByteOrder,
    strict: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if verbose {
        println!("Reading input file: {:?}", input);
    }

    let file = fs::File::open(input)?;
    let (ranges, stats) = ListParser::new(kind).strict(strict).parse(file)?;

    if verbose {
        print_stats(&stats);
    }

    let size = DatasetWriter::with_byte_order(byte_order).write_to_path(ranges.ranges(), output)?;

    println!(
        "Successfully converted {:?} -> {:?} ({} ranges, {} bytes)",
        input,
        output,
        ranges.len(),
        size
    );
    Ok(())
}

fn download_and_generate(
    urls: &[String],
    index: &str,
    threads: usize,
    output: &PathBuf,
    kind: u32,
    byte_order: ByteOrder,
    verbose: bool,
) -> redblock::Result<()> {
    let client = FeedClient::new(std::time::Duration::from_secs(60), threads)?;

    let urls = if urls.is_empty() {
        if verbose {
            println!("Discovering feeds from {}", index);
        }
        client.discover(index)?
    } else {
        urls.to_vec()
    };

    if verbose {
        println!("Downloading {} feeds with {} threads", urls.len(), threads);
    }

    let parser = ListParser::new(kind);
    let mut all_ranges = IntermediateRanges::new();

    for (url, body) in urls.iter().zip(client.fetch_all(&urls)) {
        match body {
            Ok(content) => {
                let stats = parser.parse_into(content.as_bytes(), &mut all_ranges)?;
                if verbose {
                    println!("{}", url);
                    print_stats(&stats);
                }
            }
            Err(e) => {
                eprintln!("  Warning: Failed to download {}: {}", url, e);
            }
        }
    }

    if all_ranges.is_empty() {
        return Err(Error::Config(
            "no ranges downloaded; refusing to write an empty dataset".to_string(),
        ));
    }

    let size = DatasetWriter::with_byte_order(byte_order).write_to_path(all_ranges.ranges(), output)?;

    println!(
        "Generated {:?} ({} ranges, {} bytes)",
        output,
        all_ranges.len(),
        size
    );
    Ok(())
}

fn inspect(
    input: &PathBuf,
    byte_order: ByteOrder,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = DatasetLoader::with_byte_order(byte_order).load_path(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dataset.ranges)?);
        return Ok(());
    }

    for (index, range) in dataset.ranges.iter().enumerate() {
        println!("{:>8}  {}", index, range);
    }
    println!(
        "{} records, {} trailing bytes, sha256 {}",
        dataset.info.records,
        dataset.info.trailing_bytes,
        dataset.info.fingerprint()
    );
    for warning in &dataset.warnings {
        println!("warning: {}", warning);
    }
    Ok(())
}

fn check(
    dataset: &PathBuf,
    byte_order: ByteOrder,
    addrs: &[IpAddr],
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::load_with(dataset.as_path(), DatasetLoader::with_byte_order(byte_order))?;

    for addr in addrs {
        let decision = engine.decide(*addr);
        match engine.explain(*addr) {
            Some((index, range)) => println!("{}\t{}\t(record {}: {})", addr, decision, index, range),
            None => println!("{}\t{}", addr, decision),
        }
    }
    Ok(())
}

fn print_stats(stats: &ParseStats) {
    println!(
        "  Parsed: {} added, {} duplicates, {} IPv6 skipped, {} invalid",
        stats.added, stats.duplicates, stats.skipped_ipv6, stats.invalid
    );
}
