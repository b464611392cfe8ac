use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use rayon::prelude::*;

use dag_align::align::{self, AlignParams, AlignmentResult};
use dag_align::graph_io;
use dag_align::query_reader;
use dag_align::scoring::{Precision, Scoring, SimdWidth};
use dag_align::utils;

#[derive(Parser)]
#[command(name = "dag-align")]
#[command(about = "Local alignment of DNA reads to a reference sequence graph", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align reads to a reference graph
    Align {
        /// Reference graph in the plain-text adjacency format
        #[arg(value_name = "GRAPH.TXT")]
        graph: PathBuf,

        /// Query reads, FASTA or FASTQ, optionally gzipped
        #[arg(value_name = "READS.FA")]
        reads: PathBuf,

        /// Output file (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        // ===== Scoring Options =====
        /// Score for a character match
        #[arg(short = 'A', long, value_name = "INT", default_value = "1")]
        match_score: i32,

        /// Penalty for a mismatch
        #[arg(short = 'B', long, value_name = "INT", default_value = "1")]
        mismatch_penalty: i32,

        /// Penalty per deletion step
        #[arg(short = 'D', long, value_name = "INT", default_value = "1")]
        del_penalty: i32,

        /// Penalty per insertion step
        #[arg(short = 'I', long, value_name = "INT", default_value = "1")]
        ins_penalty: i32,

        // ===== Kernel Options =====
        /// SIMD register width for phase 1: none, 256 or 512
        #[arg(long, value_name = "WIDTH", default_value = "512")]
        simd: String,

        /// Score lane width in bytes: 1, 2, 4 or auto
        #[arg(long, value_name = "BYTES", default_value = "auto")]
        precision: String,

        // ===== Processing Options =====
        /// Number of threads (default: all available cores)
        #[arg(short = 't', long, value_name = "INT")]
        threads: Option<usize>,

        /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
        #[arg(short = 'v', long, value_name = "INT", default_value = "3")]
        verbosity: i32,
    },

    /// Print summary statistics for a reference graph
    Info {
        /// Reference graph in the plain-text adjacency format
        #[arg(value_name = "GRAPH.TXT")]
        graph: PathBuf,

        /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
        #[arg(short = 'v', long, value_name = "INT", default_value = "3")]
        verbosity: i32,
    },
}

fn init_logger(verbosity: i32) {
    let level = match verbosity {
        i32::MIN..=1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Align {
            graph,
            reads,
            output,
            match_score,
            mismatch_penalty,
            del_penalty,
            ins_penalty,
            simd,
            precision,
            threads,
            verbosity,
        } => {
            init_logger(verbosity);
            run_align(
                &graph,
                &reads,
                output.as_deref(),
                Scoring::new(match_score, mismatch_penalty, del_penalty, ins_penalty),
                &simd,
                &precision,
                threads,
            )
        }
        Commands::Info { graph, verbosity } => {
            init_logger(verbosity);
            run_info(&graph)
        }
    };

    if let Err(e) = outcome {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_align(
    graph_path: &std::path::Path,
    reads_path: &std::path::Path,
    output: Option<&std::path::Path>,
    scoring: Scoring,
    simd: &str,
    precision: &str,
    threads: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let simd: SimdWidth = simd.parse()?;
    let precision: Option<Precision> = match precision {
        "auto" => None,
        other => Some(other.parse()?),
    };

    if let Some(n) = threads {
        let n = n.max(1);
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            log::warn!("Failed to configure thread pool: {e} (may already be initialized)");
        }
    }
    log::info!("Using {} threads", rayon::current_num_threads());

    let t_start = utils::realtime();

    let graph = graph_io::load_txt(graph_path)?;
    log::info!(
        "Loaded graph: {} vertices, {} edges, reference length {}",
        graph.num_vertices(),
        graph.num_edges(),
        graph.total_ref_length()
    );

    let queries = query_reader::load_queries(reads_path)?;
    log::info!("Loaded {} queries from {}", queries.len(), reads_path.display());

    let names: Vec<String> = queries.iter().map(|q| q.name.clone()).collect();
    let seqs: Vec<String> = queries.into_iter().map(|q| q.seq).collect();

    let params = AlignParams {
        scoring,
        simd,
        precision,
    };
    let out = align::align_local(&graph, &seqs, &params)?;

    log::info!(
        "Phase timings (s): phase1 {:.3}, phase2 {:.3}, phase3 {:.3}, phase4 {:.3}",
        out.timings.phase1,
        out.timings.phase2,
        out.timings.phase3,
        out.timings.phase4
    );

    emit_results(&names, &out.results, output)?;

    log::info!(
        "Aligned {} queries in {:.2} wall s / {:.2} CPU s",
        out.results.len(),
        utils::realtime() - t_start,
        utils::cputime()
    );
    Ok(())
}

/// Stream result records from the worker pool to a single writer thread.
/// Record order follows the schedule and is unspecified across queries.
fn emit_results(
    names: &[String],
    results: &[AlignmentResult],
    output: Option<&std::path::Path>,
) -> io::Result<()> {
    let mut writer: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let (tx, rx) = crossbeam_channel::bounded::<String>(1024);

    let writer_handle = std::thread::spawn(move || -> io::Result<()> {
        for record in rx {
            writer.write_all(record.as_bytes())?;
        }
        writer.flush()
    });

    results.par_iter().for_each_with(tx, |tx, r| {
        let _ = tx.send(format_record(&names[r.query], r));
    });

    writer_handle
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "writer thread panicked"))?
}

fn format_record(name: &str, r: &AlignmentResult) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        name, r.score, r.strand, r.vid_end, r.end_row, r.end_col, r.start_row, r.start_col, r.cigar
    )
}

fn run_info(graph_path: &std::path::Path) -> Result<(), Box<dyn Error>> {
    let graph = graph_io::load_txt(graph_path)?;
    println!("vertices\t{}", graph.num_vertices());
    println!("edges\t{}", graph.num_edges());
    println!("reference length\t{}", graph.total_ref_length());
    println!("csr ordering\t{}", if graph.verify() { "ok" } else { "violated" });
    Ok(())
}
