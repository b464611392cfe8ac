pub mod align;
pub mod batch;
pub mod cigar;
pub mod graph;
pub mod graph_io; // Plain-text graph loader (VG binary graphs are converted upstream)
pub mod graph_iter;
pub mod query_reader; // FASTA/FASTQ query reading via bio, gzip-transparent
pub mod scalar;
pub mod scoring;
pub mod seq;
pub mod simd;
pub mod utils;
pub mod vectorized;
