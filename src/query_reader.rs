// Query reader using bio::io::{fasta, fastq}
//
// Loads the whole query set into memory (the aligner batches and re-sorts
// queries itself), with automatic gzip detection by file extension and
// format detection by the first record byte.

use bio::io::{fasta, fastq};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::seq;

/// One query sequence, uppercased on ingest.
#[derive(Debug, Clone)]
pub struct Query {
    pub name: String,
    pub seq: String,
}

/// Load all queries from a FASTA or FASTQ file (optionally gzipped).
pub fn load_queries(path: &Path) -> io::Result<Vec<Query>> {
    let file = File::open(path)?;

    let raw: Box<dyn Read> = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut reader = BufReader::new(raw);

    // FASTQ records start with '@', FASTA records with '>'.
    let first = {
        let buf = reader.fill_buf()?;
        buf.first().copied()
    };

    match first {
        Some(b'@') => load_fastq(reader),
        Some(b'>') => load_fasta(reader),
        Some(other) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unrecognized query file (first byte '{}')", other as char),
        )),
        None => Ok(Vec::new()),
    }
}

fn load_fastq<R: BufRead>(reader: R) -> io::Result<Vec<Query>> {
    let mut queries = Vec::new();
    for record in fastq::Reader::from_bufread(reader).records() {
        let record = record.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        queries.push(to_query(record.id(), record.seq()));
    }
    Ok(queries)
}

fn load_fasta<R: BufRead>(reader: R) -> io::Result<Vec<Query>> {
    let mut queries = Vec::new();
    for record in fasta::Reader::from_bufread(reader).records() {
        let record = record.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        queries.push(to_query(record.id(), record.seq()));
    }
    Ok(queries)
}

fn to_query(id: &str, raw: &[u8]) -> Query {
    let mut sequence = String::from_utf8_lossy(raw).into_owned();
    seq::make_upper_case(&mut sequence);
    Query {
        name: id.to_string(),
        seq: sequence,
    }
}
