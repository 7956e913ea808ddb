//! Sequence file formats: FASTA/FASTQ/plain-line readers and a FASTA writer.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;

use bio::io::{fasta, fastq};
use flate2::read::MultiGzDecoder;

use crate::read_source::RawRead;
use crate::sequence::Sequence;

/// Errors returned while reading or writing sequence files.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed {format} record in {path}: {message}")]
    Record {
        format: &'static str,
        path: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fastq,
    Fasta,
    Lines,
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("bgz"))
        .unwrap_or(false)
}

/// Guess the format from the file extension, looking through `.gz`/`.bgz`.
pub fn infer_format(path: &Path) -> SequenceFormat {
    let lower_ext = |p: &Path| {
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    };
    let mut ext = lower_ext(path);
    if ext == "gz" || ext == "bgz" {
        ext = path
            .file_stem()
            .map(|stem| lower_ext(Path::new(stem)))
            .unwrap_or_default();
    }

    match ext.as_str() {
        "fastq" | "fq" => SequenceFormat::Fastq,
        "fasta" | "fa" | "fna" => SequenceFormat::Fasta,
        _ => SequenceFormat::Lines,
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>, FormatError> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Decode the whole file, replacing invalid UTF-8 with U+FFFD.
///
/// A damaged byte then only spoils the read it sits in: the replacement
/// symbol is outside every alphabet, so that read alone is rejected at load.
fn read_text(path: &Path) -> Result<String, FormatError> {
    let mut bytes = Vec::new();
    open_reader(path)?.read_to_end(&mut bytes)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            log::warn!("{}: invalid UTF-8 replaced with U+FFFD", path.display());
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

/// Read every record of `path` as a [`RawRead`], in file order.
///
/// Symbols are passed through untouched; validation and case folding
/// happen when the reads are loaded into a pool.
pub fn read_records(path: &Path) -> Result<Vec<RawRead>, FormatError> {
    let format = infer_format(path);
    let text = read_text(path)?;
    let record_error = |format: &'static str, message: String| FormatError::Record {
        format,
        path: path.display().to_string(),
        message,
    };

    match format {
        SequenceFormat::Fastq => fastq::Reader::new(Cursor::new(text))
            .records()
            .map(|record| -> Result<RawRead, FormatError> {
                let record = record.map_err(|e| record_error("FASTQ", e.to_string()))?;
                Ok(RawRead::new(
                    Some(record.id().to_string()),
                    String::from_utf8_lossy(record.seq()).into_owned(),
                ))
            })
            .collect(),
        SequenceFormat::Fasta => fasta::Reader::new(Cursor::new(text))
            .records()
            .map(|record| -> Result<RawRead, FormatError> {
                let record = record.map_err(|e| record_error("FASTA", e.to_string()))?;
                Ok(RawRead::new(
                    Some(record.id().to_string()),
                    String::from_utf8_lossy(record.seq()).into_owned(),
                ))
            })
            .collect(),
        SequenceFormat::Lines => Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(RawRead::unnamed)
            .collect()),
    }
}

/// Write one FASTA record, wrapping at `line_width` (0 = no wrap).
pub fn write_fasta_record<W: Write>(
    out: &mut W,
    header: &str,
    sequence: &str,
    line_width: usize,
) -> std::io::Result<()> {
    writeln!(out, ">{header}")?;
    if line_width == 0 || sequence.is_empty() {
        return writeln!(out, "{sequence}");
    }
    for chunk in sequence.as_bytes().chunks(line_width) {
        out.write_all(chunk)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Header used for a contig in FASTA output.
pub fn contig_header(index: usize, contig: &Sequence) -> String {
    format!(
        "contig_{index} id={} reads={} len={}",
        contig.id(),
        contig.origin().len(),
        contig.len()
    )
}

/// Write every contig as its own record.
pub fn write_contigs<W: Write>(
    out: &mut W,
    contigs: &[Sequence],
    line_width: usize,
) -> std::io::Result<()> {
    for (index, contig) in contigs.iter().enumerate() {
        write_fasta_record(out, &contig_header(index, contig), contig.content(), line_width)?;
    }
    Ok(())
}

/// Write all contigs concatenated into one `super_sequence` record.
pub fn write_super_sequence<W: Write>(
    out: &mut W,
    contigs: &[Sequence],
    line_width: usize,
) -> std::io::Result<()> {
    let joined: String = contigs.iter().map(Sequence::content).collect();
    write_fasta_record(out, "super_sequence", &joined, line_width)
}
