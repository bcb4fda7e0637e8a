//! Readers and writers for the tabular files the pipeline consumes.
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

/// Build a CSV reader with the conventions shared by every input table:
/// a header row, whitespace-trimmed cells and `#` comment lines.
pub fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader)
}

pub fn open_csv(path: &Path) -> std::io::Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(csv_reader(BufReader::new(file)))
}

/// Open a gzip-compressed CSV file.
pub fn open_gzip_csv(path: &Path) -> std::io::Result<csv::Reader<GzDecoder<BufReader<File>>>> {
    let file = File::open(path)?;
    Ok(csv_reader(GzDecoder::new(BufReader::new(file))))
}

pub fn create_csv(path: &Path) -> std::io::Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path)?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}
