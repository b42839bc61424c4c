//! Compression detection and in-memory decompression for delimited input files.

use clap::ValueEnum;
use color_eyre::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        // Check final extension (e.g., .csv.gz -> gz)
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            match ext.to_lowercase().as_str() {
                "gz" => Some(Self::Gzip),
                "zst" | "zstd" => Some(Self::Zstd),
                "bz2" | "bz" => Some(Self::Bzip2),
                "xz" => Some(Self::Xz),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// Read the file and decompress its entire contents into memory.
pub fn decompress_to_memory(path: &Path, format: CompressionFormat) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut decompressed = Vec::new();
    match format {
        CompressionFormat::Gzip => {
            let mut decoder = flate2::read::MultiGzDecoder::new(reader);
            decoder.read_to_end(&mut decompressed)?;
        }
        CompressionFormat::Zstd => {
            let mut decoder = zstd::stream::read::Decoder::new(reader)?;
            decoder.read_to_end(&mut decompressed)?;
        }
        CompressionFormat::Bzip2 => {
            let mut decoder = bzip2::read::BzDecoder::new(reader);
            decoder.read_to_end(&mut decompressed)?;
        }
        CompressionFormat::Xz => {
            let mut decoder = xz2::read::XzDecoder::new(reader);
            decoder.read_to_end(&mut decompressed)?;
        }
    }
    Ok(decompressed)
}
