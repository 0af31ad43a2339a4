//! Transparent decompression of raw dataset files.
//!
//! Raw files are fetched from the repository either plain or compressed. The
//! decoder opens them through [`open_decompressed`], which picks a codec by
//! file extension first and falls back to magic-byte sniffing, so a gzip file
//! without a `.gz` suffix still decodes.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags, the following codecs are available:
//! - **Gzip** (`.gz`) - via `flate2` crate (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` crate (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` crate (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` crate (feature: `compression-xz`)

use crate::error::{DatasetError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A compression algorithm the raw-file reader understands.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip", "zstd").
    fn name(&self) -> &'static str;

    /// Lowercase file extensions, leading dot included.
    fn extensions(&self) -> &'static [&'static str];

    /// Signature at the start of a compressed stream.
    fn magic_bytes(&self) -> &'static [u8];

    /// Wrap a reader with decompression.
    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;

    /// Wrap a writer with compression.
    fn wrap_writer(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>>;
}

/// Codecs compiled into this build, in detection order.
#[must_use]
pub fn builtin_codecs() -> Vec<&'static dyn CompressionCodec> {
    let codecs: Vec<&'static dyn CompressionCodec> = vec![
        #[cfg(feature = "compression-gzip")]
        &GzipCodec,
        #[cfg(feature = "compression-zstd")]
        &ZstdCodec,
        #[cfg(feature = "compression-bzip2")]
        &Bzip2Codec,
        #[cfg(feature = "compression-xz")]
        &XzCodec,
    ];
    codecs
}

/// Codec whose extension matches `path`, case-insensitively.
#[must_use]
pub fn codec_for_path(path: &Path) -> Option<&'static dyn CompressionCodec> {
    let lower = path.to_string_lossy().to_lowercase();
    builtin_codecs()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| lower.ends_with(ext)))
}

fn codec_for_magic<R: BufRead>(reader: &mut R) -> Option<&'static dyn CompressionCodec> {
    let head = reader.fill_buf().ok()?;
    if head.is_empty() {
        return None;
    }
    builtin_codecs()
        .into_iter()
        .find(|codec| head.starts_with(codec.magic_bytes()))
}

/// Open `path` for reading, decompressing it when a codec applies.
///
/// # Errors
/// Returns [`DatasetError::Io`] if the file cannot be opened or the
/// decompressor cannot be set up.
pub fn open_decompressed(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| DatasetError::io("open", path, e))?;

    if let Some(codec) = codec_for_path(path) {
        return codec
            .wrap_reader(Box::new(file))
            .map_err(|e| DatasetError::io("decompress", path, e));
    }

    let mut buffered = BufReader::new(file);
    if let Some(codec) = codec_for_magic(&mut buffered) {
        tracing::debug!(codec = codec.name(), path = %path.display(), "detected compression from magic bytes");
        return codec
            .wrap_reader(Box::new(buffered))
            .map_err(|e| DatasetError::io("decompress", path, e));
    }

    Ok(Box::new(buffered))
}

/// Create `path` for writing, compressing by extension.
///
/// The returned writer finishes the compressed stream when dropped; call
/// `flush` first to observe write errors.
///
/// # Errors
/// Returns [`DatasetError::Io`] if the file cannot be created.
pub fn create_compressed(path: &Path) -> Result<Box<dyn Write>> {
    let file = File::create(path).map_err(|e| DatasetError::io("create", path, e))?;
    match codec_for_path(path) {
        Some(codec) => codec
            .wrap_writer(Box::new(file))
            .map_err(|e| DatasetError::io("compress", path, e)),
        None => Ok(Box::new(BufWriter::new(file))),
    }
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> &'static [u8] {
        &[0x1f, 0x8b]
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>> {
        Ok(Box::new(flate2::write::GzEncoder::new(
            writer,
            flate2::Compression::default(),
        )))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> &'static [u8] {
        &[0x28, 0xb5, 0x2f, 0xfd]
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>> {
        zstd::stream::write::Encoder::new(writer, 3)
            .map(|e| Box::new(e.auto_finish()) as Box<dyn Write>)
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> &'static [u8] {
        b"BZh"
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(bzip2::read::BzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>> {
        Ok(Box::new(bzip2::write::BzEncoder::new(
            writer,
            bzip2::Compression::default(),
        )))
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &'static str {
        "xz"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> &'static [u8] {
        &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(xz2::read::XzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>> {
        Ok(Box::new(xz2::write::XzEncoder::new(writer, 6)))
    }
}
