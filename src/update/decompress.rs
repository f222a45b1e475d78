//! Gzip payload staging.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::config::NODE_SIZE;

/// Decompresses a gzip `payload` into `dest`, returning the bytes written.
///
/// The file is flushed and synced before returning so the following rename
/// publishes complete contents. On error `dest` may hold partial data; the
/// caller removes it.
pub(crate) fn decompress_to_file(payload: &[u8], dest: &Path) -> io::Result<u64> {
    let mut decoder = GzDecoder::new(payload);
    let mut out = BufWriter::new(File::create(dest)?);

    let written = io::copy(&mut decoder, &mut out)?;
    out.flush()?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    if written < NODE_SIZE as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed database is only {} bytes", written),
        ));
    }

    log::debug!("Decompressed update into {} ({} bytes)", dest.display(), written);
    Ok(written)
}
