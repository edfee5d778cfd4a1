//! Raw little-endian PCM16 impulse responses.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, SynthError};

/// Decode little-endian 16-bit samples. A trailing odd byte is ignored.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Read a headerless PCM16 file.
pub fn read_pcm16_file(path: &Path) -> Result<Vec<i16>> {
    let bytes = std::fs::read(path).map_err(|source| SynthError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let samples = decode_pcm16_le(&bytes);
    debug!(path = %path.display(), samples = samples.len(), "impulse response read");
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_pairs() {
        let bytes = [0x01, 0x00, 0xff, 0x7f, 0x00, 0x80, 0xff, 0xff, 0x42];
        assert_eq!(decode_pcm16_le(&bytes), vec![1, i16::MAX, i16::MIN, -1]);
        assert!(decode_pcm16_le(&[0x10]).is_empty());
    }

    #[test]
    fn reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("engine-synth-ir-{}.pcm", std::process::id()));
        std::fs::write(&path, [0x10, 0x27, 0xf0, 0xd8]).expect("write temp file");
        let samples = read_pcm16_file(&path).expect("read");
        let _ = std::fs::remove_file(&path);
        assert_eq!(samples, vec![10000, -10000]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_pcm16_file(Path::new("/nonexistent/ir.pcm")).expect_err("missing");
        assert!(matches!(err, SynthError::Io { .. }));
    }
}
