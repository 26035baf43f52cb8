use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid gzip payload: {0}")]
    Gzip(#[from] std::io::Error),
}

/// Gzip-frames a request body.
pub fn compress(body: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body)
        .expect("writing to an in-memory encoder cannot fail");
    encoder
        .finish()
        .expect("finishing an in-memory encoder cannot fail")
}

/// Inflates a gzip-framed body back to the original byte sequence.
pub fn decompress(body: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(body);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_restores_identical_bytes() {
        let body = br#"[{"id":"Alloc","type":"gauge","value":22.2}]"#;
        let compressed = compress(body);
        assert_ne!(compressed.as_slice(), body.as_slice());
        assert_eq!(decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn decompress_rejects_garbage() {
        assert!(decompress(b"definitely not gzip").is_err());
    }

    #[test]
    fn empty_body_round_trips() {
        assert_eq!(decompress(&compress(b"")).unwrap(), b"");
    }
}
