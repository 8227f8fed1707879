use serde::{Deserialize, Serialize};

use crate::prelude::Result;

/// Formats that are already compressed; zstd would only add overhead.
const INCOMPRESSIBLE_PREFIXES: &[&str] = &["image/", "audio/", "video/", "font/woff"];
const INCOMPRESSIBLE_TYPES: &[&str] = &[
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/zstd",
    "application/x-7z-compressed",
    "application/x-rar-compressed",
    "application/x-bzip2",
    "application/x-xz",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.text",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompressionPolicy {
    pub level: i32,
    /// Payloads below this many bytes are stored as-is.
    pub threshold: u64,
    /// Keep the compressed form only if it is at least this many times smaller.
    pub min_ratio: f64,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        CompressionPolicy {
            level: 3,
            threshold: 1024,
            min_ratio: 1.05,
        }
    }
}

#[derive(Debug)]
pub struct Packed {
    pub bytes: Vec<u8>,
    pub compressed: bool,
}

/// Lowercased MIME type without parameters, e.g. `text/plain; charset=utf-8` -> `text/plain`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

pub fn is_compressible(content_type: &str) -> bool {
    let ct = essence(content_type);
    !(INCOMPRESSIBLE_PREFIXES.iter().any(|p| ct.starts_with(p))
        || INCOMPRESSIBLE_TYPES.contains(&ct.as_str())
        || ct.ends_with("+zip"))
}

impl CompressionPolicy {
    pub fn pack(&self, data: Vec<u8>, content_type: &str) -> Result<Packed> {
        if (data.len() as u64) < self.threshold || !is_compressible(content_type) {
            return Ok(Packed {
                bytes: data,
                compressed: false,
            });
        }
        let packed = zstd::stream::encode_all(data.as_slice(), self.level)?;
        if (data.len() as f64) < packed.len() as f64 * self.min_ratio {
            tracing::debug!(
                "compression not worthwhile for {} ({} -> {} bytes)",
                content_type,
                data.len(),
                packed.len()
            );
            return Ok(Packed {
                bytes: data,
                compressed: false,
            });
        }
        tracing::debug!("compressed {} -> {} bytes", data.len(), packed.len());
        Ok(Packed {
            bytes: packed,
            compressed: true,
        })
    }
}

pub fn unpack(bytes: Vec<u8>, compressed: bool) -> Result<Vec<u8>> {
    if !compressed {
        return Ok(bytes);
    }
    Ok(zstd::stream::decode_all(bytes.as_slice())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize) -> Vec<u8> {
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 56) as u8
            })
            .collect()
    }

    #[test]
    fn text_is_compressed_and_restored() {
        let policy = CompressionPolicy::default();
        let text = "Senior engineer, ten years of Rust and distributed systems.\n".repeat(200);
        let packed = policy
            .pack(text.clone().into_bytes(), "text/plain; charset=utf-8")
            .unwrap();
        assert!(packed.compressed);
        assert!(packed.bytes.len() < text.len());
        assert_eq!(unpack(packed.bytes, true).unwrap(), text.into_bytes());
    }

    #[test]
    fn configured_level_is_used_as_is() {
        let text = "Bench since March, available for a new client.\n".repeat(200);
        for level in [-5, 0, 3, 19] {
            let policy = CompressionPolicy {
                level,
                ..Default::default()
            };
            let packed = policy.pack(text.clone().into_bytes(), "text/plain").unwrap();
            assert!(packed.compressed, "level {}", level);
            let direct = zstd::stream::encode_all(text.as_bytes(), level).unwrap();
            assert_eq!(packed.bytes, direct, "level {}", level);
            assert_eq!(unpack(packed.bytes, true).unwrap(), text.as_bytes());
        }
    }

    #[test]
    fn small_payloads_are_stored_raw() {
        let policy = CompressionPolicy::default();
        let packed = policy.pack(b"short note".to_vec(), "text/plain").unwrap();
        assert!(!packed.compressed);
        assert_eq!(packed.bytes, b"short note");
    }

    #[test]
    fn already_compressed_formats_are_skipped() {
        let policy = CompressionPolicy::default();
        let data = vec![0u8; 8192];
        for ct in ["image/png", "application/pdf", "IMAGE/JPEG", "application/epub+zip"] {
            let packed = policy.pack(data.clone(), ct).unwrap();
            assert!(!packed.compressed, "{} should not be compressed", ct);
            assert_eq!(packed.bytes.len(), data.len());
        }
    }

    #[test]
    fn incompressible_payloads_keep_original_bytes() {
        let policy = CompressionPolicy::default();
        let data = noise(16 * 1024);
        let packed = policy.pack(data.clone(), "application/octet-stream").unwrap();
        assert!(!packed.compressed);
        assert_eq!(packed.bytes, data);
    }

    #[test]
    fn essence_strips_parameters() {
        assert_eq!(essence(" Text/CSV ; charset=utf-8"), "text/csv");
        assert!(is_compressible("text/csv"));
        assert!(!is_compressible("video/mp4"));
    }
}
