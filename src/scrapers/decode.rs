use std::borrow::Cow;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DecodeError;

/// Anti-hijacking marker the maps RPC endpoints put in front of their JSON.
pub const XSSI_PREFIX: &[u8] = b")]}'";

const BROTLI_BUFFER: usize = 4096;

/// Decode a raw payload into a tree.
///
/// Decompression is best effort: bytes that are not a brotli stream are used
/// as-is. Only a JSON parse failure is reported, and the caller is expected to
/// skip that payload.
pub fn decode(raw: &[u8]) -> Result<Value, DecodeError> {
    let raw = strip_prefix(raw);

    match decompress(raw) {
        Some(inflated) => {
            let text = strip_prefix(&inflated);
            match serde_json::from_slice(text) {
                Ok(tree) => Ok(tree),
                Err(err) => {
                    debug!("Decompressed payload did not parse ({err}), retrying raw bytes");
                    parse_text(raw)
                }
            }
        }
        None => parse_text(raw),
    }
}

/// Decode a body as handed over by DevTools, which base64-encodes bodies it
/// does not consider text.
pub fn decode_captured(body: &str, base64_encoded: bool) -> Result<Value, DecodeError> {
    decode(&payload_bytes(body, base64_encoded)?)
}

/// Wire bytes of a captured body, undoing the DevTools base64 wrapping.
pub fn payload_bytes(body: &str, base64_encoded: bool) -> Result<Cow<'_, [u8]>, DecodeError> {
    if base64_encoded {
        let bytes = base64::engine::general_purpose::STANDARD.decode(body.trim())?;
        Ok(Cow::Owned(bytes))
    } else {
        Ok(Cow::Borrowed(body.as_bytes()))
    }
}

fn strip_prefix(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(XSSI_PREFIX).unwrap_or(bytes)
}

/// Returns `None` when the bytes are not a brotli stream or do not inflate to UTF-8.
fn decompress(raw: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut reader = brotli::Decompressor::new(raw, BROTLI_BUFFER);
    if let Err(err) = reader.read_to_end(&mut out) {
        debug!("Brotli decompression failed ({err}), treating payload as plain text");
        return None;
    }
    if std::str::from_utf8(&out).is_err() {
        debug!("Brotli output is not UTF-8, treating payload as plain text");
        return None;
    }
    Some(out)
}

fn parse_text(bytes: &[u8]) -> Result<Value, DecodeError> {
    let text: Cow<'_, str> = String::from_utf8_lossy(bytes);
    Ok(serde_json::from_str(text.as_ref())?)
}

/// Writes raw and decoded payloads to a directory for offline inspection.
#[derive(Debug)]
pub struct PayloadDump {
    dir: PathBuf,
    seq: usize,
}

impl PayloadDump {
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, seq: 0 })
    }

    /// Persist one payload. Failures are logged and otherwise ignored.
    pub fn record(&mut self, raw: &[u8], tree: Option<&Value>) {
        self.seq += 1;
        let stem = format!("{}_{:04}", Utc::now().format("%Y%m%d_%H%M%S"), self.seq);

        let raw_path = self.dir.join(format!("{stem}.bin"));
        if let Err(err) = fs::write(&raw_path, raw) {
            warn!("Could not write {}: {err}", raw_path.display());
        }

        if let Some(tree) = tree {
            let json_path = self.dir.join(format!("{stem}.json"));
            let written = serde_json::to_string_pretty(tree)
                .map_err(std::io::Error::from)
                .and_then(|json| fs::write(&json_path, json));
            if let Err(err) = written {
                warn!("Could not write {}: {err}", json_path.display());
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn brotli(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 9, 22);
            writer.write_all(bytes).unwrap();
        }
        out
    }

    const BODY: &str = r#"[null,null,[[["a",1]]],"token"]"#;

    #[test]
    fn plain_json_falls_back_to_text() {
        let tree = decode(BODY.as_bytes()).unwrap();
        assert_eq!(tree, json!([null, null, [[["a", 1]]], "token"]));
    }

    #[test]
    fn prefix_is_stripped() {
        let prefixed = format!(")]}}'\n{BODY}");
        assert_eq!(
            decode(prefixed.as_bytes()).unwrap(),
            decode(BODY.as_bytes()).unwrap()
        );
    }

    #[test]
    fn brotli_payload_is_inflated() {
        let compressed = brotli(BODY.as_bytes());
        assert_eq!(
            decode(&compressed).unwrap(),
            decode(BODY.as_bytes()).unwrap()
        );
    }

    #[test]
    fn prefix_inside_compressed_stream_is_stripped() {
        let compressed = brotli(format!(")]}}'\n{BODY}").as_bytes());
        assert_eq!(
            decode(&compressed).unwrap(),
            decode(BODY.as_bytes()).unwrap()
        );
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            decode(b")]}'\nnot json at all"),
            Err(DecodeError::Parse(_))
        ));
    }

    #[test]
    fn base64_body_is_decoded() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(brotli(BODY.as_bytes()));
        assert_eq!(
            decode_captured(&encoded, true).unwrap(),
            decode(BODY.as_bytes()).unwrap()
        );
    }

    #[test]
    fn payload_bytes_unwraps_base64() {
        let compressed = brotli(BODY.as_bytes());
        let encoded = base64::engine::general_purpose::STANDARD.encode(&compressed);
        assert_eq!(payload_bytes(&encoded, true).unwrap().as_ref(), compressed.as_slice());
        assert_eq!(payload_bytes(BODY, false).unwrap().as_ref(), BODY.as_bytes());
    }

    #[test]
    fn invalid_base64_is_reported() {
        assert!(matches!(
            decode_captured("@@not base64@@", true),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn dump_writes_raw_and_pretty_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut dump = PayloadDump::new(dir.path().join("debug")).unwrap();
        dump.record(b"raw", Some(&json!([1, 2])));
        dump.record(b"raw", None);

        let mut names: Vec<_> = fs::read_dir(dump.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names.len(), 3);
        assert_eq!(names.iter().filter(|n| n.ends_with(".bin")).count(), 2);
    }
}
