//! `iconsmith://apply?files=...` deep links
//!
//! The file list is comma separated; each entry is percent-encoded on its
//! own, so commas inside a path survive. Entries may be plain paths or
//! `file://` URLs. Decoding is plain percent-decoding: a literal `+` stays
//! a `+`.

use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::error::{AppError, AppResult};

pub const SCHEME: &str = "iconsmith";

/// Escaped in each entry: everything but unreserved characters and `/`
const ENTRY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the deep link asking the app to apply an icon to `files`
pub fn apply_uri(files: &[PathBuf]) -> String {
    let encoded: Vec<String> = files
        .iter()
        .map(|path| utf8_percent_encode(&path.to_string_lossy(), ENTRY).to_string())
        .collect();
    format!("{SCHEME}://apply?files={}", encoded.join(","))
}

/// Parse an apply deep link into its file list
pub fn parse_apply_uri(uri: &str) -> AppResult<Vec<PathBuf>> {
    let url = Url::parse(uri).map_err(|err| AppError::InvalidDeepLink(err.to_string()))?;

    if url.scheme() != SCHEME {
        return Err(AppError::InvalidDeepLink(format!("unexpected scheme {}", url.scheme())));
    }
    if url.host_str() != Some("apply") {
        return Err(AppError::InvalidDeepLink("only the apply action is supported".into()));
    }

    let query = url.query().unwrap_or_default();
    let raw_files = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("files="))
        .ok_or_else(|| AppError::InvalidDeepLink("missing files parameter".into()))?;

    Ok(raw_files
        .split(',')
        .filter(|piece| !piece.is_empty())
        .filter_map(decode_entry)
        .collect())
}

fn decode_entry(piece: &str) -> Option<PathBuf> {
    let decoded = match percent_decode_str(piece).decode_utf8() {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::debug!(entry = piece, error = %err, "skipping undecodable deep-link entry");
            return None;
        }
    };

    if decoded.starts_with("file://") {
        return Url::parse(&decoded).ok()?.to_file_path().ok();
    }
    Some(Path::new(decoded.as_ref()).to_path_buf())
}
