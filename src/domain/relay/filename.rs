use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Longest slice of cleaned text carried into the filename.
const MAX_TEXT_LEN: usize = 30;

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").unwrap())
}

/// Build the cache path for one synthesis request.
///
/// `{character}_{cleaned text}_{YYYYMMDD_HHMMSS}.wav`, where the text is
/// stripped of everything that is not a word character or whitespace,
/// truncated to 30 code points and underscored. Text that cleans down to
/// nothing falls back to an 8-hex-char hash of the raw text. The timestamp
/// is passed in so the rule stays deterministic under test.
pub fn generate_filename(
    cache_dir: &Path,
    text: &str,
    character: &str,
    now: DateTime<Utc>,
) -> PathBuf {
    let timestamp = now.format("%Y%m%d_%H%M%S");

    let clean: String = punctuation()
        .replace_all(text, "")
        .chars()
        .take(MAX_TEXT_LEN)
        .collect();
    let clean = clean.trim();

    let filename = if clean.is_empty() {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let hash: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
        format!("{}_{}_{}.wav", character, hash, timestamp)
    } else {
        format!("{}_{}_{}.wav", character, clean.replace(' ', "_"), timestamp)
    };

    cache_dir.join(filename)
}
