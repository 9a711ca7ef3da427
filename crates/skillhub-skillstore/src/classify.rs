//! Text/binary classification for skill files.
//!
//! Media types known to be opaque are rejected from the file name alone.
//! Everything else is sniffed: the first bytes must decode as UTF-8.
//! False positives and negatives are tolerated by the assembler.

use mime_guess::mime;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Bytes read when sniffing a file
pub const SNIFF_LEN: u64 = 512;

/// Extensions some MIME tables register as media but which are source code
const SOURCE_EXTENSIONS: &[&str] = &["ts", "mts", "cts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Text,
    Binary,
}

pub fn classify(path: &Path) -> ContentClass {
    if is_opaque_media(path) {
        debug!("Classified {} as binary by media type", path.display());
        return ContentClass::Binary;
    }

    if prefix_is_utf8(path) {
        ContentClass::Text
    } else {
        ContentClass::Binary
    }
}

pub fn is_text(path: &Path) -> bool {
    classify(path) == ContentClass::Text
}

fn is_opaque_media(path: &Path) -> bool {
    let is_source = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if is_source {
        return false;
    }

    match mime_guess::from_path(path).first() {
        Some(guess) => {
            let top = guess.type_();
            top == mime::IMAGE
                || top == mime::VIDEO
                || top == mime::AUDIO
                || guess.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str()
        }
        None => false,
    }
}

fn prefix_is_utf8(path: &Path) -> bool {
    let mut prefix = Vec::with_capacity(SNIFF_LEN as usize);
    let read = File::open(path).and_then(|file| file.take(SNIFF_LEN).read_to_end(&mut prefix));
    if let Err(e) = read {
        debug!("Failed to sniff {}: {}", path.display(), e);
        return false;
    }

    match std::str::from_utf8(&prefix) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff limit
        Err(e) => e.error_len().is_none() && prefix.len() as u64 == SNIFF_LEN,
    }
}
