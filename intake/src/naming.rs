//! Naming helpers: random identifiers for stored uploads, extensions, and slugs.

use rand::prelude::RngExt;
use rand::rng;

use crate::errors::{Error, Result};

/// Length of the random stem given to renamed uploads (64^25 possible names).
pub const STORED_NAME_LEN: usize = 25;

const ALPHABET: &[u8; 64] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-";

/// Generate `len` characters drawn uniformly from a 64-symbol, filename-safe alphabet.
///
/// Uses the thread-local CSPRNG, so the output is suitable for names that must not be guessable.
pub fn random_string(len: usize) -> String {
    let mut rng = rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Extension of `name` including the leading dot, or `""` when there is none.
///
/// Only the final path component is inspected, so `"archive.tar.gz"` yields `".gz"`.
pub fn extension(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.rfind('.').map(|dot| &base[dot..]).unwrap_or("")
}

/// Name to store an upload under: a fresh random stem plus the original extension,
/// or the original name verbatim when `rename` is false.
pub fn stored_name(original: &str, rename: bool) -> String {
    if rename {
        format!("{}{}", random_string(STORED_NAME_LEN), extension(original))
    } else {
        original.to_string()
    }
}

/// Build a URL slug: lowercase, every run of characters outside `[a-z0-9]` becomes a single `-`,
/// and leading/trailing dashes are trimmed.
pub fn slugify(input: &str) -> Result<String> {
    if input.is_empty() {
        return Err(Error::invalid_input("empty string not permitted"));
    }

    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return Err(Error::invalid_input("after removing characters, slug is zero length"));
    }
    Ok(slug)
}
