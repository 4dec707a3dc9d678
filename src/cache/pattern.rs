//! Glob-style key patterns shared by every backend.
//!
//! Only two wildcards are recognised: `*` matches any run of bytes
//! (including none) and `?` matches exactly one byte. Everything else is
//! literal and the pattern must match the whole key.
//!
//! Matching works on the UTF-8 bytes of the key, as Redis `SCAN MATCH`
//! does, so `?` never matches a multi-byte character.

use std::fmt::Write;

use regex::bytes::Regex;

use crate::cache::CacheError;

/// A compiled key pattern such as `product:*` or `farm:?:products`.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self, CacheError> {
        if pattern.is_empty() {
            return Err(CacheError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern cannot be empty".to_string(),
            });
        }

        let mut expr = String::with_capacity(pattern.len() * 2 + 6);
        expr.push_str("(?s-u)^");
        let mut literal = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other if other.is_ascii() => {
                    expr.push_str(&regex::escape(other.encode_utf8(&mut literal)))
                }
                other => {
                    for byte in other.encode_utf8(&mut literal).bytes() {
                        let _ = write!(expr, "\\x{:02X}", byte);
                    }
                }
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written by the caller.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `key` matches the whole pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key.as_bytes())
    }

    /// The pattern in Redis `MATCH` syntax.
    ///
    /// Redis also treats `[`, `]` and `\` as glob syntax; they are escaped so
    /// a remote store matches exactly the keys the memory store would.
    pub fn redis_glob(&self) -> String {
        let mut glob = String::with_capacity(self.source.len());
        for ch in self.source.chars() {
            if matches!(ch, '[' | ']' | '\\') {
                glob.push('\\');
            }
            glob.push(ch);
        }
        glob
    }
}
