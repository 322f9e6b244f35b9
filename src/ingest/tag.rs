use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound (exclusive) of the tag range: tags are 10-digit numbers.
pub const TAG_SPAN: u64 = 10_000_000_000;

/// Derive a stable numeric tag for a source string.
///
/// Keyed HMAC-SHA-256 over the UTF-8 bytes of `source`, reduced modulo
/// 10^10. Deterministic for a fixed secret; not predictable without it.
/// Tags are a coarse grouping key, not globally unique across sources.
pub fn derive_tag(source: &str, secret: &[u8]) -> u64 {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(source.as_bytes());
    let digest = mac.finalize().into_bytes();

    // Reduce the full 32-byte digest modulo 10^10, byte by byte, so the
    // result matches interpreting the digest as one big-endian integer.
    let mut acc: u64 = 0;
    for byte in digest {
        acc = (acc * 256 + byte as u64) % TAG_SPAN;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret";

    #[test]
    fn deterministic_for_same_source() {
        let a = derive_tag("https://example.com/article", SECRET);
        let b = derive_tag("https://example.com/article", SECRET);
        assert_eq!(a, b);
    }

    #[test]
    fn always_within_ten_digits() {
        for source in ["", "a", "https://example.com", "日本語のソース", "x".repeat(10_000).as_str()] {
            assert!(derive_tag(source, SECRET) < TAG_SPAN);
        }
    }

    #[test]
    fn different_sources_differ() {
        let a = derive_tag("https://example.com/a", SECRET);
        let b = derive_tag("https://example.com/b", SECRET);
        assert_ne!(a, b);
    }

    #[test]
    fn secret_keys_the_output() {
        let a = derive_tag("https://example.com", b"key-one");
        let b = derive_tag("https://example.com", b"key-two");
        assert_ne!(a, b);
    }
}
