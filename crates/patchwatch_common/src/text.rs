//! Best-effort text decoding

/// Decode bytes as UTF-8, dropping invalid sequences instead of failing
pub fn decode_best_effort(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_utf8_is_unchanged() {
        assert_eq!(decode_best_effort("Setting up libssl3 …".as_bytes()), "Setting up libssl3 …");
    }

    #[test]
    fn test_invalid_sequences_are_dropped() {
        let bytes = b"Get:1 http://mirror \xff\xfeok\n";
        assert_eq!(decode_best_effort(bytes), "Get:1 http://mirror ok\n");
    }
}
