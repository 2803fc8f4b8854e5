use blake3::Hasher;

pub fn blake3_hex(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}

/// Trims every token and drops the empty ones and the `all` sentinel.
pub fn meaningful_tokens(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && *t != crate::taxonomy::ALL_SENTINEL)
        .collect()
}

/// Pushes `value` unless it is already present; keeps first-seen order.
pub fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}
