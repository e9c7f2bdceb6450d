use rand::RngCore;

/// Random 128-bit identifier for upload previews, hex encoded.
pub fn generate_preview_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_ids_are_unique_hex() {
        let a = generate_preview_id();
        let b = generate_preview_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
