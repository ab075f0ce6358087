//! Opaque id generation for projects and tasks.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Generate an opaque 8-character lowercase-alphanumeric id.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .map(|c| c.to_ascii_lowercase())
        .take(8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_eight_char_ids() {
        let id = generate_id();
        assert_eq!(id.chars().count(), 8);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn ids_are_not_trivially_repeated() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
    }
}
