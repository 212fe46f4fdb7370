// utils/code_generator.rs
use rand::Rng;

/// Fixed-length numeric one-time code used for contract signing.
pub fn generate_sign_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_sign_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
