use rand::{distr::Alphanumeric, Rng as _};

pub const CODE_LENGTH: usize = 8;

/// One-time code mailed to a new user and exchanged for an access token
#[derive(Clone, PartialEq, Eq)]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    pub fn generate() -> Self {
        let code = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(CODE_LENGTH)
            .map(char::from)
            .collect();
        ConfirmationCode(code)
    }
}

impl AsRef<str> for ConfirmationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Keep codes out of logs
impl std::fmt::Debug for ConfirmationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConfirmationCode(***)")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate() {
        let codes: HashSet<String> = (0..100)
            .map(|_| ConfirmationCode::generate().as_ref().to_string())
            .collect();
        assert!(codes.len() > 95);
        for code in codes {
            assert_eq!(CODE_LENGTH, code.len());
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_debug_hides_code() {
        let code = ConfirmationCode::generate();
        assert!(!format!("{code:?}").contains(code.as_ref()));
    }
}
