use rand::{Rng, distr::Alphanumeric};

pub const SESSION_TOKEN_LENGTH: usize = 48;
pub const OTP_CODE_LENGTH: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WeakPasswordReason {
    TooShort,
    TooLong,
    TooWeak,
}

impl std::fmt::Display for WeakPasswordReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeakPasswordReason::TooShort => write!(f, "password must be at least 8 characters"),
            WeakPasswordReason::TooLong => write!(f, "password must be at most 128 characters"),
            WeakPasswordReason::TooWeak => write!(f, "password is too weak"),
        }
    }
}

#[derive(Debug)]
pub struct HashError(pub String);

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to hash secret: {}", self.0)
    }
}

/// Hashing and generation of every secret the server hands out or stores.
pub trait CredentialService {
    fn hash_secret(&self, secret: &str) -> Result<String, HashError>;
    fn verify_secret(&self, secret: &str, hash: &str) -> bool;
    fn check_password_strength(&self, password: &str) -> Result<(), WeakPasswordReason>;
    fn generate_session_token(&self) -> String;
    fn generate_otp_code(&self) -> String;
}

pub struct BcryptCredentialService {
    cost: u32,
}

impl BcryptCredentialService {
    pub const MIN_PASSWORD_LENGTH: usize = 8;
    pub const MAX_PASSWORD_LENGTH: usize = 128;
    pub const MIN_PASSWORD_SCORE: f64 = 60.0;
    pub const MIN_COST: u32 = 4;
    pub const MAX_COST: u32 = 31;

    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(Self::MIN_COST, Self::MAX_COST),
        }
    }
}

impl Default for BcryptCredentialService {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialService for BcryptCredentialService {
    fn hash_secret(&self, secret: &str) -> Result<String, HashError> {
        bcrypt::hash(secret, self.cost).map_err(|e| HashError(e.to_string()))
    }

    fn verify_secret(&self, secret: &str, hash: &str) -> bool {
        match bcrypt::verify(secret, hash) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("Failed to verify secret against stored hash: {}", e);
                false
            }
        }
    }

    fn check_password_strength(&self, password: &str) -> Result<(), WeakPasswordReason> {
        let length = password.chars().count();
        if length < Self::MIN_PASSWORD_LENGTH {
            return Err(WeakPasswordReason::TooShort);
        }
        if length > Self::MAX_PASSWORD_LENGTH {
            return Err(WeakPasswordReason::TooLong);
        }
        let analyzed = passwords::analyzer::analyze(password);
        if passwords::scorer::score(&analyzed) < Self::MIN_PASSWORD_SCORE {
            return Err(WeakPasswordReason::TooWeak);
        }
        Ok(())
    }

    fn generate_session_token(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    fn generate_otp_code(&self) -> String {
        let code: u32 = rand::rng().random_range(0..1_000_000);
        format!("{:0width$}", code, width = OTP_CODE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = BcryptCredentialService::new(4);
        let hash = service.hash_secret("123456").unwrap();
        assert_ne!(hash, "123456");
        assert!(service.verify_secret("123456", &hash));
        assert!(!service.verify_secret("654321", &hash));
        assert!(!service.verify_secret("123456", "not a bcrypt hash"));
    }

    #[test]
    fn test_password_strength() {
        let service = BcryptCredentialService::new(4);
        assert_eq!(
            service.check_password_strength("short"),
            Err(WeakPasswordReason::TooShort)
        );
        assert_eq!(
            service.check_password_strength(&"Ab1!".repeat(40)),
            Err(WeakPasswordReason::TooLong)
        );
        assert_eq!(
            service.check_password_strength("aaaaaaaa"),
            Err(WeakPasswordReason::TooWeak)
        );
        assert_eq!(
            service.check_password_strength("Tr0ub4dor&3-Correct-Horse"),
            Ok(())
        );
    }

    #[test]
    fn test_generated_secrets() {
        let service = BcryptCredentialService::default();
        let token = service.generate_session_token();
        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, service.generate_session_token());

        for _ in 0..50 {
            let code = service.generate_otp_code();
            assert_eq!(code.len(), OTP_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
