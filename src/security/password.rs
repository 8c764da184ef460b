use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub reject_numeric: bool,
    pub reject_common: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            reject_numeric: true,
            reject_common: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argon2Config {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_length: usize,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost_kib: 19456,
            time_cost: 2,
            parallelism: 1,
            output_length: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordIssue {
    TooShort { min: usize },
    TooLong { max: usize },
    EntirelyNumeric,
    CommonPassword,
    SameAsUsername,
    ConfirmationMismatch,
}

impl PasswordIssue {
    pub fn message(&self) -> String {
        match self {
            Self::TooShort { min } => {
                format!("This password is too short. It must contain at least {min} characters.")
            }
            Self::TooLong { max } => format!("Password must be at most {max} characters."),
            Self::EntirelyNumeric => "This password is entirely numeric.".into(),
            Self::CommonPassword => "This password is too common.".into(),
            Self::SameAsUsername => "The password is too similar to the username.".into(),
            Self::ConfirmationMismatch => "The two password fields didn't match.".into(),
        }
    }
}

pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
}

impl PasswordService {
    pub fn new(argon2_config: Argon2Config, policy: PasswordPolicy) -> Result<Self> {
        let params = Params::new(
            argon2_config.memory_cost_kib,
            argon2_config.time_cost,
            argon2_config.parallelism,
            Some(argon2_config.output_length),
        )
        .map_err(|e| anyhow!("Invalid Argon2 parameters: {e}"))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        Ok(Self { argon2, policy })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(Argon2Config::default(), PasswordPolicy::default())
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash format: {e}"))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("Password verification failed: {e}")),
        }
    }

    /// Checks a registration password against the policy. Returns every
    /// problem found, empty when the password is acceptable.
    pub fn validate(&self, password: &str, confirm: &str, username: &str) -> Vec<PasswordIssue> {
        let mut issues = Vec::new();
        let length = password.chars().count();

        if length < self.policy.min_length {
            issues.push(PasswordIssue::TooShort {
                min: self.policy.min_length,
            });
        }
        if length > self.policy.max_length {
            issues.push(PasswordIssue::TooLong {
                max: self.policy.max_length,
            });
        }
        if self.policy.reject_numeric
            && !password.is_empty()
            && password.chars().all(|c| c.is_ascii_digit())
        {
            issues.push(PasswordIssue::EntirelyNumeric);
        }
        if self.policy.reject_common && is_common_password(password) {
            issues.push(PasswordIssue::CommonPassword);
        }
        if !username.is_empty() && password.eq_ignore_ascii_case(username.trim()) {
            issues.push(PasswordIssue::SameAsUsername);
        }
        if password != confirm {
            issues.push(PasswordIssue::ConfirmationMismatch);
        }

        issues
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }
}

fn is_common_password(password: &str) -> bool {
    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "password1",
        "password123",
        "12345678",
        "123456789",
        "1234567890",
        "qwertyuiop",
        "qwerty123",
        "iloveyou",
        "sunshine",
        "football",
        "baseball",
        "welcome1",
        "letmein1",
        "trustno1",
        "superman",
        "princess",
        "admin123",
        "changeme",
        "passw0rd",
        "p@ssw0rd",
        "abcd1234",
        "11111111",
        "00000000",
    ];

    let lower = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|&common| lower == common)
}

pub fn hash_password(password: &str) -> Result<String> {
    let service = PasswordService::with_defaults()?;
    service.hash(password)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let service = PasswordService::with_defaults()?;
    service.verify(password, hash)
}

pub fn validate_password(password: &str, confirm: &str, username: &str) -> Vec<PasswordIssue> {
    match PasswordService::with_defaults() {
        Ok(service) => service.validate(password, confirm, username),
        Err(e) => {
            warn!("Failed to create password service: {e}");
            vec![PasswordIssue::TooShort {
                min: PasswordPolicy::default().min_length,
            }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = PasswordService::with_defaults().expect("Failed to create service");
        let hash = service.hash("correct horse battery").expect("Failed to hash");

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("correct horse battery", &hash).expect("Verify failed"));
        assert!(!service.verify("wrong horse", &hash).expect("Verify failed"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").expect("Hash failed");
        let b = hash_password("same-password").expect("Hash failed");
        assert_ne!(a, b);
        assert!(verify_password("same-password", &b).expect("Verify failed"));
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-hash").is_err());
    }

    #[test]
    fn test_valid_password_has_no_issues() {
        assert!(validate_password("village-learning", "village-learning", "student1").is_empty());
    }

    #[test]
    fn test_policy_rejects_weak_passwords() {
        let issues = validate_password("short", "short", "student1");
        assert!(issues.contains(&PasswordIssue::TooShort { min: 8 }));

        let issues = validate_password("1234567890", "1234567890", "student1");
        assert!(issues.contains(&PasswordIssue::EntirelyNumeric));
        assert!(issues.contains(&PasswordIssue::CommonPassword));

        let issues = validate_password("Teacher007", "Teacher007", "teacher007");
        assert_eq!(issues, vec![PasswordIssue::SameAsUsername]);
    }

    #[test]
    fn test_confirmation_must_match() {
        let issues = validate_password("village-learning", "village-learnin", "student1");
        assert_eq!(issues, vec![PasswordIssue::ConfirmationMismatch]);
        assert_eq!(
            PasswordIssue::ConfirmationMismatch.message(),
            "The two password fields didn't match."
        );
    }
}
