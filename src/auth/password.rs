use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Lowest accepted cost factor (16 KiB of memory per hash).
pub const MIN_HASH_COST: u32 = 4;
/// Highest accepted cost factor (4 GiB of memory per hash).
pub const MAX_HASH_COST: u32 = 22;
pub const DEFAULT_HASH_COST: u32 = 12;

/// Argon2 passes over memory; the cost factor scales memory instead.
const TIME_COST: u32 = 3;

/// Salted Argon2id password hashing with a tunable cost factor.
///
/// The cost is the base-2 logarithm of the memory used, in KiB, so each
/// increment doubles the work of a guess. Digests are PHC strings carrying
/// their own parameters, which keeps old digests verifiable after the cost
/// changes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_HASH_COST,
        }
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_HASH_COST, MAX_HASH_COST),
        }
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(1 << self.cost, TIME_COST, 1, None)
            .map_err(|e| anyhow!("Invalid Argon2 parameters: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored digest.
    ///
    /// A malformed digest verifies as `false`.
    #[must_use]
    pub fn verify(&self, password: &str, password_hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
