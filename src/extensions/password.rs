use crate::config::Settings;
use crate::error::{AppError, InitError};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Password hashing with a configurable work factor (`BCRYPT_LOG_ROUNDS`).
#[derive(Debug, Clone, Copy)]
pub struct Bcrypt {
    log_rounds: u32,
}

impl Bcrypt {
    pub fn init_app(settings: &Settings) -> Result<Self, InitError> {
        let rounds = settings
            .get_u64("BCRYPT_LOG_ROUNDS")?
            .unwrap_or(u64::from(DEFAULT_COST));
        if !(4..=31).contains(&rounds) {
            return Err(InitError::extension(
                "bcrypt",
                format!("BCRYPT_LOG_ROUNDS must be within 4..=31, got {}", rounds),
            ));
        }
        Ok(Bcrypt {
            log_rounds: rounds as u32,
        })
    }

    pub fn log_rounds(&self) -> u32 {
        self.log_rounds
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.log_rounds)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    pub fn check_password(&self, hashed_password: &str, password: &str) -> Result<bool, AppError> {
        verify(password, hashed_password)
            .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
    }
}
