//! Trade volume value object.

use crate::error::ValidationError;

/// Non-negative trade volume (shares/contracts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u64);

impl Volume {
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if raw < 0 {
            return Err(ValidationError::new(
                "volume",
                "volume_nonneg",
                format!("volume must be >= 0, got {raw}"),
            ));
        }
        Ok(Self(raw as u64))
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_zero() {
        assert_eq!(Volume::new(0).unwrap().as_u64(), 0);
    }

    #[test]
    fn rejects_negative() {
        assert!(Volume::new(-1).is_err());
    }
}
