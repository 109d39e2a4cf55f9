//! Device geolocation.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::request::Coordinates;

/// A source of the device's current position.
#[async_trait]
pub trait Geolocator: Send + Sync + std::fmt::Debug {
    /// The current position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geolocation`] if the position cannot be determined.
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub Coordinates);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates> {
        Ok(self.0)
    }
}

/// A device without location support.
#[derive(Debug, Clone, Default)]
pub struct UnavailableGeolocator {
    reason: Option<String>,
}

impl UnavailableGeolocator {
    /// Fail with the given reason.
    #[must_use]
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl Geolocator for UnavailableGeolocator {
    async fn current_position(&self) -> Result<Coordinates> {
        Err(Error::geolocation(
            self.reason
                .clone()
                .unwrap_or_else(|| "geolocation is not supported".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed() {
        let geo = FixedGeolocator(Coordinates { lat: 1.5, lng: 2.5 });
        let pos = geo.current_position().await.unwrap();
        assert!((pos.lat - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let err = UnavailableGeolocator::with_reason("permission denied")
            .current_position()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(
            err.user_message(),
            "Could not get your location. Please enter it manually."
        );
    }
}
