//! Android is declared but not implemented yet.

use super::{DriverError, DriverStrategy, Platform, RawDriver};
use async_trait::async_trait;
use std::sync::Arc;

/// Fails every construction with [`DriverError::Unsupported`] before touching
/// any endpoint. There is no Android device configuration to build
/// UiAutomator2 capabilities from.
pub struct AndroidStrategy;

#[async_trait]
impl DriverStrategy for AndroidStrategy {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    async fn construct(&self, _target: Option<&str>) -> Result<Arc<dyn RawDriver>, DriverError> {
        Err(DriverError::Unsupported(Platform::Android.to_string()))
    }
}
