use super::Platform;
use crate::error::AccessError;
use std::sync::Arc;

/// No native backend exists for this platform.
pub fn native_platform() -> Result<Arc<dyn Platform>, AccessError> {
    Err(AccessError::UnsupportedOs(std::env::consts::OS.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_platform_is_unsupported() {
        assert!(matches!(
            native_platform(),
            Err(AccessError::UnsupportedOs(os)) if os == std::env::consts::OS
        ));
    }
}
