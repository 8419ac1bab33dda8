//! Custom macros for the player binary

/// Validate an enum-like string value
///
/// # Example
/// ```ignore
/// validate_enum!(backend, "headless", "wayland");
/// validate_enum!(log_level, "trace", "debug", "info", "warn", "error");
/// ```
#[macro_export]
macro_rules! validate_enum {
    ($value:expr, $($variant:expr),+) => {
        match $value {
            $($variant)|+ => Ok(()),
            _ => anyhow::bail!("Invalid value: {} (expected one of: {})", $value, [$($variant),+].join(", ")),
        }
    };
}
