pub mod error;
pub mod timeunit;

/// Seconds since the Unix epoch with sub-second precision, as stored in
/// every result descriptor.
#[macro_export]
macro_rules! epoch_seconds {
    () => {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(std::time::Duration::default())
            .as_secs_f64()
    };
}
