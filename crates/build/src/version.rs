/// Placeholder replaced by the version token in file item paths.
pub const VERSION_PLACEHOLDER: &str = "%version%";

/// Content-derived token for a built body: CRC32 as 8 lower-case hex digits.
///
/// Only used for change detection and cache busting, so a fast checksum is
/// enough.
///
/// ```
/// assert_eq!(themer_build::version_token(b"hello"), "3610a686");
/// ```
pub fn version_token(body: &[u8]) -> String {
    format!("{:08x}", crc32fast::hash(body))
}
