//! Well-known TCP service names.

/// Name reported for ports missing from the catalog.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Returns the well-known service name for `port`, or `"unknown"`.
///
/// ```rust
/// # use portsweep::services::service_name;
/// assert_eq!(service_name(22), "ssh");
/// assert_eq!(service_name(31337), "unknown");
/// ```
pub const fn service_name(port: u16) -> &'static str {
    match port {
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "dns",
        80 => "http",
        110 => "pop3",
        143 => "imap",
        443 => "https",
        3306 => "mysql",
        5432 => "postgresql",
        6379 => "redis",
        8080 => "http-alt",
        _ => UNKNOWN_SERVICE,
    }
}
