//! Validates the scan target before any socket is opened.

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Reasons a scan refuses to start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// No address was given on the command line or in the config file.
    #[error("a valid IP address to scan must be provided")]
    Missing,
    /// The address is not an IPv4 or IPv6 literal.
    #[error("{0:?} is not a valid IP address")]
    Invalid(String),
    /// The per-connection timeout was zero.
    #[error("the connection timeout must be a positive number of milliseconds")]
    ZeroTimeout,
}

/// A validated target: one IP address plus the per-connection timeout.
///
/// Host names and CIDRs are rejected; only literal addresses are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTarget {
    address: IpAddr,
    timeout: Duration,
}

impl ScanTarget {
    /// Builds a target from the raw address string and timeout.
    ///
    /// ```rust
    /// # use portsweep::address::{ScanTarget, TargetError};
    /// # use std::time::Duration;
    /// let target = ScanTarget::parse(Some("::1"), Duration::from_millis(500)).unwrap();
    /// assert!(target.address().is_ipv6());
    ///
    /// let err = ScanTarget::parse(Some("not-an-ip"), Duration::from_millis(500)).unwrap_err();
    /// assert_eq!(err, TargetError::Invalid("not-an-ip".to_owned()));
    /// ```
    pub fn parse(address: Option<&str>, timeout: Duration) -> Result<Self, TargetError> {
        let address = address.map(str::trim).filter(|a| !a.is_empty());
        let Some(address) = address else {
            return Err(TargetError::Missing);
        };
        let address =
            IpAddr::from_str(address).map_err(|_| TargetError::Invalid(address.to_owned()))?;

        Self::new(address, timeout)
    }

    /// Builds a target from an already parsed address.
    pub fn new(address: IpAddr, timeout: Duration) -> Result<Self, TargetError> {
        if timeout.is_zero() {
            return Err(TargetError::ZeroTimeout);
        }
        Ok(Self { address, timeout })
    }

    pub const fn address(&self) -> IpAddr {
        self.address
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}
