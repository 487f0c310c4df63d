//! This crate exposes the internal functionality of the `portsweep` port
//! scanner.
//!
//! `portsweep` runs a full TCP connect scan of one host: every port from 1
//! to 65535 gets exactly one connection attempt, thousands of them in flight
//! at once, and the open ones are reported with their well-known service
//! name and a ready-to-run Nmap command.
//!
//! ## Architecture Overview
//!
//! The core scanning behaviour is managed by
//! [`Scanner`](crate::scanner::Scanner). A scan follows this flow:
//!
//! 1. **Input Processing**: the target address is validated into a
//!    [`ScanTarget`](crate::address::ScanTarget); nothing is probed otherwise
//! 2. **Admission**: each port waits for a slot in the
//!    [`ConcurrencyLimiter`](crate::scanner::ConcurrencyLimiter)
//! 3. **Probing**: a [`Probe`](crate::scanner::Probe) performs one TCP
//!    handshake per port with a timeout
//! 4. **Aggregation**: results land in the shared
//!    [`ResultAggregator`](crate::scanner::ResultAggregator) and the
//!    progress line advances
//! 5. **Result Processing**: the finished
//!    [`ScanSession`](crate::scanner::ScanSession) is printed and optionally
//!    exported for Nmap
//!
//! ## Basic Usage Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use portsweep::address::ScanTarget;
//! use portsweep::scanner::{Scanner, TcpProbe};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let target = ScanTarget::parse(Some("127.0.0.1"), Duration::from_millis(100)).unwrap();
//! let scanner = Scanner::new(
//!     target,
//!     (1..=1_000).collect(),          // Ports to scan
//!     500,                            // Probes in flight at once
//!     TcpProbe::new(target.timeout()),
//! );
//!
//! // Runs until every port is done; pass a signal future to allow interruption.
//! let session = scanner.run(std::future::pending()).await;
//!
//! assert_eq!(session.completed(), 1_000);
//! for port in session.open_ports() {
//!     println!("{port}");
//! }
//! # }
//! ```
#![allow(clippy::needless_doctest_main)]

pub mod tui;

pub mod input;

pub mod scanner;

pub mod address;

pub mod services;

pub mod export;
