//! Writes open ports and a follow-up Nmap command to a results file.
use crate::scanner::PortResult;
use itertools::Itertools;
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::Path;

/// The Nmap invocation that fingerprints the discovered ports.
///
/// ```rust
/// # use portsweep::export::nmap_command;
/// # use portsweep::scanner::PortResult;
/// let open = [PortResult::new(22, true), PortResult::new(80, true)];
/// assert_eq!(
///     nmap_command("10.0.0.5".parse().unwrap(), &open),
///     "nmap -sCV -p22,80 10.0.0.5"
/// );
/// ```
pub fn nmap_command(address: IpAddr, open: &[PortResult]) -> String {
    let ports = open.iter().map(PortResult::port).unique().join(",");
    format!("nmap -sCV -p{ports} {address}")
}

/// File body: one line per open port, a blank line, then the Nmap command.
pub fn render_report(address: IpAddr, open: &[PortResult]) -> String {
    let mut lines: Vec<String> = open.iter().map(ToString::to_string).collect();
    lines.push(format!("\n{}", nmap_command(address, open)));
    lines.join("\n")
}

/// Writes the report to `path`.
///
/// Returns `Ok(false)` without touching the filesystem when nothing is open.
pub fn write_report(path: &Path, address: IpAddr, open: &[PortResult]) -> io::Result<bool> {
    if open.is_empty() {
        return Ok(false);
    }
    fs::write(path, render_report(address, open))?;
    Ok(true)
}
