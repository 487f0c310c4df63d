//! Provides a means to read, parse and hold configuration options for scans.
use crate::scanner::MAX_CONCURRENT;
use clap::Parser;
use serde_derive::Deserialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const LOWEST_PORT_NUMBER: u16 = 1;
const TOP_PORT_NUMBER: u16 = 65535;

/// Default per-connection timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

pub type Ports = Vec<u16>;

/// Parses `80,443,1-1000` style port lists into a sorted, deduplicated list.
#[cfg(not(tarpaulin_include))]
pub fn parse_ports_and_ranges(input: &str) -> Result<Ports, String> {
    let mut ports = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if part.contains('-') {
            let range_ports = parse_port_range(part)?;
            ports.extend(range_ports);
        } else {
            let port = parse_single_port(part)?;
            ports.push(port);
        }
    }

    if ports.is_empty() {
        return Err(String::from("No valid ports or ranges provided"));
    }

    ports.sort_unstable();
    ports.dedup();

    Ok(ports)
}

fn parse_port_range(range_str: &str) -> Result<Vec<u16>, String> {
    let Some((start, end)) = range_str.split_once('-').filter(|(_, end)| !end.contains('-'))
    else {
        return Err(format!(
            "Invalid range format '{range_str}'. Expected 'start-end'. Example: 1-1000.",
        ));
    };

    let start: u16 = start
        .trim()
        .parse()
        .map_err(|_| format!("Invalid start port '{start}' in range '{range_str}'"))?;
    let end: u16 = end
        .trim()
        .parse()
        .map_err(|_| format!("Invalid end port '{end}' in range '{range_str}'"))?;

    if start > end {
        return Err(format!(
            "Start port {start} is greater than end port {end} in range '{range_str}'",
        ));
    }

    if start < LOWEST_PORT_NUMBER {
        return Err(format!(
            "Ports in range '{range_str}' must be between {LOWEST_PORT_NUMBER} and {TOP_PORT_NUMBER}",
        ));
    }

    Ok((start..=end).collect())
}

fn parse_single_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str
        .parse()
        .map_err(|_| format!("Invalid port number '{port_str}'"))?;

    if port < LOWEST_PORT_NUMBER {
        return Err(format!(
            "Port {port} must be between {LOWEST_PORT_NUMBER} and {TOP_PORT_NUMBER}",
        ));
    }

    Ok(port)
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "portsweep",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}\n{after-help}",
    after_help = "EXAMPLE:\n    portsweep -a 127.0.0.1 -t 1000 -o results",
)]
#[allow(clippy::struct_excessive_bools)]
/// Scans every TCP port of one host and names the service behind each open one.
/// WARNING Do not use this program against sensitive infrastructure since the
/// specified server may not be able to handle this many socket connections at once.
pub struct Opts {
    /// The IPv4 or IPv6 address to scan.
    #[arg(short, long)]
    pub address: Option<String>,

    /// Restrict the scan to these ports. Examples: 80,443,8080 or 1-1000 or 1-1000,8080
    #[arg(short, long, value_parser = parse_ports_and_ranges)]
    pub ports: Option<Ports>,

    /// The timeout in milliseconds before a port is assumed to be closed.
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Write the open ports and a ready-to-run Nmap command to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How many connection attempts may be in flight at once. Depends on
    /// the open file limit of your OS.
    #[arg(short, long, default_value_t = MAX_CONCURRENT)]
    pub batch_size: usize,

    /// Automatically ups the ULIMIT with the value you provided.
    #[arg(short, long)]
    pub ulimit: Option<u64>,

    /// Greppable mode. Only output the open ports.
    #[arg(short, long)]
    pub greppable: bool,

    /// Accessible mode. Turns off features which negatively affect screen readers.
    #[arg(long)]
    pub accessible: bool,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Custom path to config file
    #[arg(short, long, value_parser)]
    pub config_path: Option<PathBuf>,
}

#[cfg(not(tarpaulin_include))]
impl Opts {
    pub fn read() -> Self {
        Self::parse()
    }

    /// Ports to scan: the restricted list if one was given, otherwise all.
    pub fn port_list(&self) -> Ports {
        self.ports
            .clone()
            .unwrap_or_else(|| (LOWEST_PORT_NUMBER..=TOP_PORT_NUMBER).collect())
    }

    /// Reads the command line arguments into an Opts struct and merge
    /// values found within the user configuration file.
    pub fn merge(&mut self, config: &Config) {
        if !self.no_config {
            self.merge_required(config);
            self.merge_optional(config);
        }
    }

    fn merge_required(&mut self, config: &Config) {
        macro_rules! merge_required {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_required!(greppable, accessible, batch_size, timeout);
    }

    fn merge_optional(&mut self, config: &Config) {
        macro_rules! merge_optional {
            ($($field: ident),+) => {
                $(
                    if self.$field.is_none() && config.$field.is_some() {
                        self.$field = config.$field.clone();
                    }
                )+
            }
        }

        merge_optional!(address, ports, output, ulimit);
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            address: None,
            ports: None,
            timeout: DEFAULT_TIMEOUT_MS,
            output: None,
            batch_size: MAX_CONCURRENT,
            ulimit: None,
            greppable: true,
            accessible: false,
            no_config: true,
            config_path: None,
        }
    }
}

/// Why the configuration file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("found {0} in configuration file")]
    Parse(#[from] toml::de::Error),
}

/// Struct used to deserialize the options specified within our config file.
/// These will be further merged with our command line arguments in order to
/// generate the final Opts struct.
#[cfg(not(tarpaulin_include))]
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    address: Option<String>,
    ports: Option<Vec<u16>>,
    timeout: Option<u64>,
    output: Option<PathBuf>,
    batch_size: Option<usize>,
    ulimit: Option<u64>,
    greppable: Option<bool>,
    accessible: Option<bool>,
}

#[cfg(not(tarpaulin_include))]
impl Config {
    /// Reads the configuration file with TOML format and parses it into a
    /// Config struct. A missing file yields an empty config.
    ///
    /// # Format
    ///
    /// address = "127.0.0.1"
    /// ports = [80, 443, 8080]
    /// timeout = 1000
    /// batch_size = 2500
    /// greppable = true
    ///
    pub fn read(custom_config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let Some(config_path) = custom_config_path.or_else(default_config_path) else {
            return Ok(Self::default());
        };
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path,
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Constructs default path to config toml
pub fn default_config_path() -> Option<PathBuf> {
    let mut config_path = dirs::home_dir()?;
    config_path.push(".portsweep.toml");
    Some(config_path)
}
