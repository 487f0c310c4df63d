//! Command line entry point.
use portsweep::address::ScanTarget;
use portsweep::export;
use portsweep::input::{Config, Opts};
use portsweep::scanner::{ScanSession, ScanState, Scanner, TcpProbe};
use portsweep::tui::ProgressReporter;
use portsweep::{detail, warning};

use anyhow::Context;
use clap::CommandFactory;
use colored::Colorize;
use log::{debug, info};
use std::process;
use std::time::Duration;

// Average value for Ubuntu
const DEFAULT_FILE_DESCRIPTORS_LIMIT: u64 = 8000;
// Safest batch size based on experimentation
const AVERAGE_BATCH_SIZE: usize = 3000;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
/// Reads the command line arguments, validates the target and runs the scan.
async fn main() {
    env_logger::init();

    let mut opts: Opts = Opts::read();
    if !opts.no_config {
        match Config::read(opts.config_path.clone()) {
            Ok(config) => opts.merge(&config),
            Err(e) => {
                warning!(format!("{e}\nAborting scan."));
                process::exit(1);
            }
        }
    }

    debug!("Main() `opts` arguments are {opts:?}");

    let timeout = Duration::from_millis(opts.timeout);
    let target = match ScanTarget::parse(opts.address.as_deref(), timeout) {
        Ok(target) => target,
        Err(e) => {
            warning!(format!("Error: {e}."));
            let _ = Opts::command().print_help();
            process::exit(1);
        }
    };

    let ulimit: u64 = adjust_ulimit_size(&opts);
    let batch_size = infer_batch_size(&opts, ulimit);
    let ports = opts.port_list();

    if opts.greppable || opts.accessible {
        info!("Progress bar disabled");
    }
    detail!(
        format!("Scanning ports on {}...", target.address()),
        opts.greppable,
        opts.accessible
    );
    detail!(
        format!(
            "{} ports, {batch_size} at a time, {}ms timeout.",
            ports.len(),
            opts.timeout
        ),
        opts.greppable,
        opts.accessible
    );

    let total = ports.len() as u64;
    let reporter = if opts.greppable || opts.accessible {
        ProgressReporter::hidden(total)
    } else {
        ProgressReporter::new(total)
    };
    let scanner =
        Scanner::new(target, ports, batch_size, TcpProbe::new(timeout)).with_reporter(reporter);

    let session = scanner.run(shutdown_signal()).await;

    if session.state() == ScanState::Interrupted {
        println!();
        warning!("Scan interrupted by the user.", opts.greppable, opts.accessible);
        process::exit(0);
    }

    report(&opts, &session);
}

/// Prints the open ports, exports them if asked to and prints the summary.
fn report(opts: &Opts, session: &ScanSession) {
    let open = session.open_ports();

    if open.is_empty() {
        warning!("No open ports found.", opts.greppable, opts.accessible);
    } else {
        detail!("Open ports found:", opts.greppable, opts.accessible);
        for port in &open {
            if opts.greppable || opts.accessible {
                println!("{port}");
            } else {
                println!("{}", port.to_string().purple());
            }
        }

        if let Some(path) = &opts.output {
            let written = export::write_report(path, session.target().address(), &open)
                .with_context(|| format!("could not write results to {}", path.display()));
            match written {
                Ok(_) => {
                    detail!(
                        format!("Results exported to {}", path.display()),
                        opts.greppable,
                        opts.accessible
                    );
                }
                Err(e) => {
                    warning!(format!("{e:#}"));
                }
            }
        }
    }

    detail!(
        format!("Scan completed in {:?}", session.elapsed()),
        opts.greppable,
        opts.accessible
    );
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Could not listen for Ctrl-C: {e}");
            futures::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                debug!("Could not listen for SIGTERM: {e}");
                futures::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = futures::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(unix)]
fn adjust_ulimit_size(opts: &Opts) -> u64 {
    use rlimit::Resource;

    if let Some(limit) = opts.ulimit {
        if Resource::NOFILE.set(limit, limit).is_ok() {
            detail!(
                format!("Automatically increasing ulimit value to {limit}."),
                opts.greppable,
                opts.accessible
            );
        } else {
            warning!(
                "ERROR. Failed to set ulimit value.",
                opts.greppable,
                opts.accessible
            );
        }
    }

    match Resource::NOFILE.get() {
        Ok((soft, _)) => soft,
        Err(e) => {
            debug!("Could not read the open file limit: {e}");
            u64::MAX
        }
    }
}

#[cfg(not(unix))]
fn adjust_ulimit_size(_opts: &Opts) -> u64 {
    u64::MAX
}

/// Clamps the requested batch size so the scan does not run out of file
/// descriptors.
fn infer_batch_size(opts: &Opts, ulimit: u64) -> usize {
    let requested = opts.batch_size.max(1);
    let limit = usize::try_from(ulimit).unwrap_or(usize::MAX);

    if limit >= requested {
        return requested;
    }

    warning!(
        "File limit is lower than the batch size. Consider upping with --ulimit. May cause harm to sensitive servers",
        opts.greppable,
        opts.accessible
    );

    let batch_size = if limit < AVERAGE_BATCH_SIZE {
        warning!(
            "Your file limit is very small, which negatively impacts the scan speed. Up the Ulimit with '--ulimit 5000'.",
            opts.greppable,
            opts.accessible
        );
        info!("Halving batch_size because ulimit is smaller than average batch size");
        limit / 2
    } else if ulimit > DEFAULT_FILE_DESCRIPTORS_LIMIT {
        info!("Batch size is now average batch size");
        AVERAGE_BATCH_SIZE
    } else {
        limit - 100
    };

    batch_size.clamp(1, requested)
}
