//! hpireset - hard reset or power down a server through the management layer.
//!
//! Exit status: 0 when the run completes, 1 on bad arguments, -1 when the
//! management session cannot be opened or discovery fails.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use mgmtutil::hpi::{provider_from_config, ControlNum};
use mgmtutil::{logging, run_reset, Config, MgmtError, ResetAction, ResetOptions, ResetReport};
use std::path::PathBuf;
use std::process;

const EXIT_OK: i32 = 0;
const EXIT_USAGE: i32 = 1;
const EXIT_SESSION: i32 = -1;

fn build_cli() -> Command {
    Command::new("hpireset")
        .version(mgmtutil::VERSION)
        .about("Hard reset or power down the system through the platform management layer")
        .override_usage("hpireset [-r | -d] [-x] [--domain <FILE>] [-n <NUM>] [-c <FILE>]")
        .arg(
            Arg::new("reset")
                .short('r')
                .help("hard resets the system (default)")
                .action(ArgAction::SetTrue)
                .overrides_with("down"),
        )
        .arg(
            Arg::new("down")
                .short('d')
                .help("powers down the system")
                .action(ArgAction::SetTrue)
                .overrides_with("reset"),
        )
        .arg(
            Arg::new("debug")
                .short('x')
                .help("show extra debug messages")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("domain")
                .long("domain")
                .value_name("FILE")
                .help("management domain description (overrides hpi.domain_file)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("control")
                .short('n')
                .long("control")
                .value_name("NUM")
                .help("number of the reset control")
                .value_parser(clap::value_parser!(u32)),
        )
}

#[derive(Debug, PartialEq)]
struct CliArgs {
    action: ResetAction,
    verbose: bool,
    config: Option<PathBuf>,
    domain: Option<PathBuf>,
    control: Option<u32>,
}

impl CliArgs {
    fn from_matches(matches: &ArgMatches) -> Self {
        let action = if matches.get_flag("down") {
            ResetAction::PowerDown
        } else {
            ResetAction::HardReset
        };
        Self {
            action,
            verbose: matches.get_flag("debug"),
            config: matches.get_one::<PathBuf>("config").cloned(),
            domain: matches.get_one::<PathBuf>("domain").cloned(),
            control: matches.get_one::<u32>("control").copied(),
        }
    }
}

fn parse_args<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    build_cli()
        .try_get_matches_from(args)
        .map(|matches| CliArgs::from_matches(&matches))
}

fn print_report(action: ResetAction, report: &ResetReport) {
    println!(
        "RptInfo: UpdateCount = {}, UpdateTime = {:x}",
        report.domain.update_count, report.domain.update_timestamp
    );
    for control in &report.controls {
        match &control.result {
            Ok(()) => println!(
                "Resource {} control {} ({}): {} requested",
                control.resource_id, control.num, control.id_string, action
            ),
            Err(err) => println!(
                "Resource {} control {} ({}): {}",
                control.resource_id, control.num, control.id_string, err
            ),
        }
    }
    if report.controls.is_empty() {
        println!("No reset control found in {} resources", report.resources_seen);
    }
    for (resource, reason) in &report.incomplete {
        println!("Resource {resource} records skipped: {reason}");
    }
    if let Some(reason) = &report.aborted {
        println!("Resource walk stopped: {reason}");
    }
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let provider = provider_from_config(&config.hpi, args.domain.as_deref())?;

    let control = args.control.unwrap_or(config.hpi.reset_control);
    if control == 0 {
        return Err(MgmtError::invalid_argument("reset control number must be at least 1").into());
    }
    let options = ResetOptions {
        action: args.action,
        control_num: ControlNum(control),
    };

    println!("hpireset ver {}: {}", mgmtutil::VERSION, options.action);
    let report = run_reset(provider.as_ref(), &options)?;
    print_report(options.action, &report);
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<MgmtError>() {
        Some(e) if e.is_session_failure() => EXIT_SESSION,
        Some(
            MgmtError::ConfigError { .. }
            | MgmtError::InvalidArgument { .. }
            | MgmtError::Io { .. },
        ) => EXIT_USAGE,
        _ => EXIT_SESSION,
    }
}

fn main() {
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = err.print();
                process::exit(EXIT_OK);
            }
            _ => {
                let _ = err.print();
                eprintln!("   -r  hard resets the system");
                eprintln!("   -d  powers Down the system");
                eprintln!("   -x  show eXtra debug messages");
                process::exit(EXIT_USAGE);
            }
        },
    };

    logging::init(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("hpireset: {err:#}");
        process::exit(exit_code(&err));
    }
    process::exit(EXIT_OK);
}
