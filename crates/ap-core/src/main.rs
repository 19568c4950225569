//! autoprobe - Android broadcast auto-start detector
//!
//! The main entry point, handling:
//! - Argument parsing and logging setup
//! - Configuration loading and CLI overrides
//! - The probe run, catalog listing and config management commands

use ap_common::{format_error_human, MatchPolicy, OutputFormat, StructuredError, SCHEMA_VERSION};
use ap_config::{validate_probe_settings, CATALOG_FILENAME, PROBE_FILENAME};
use ap_core::catalog::{build_catalog, discover_catalog};
use ap_core::config::{
    load_config, CatalogConfig, ConfigOptions, ConfigSnapshot, ProbeSettings, ResolvedConfig,
};
use ap_core::device::{AdbShell, DeviceRunner, RunnerLimits, ToolRunner};
use ap_core::driver::{self, read_package_name, render_catalog, EMPTY_PACKAGE_MESSAGE};
use ap_core::exit_codes::ExitCode;
use ap_core::logging::{
    event_names, generate_run_id, get_host_id, init_logging, LogConfig, LogContext, LogFormat, Stage,
};
use ap_core::monitor::{AutoStartMonitor, MonitorSettings};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

/// Detect Android apps that auto-start on system or vendor broadcasts
#[derive(Parser)]
#[command(name = "autoprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Override config directory (otherwise $AUTOPROBE_CONFIG, then the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Device serial (adb -s)
    #[arg(long, global = true, env = "ANDROID_SERIAL")]
    serial: Option<String>,

    /// Path to the adb executable
    #[arg(long, global = true)]
    adb: Option<String>,

    /// How process names are attributed to the package
    #[arg(long, global = true, value_enum)]
    match_policy: Option<MatchPolicy>,

    /// Wait this many milliseconds after each broadcast before re-sampling
    #[arg(long = "settle-ms", global = true)]
    settle_ms: Option<u64>,

    /// Per-command timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Kill the package, send each broadcast, and report auto-starts (default)
    Run(RunArgs),

    /// Print the broadcast actions a run would send, without probing
    Catalog(CatalogArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Package to probe; prompted for on stdin when omitted
    #[arg(long, short = 'p')]
    package: Option<String>,

    /// Do not query the package for the actions it declares
    #[arg(long)]
    skip_declared: bool,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Include the actions this package declares (queries the device)
    #[arg(long, short = 'p')]
    package: Option<String>,

    /// Do not query the package for the actions it declares
    #[arg(long)]
    skip_declared: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,
    /// Print JSON schema for a configuration file
    Schema {
        #[arg(long, value_enum, default_value_t = ConfigFile::Catalog)]
        file: ConfigFile,
    },
    /// Validate configuration files
    Validate {
        /// Config directory to validate (defaults to the resolved one)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigFile {
    Catalog,
    Probe,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = if cli.global.quiet {
        Some(LevelFilter::ERROR)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LevelFilter::DEBUG),
            _ => Some(LevelFilter::TRACE),
        }
    };
    // Machine-readable stdout gets machine-readable stderr.
    let cli_format = cli.global.format.is_machine().then_some(LogFormat::Jsonl);
    init_logging(&LogConfig::from_env(cli_level, cli_format));

    let exit_code = match cli.command {
        None => run_probe(&cli.global, &RunArgs::default()),
        Some(Commands::Run(args)) => run_probe(&cli.global, &args),
        Some(Commands::Catalog(args)) => run_catalog(&cli.global, &args),
        Some(Commands::Config(args)) => run_config(&cli.global, &args),
        Some(Commands::Version) => print_version(&cli.global),
    };

    if !exit_code.is_success() {
        tracing::debug!(exit_code = %exit_code, "exiting with error");
    }
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Shared setup
// ============================================================================

fn report_error(global: &GlobalOpts, err: &ap_common::Error, path: Option<&Path>) -> ExitCode {
    if global.format.is_machine() {
        let mut structured = StructuredError::from(err);
        if let Some(path) = path {
            structured = structured.with_context("path", path);
        }
        eprintln!("{}", structured.to_json());
    } else {
        eprintln!("{}", format_error_human(err, io::stderr().is_terminal()));
    }
    ExitCode::from(err)
}

fn load(global: &GlobalOpts) -> Result<ResolvedConfig, ExitCode> {
    let options = ConfigOptions {
        config_dir: global.config.clone(),
    };
    load_config(&options).map_err(|e| {
        let path = e.path().to_path_buf();
        report_error(global, &ap_common::Error::from(e), Some(&path))
    })
}

/// Probe settings with CLI flags applied over the file values.
fn effective_probe_settings(global: &GlobalOpts, base: &ProbeSettings) -> Result<ProbeSettings, ExitCode> {
    let mut settings = base.clone();
    if let Some(serial) = &global.serial {
        settings.serial = Some(serial.clone());
    }
    if let Some(adb) = &global.adb {
        settings.adb_path = adb.clone();
    }
    if let Some(policy) = global.match_policy {
        settings.match_policy = policy;
    }
    if let Some(ms) = global.settle_ms {
        settings.settle_delay_ms = ms;
    }
    if let Some(secs) = global.timeout {
        settings.command_timeout_ms = secs.saturating_mul(1000);
    }

    if let Err(e) = validate_probe_settings(&settings) {
        eprintln!("error: invalid option: {}", e);
        return Err(ExitCode::ArgsError);
    }
    Ok(settings)
}

fn device_runner(settings: &ProbeSettings) -> DeviceRunner<AdbShell> {
    let runner = ToolRunner::new(RunnerLimits {
        timeout: Duration::from_millis(settings.command_timeout_ms),
        max_output_bytes: settings.max_output_bytes,
    });
    let shell = AdbShell::new(runner, settings.adb_path.clone())
        .with_serial(settings.serial.clone())
        .with_su_binary(settings.su_binary.clone());
    DeviceRunner::new(shell)
}

fn io_exit(e: io::Error) -> ExitCode {
    if e.kind() == io::ErrorKind::BrokenPipe {
        return ExitCode::Clean;
    }
    eprintln!("error: {}", e);
    ExitCode::IoError
}

// ============================================================================
// Commands
// ============================================================================

fn run_probe(global: &GlobalOpts, args: &RunArgs) -> ExitCode {
    let config = match load(global) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let probe = match effective_probe_settings(global, &config.probe) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Some(monitor_settings) = MonitorSettings::from_probe_settings(&probe) else {
        let err = ap_common::Error::Config(
            "process list and PID lookup commands must not be empty".to_string(),
        );
        return report_error(global, &err, None);
    };

    let package = match &args.package {
        Some(p) if !p.trim().is_empty() => Some(p.trim().to_string()),
        Some(_) => None,
        None => {
            let stdin = io::stdin();
            let prompt_result = if global.format.is_machine() {
                read_package_name(&mut stdin.lock(), &mut io::stderr())
            } else {
                read_package_name(&mut stdin.lock(), &mut io::stdout())
            };
            match prompt_result {
                Ok(p) => p,
                Err(e) => return io_exit(e),
            }
        }
    };

    let Some(package) = package else {
        if global.format.is_machine() {
            eprintln!("{}", StructuredError::from(&ap_common::Error::MissingPackage).to_json());
        } else {
            println!("{}", EMPTY_PACKAGE_MESSAGE);
        }
        return ExitCode::Clean;
    };

    let ctx = LogContext::new(generate_run_id(), get_host_id());
    ap_core::log_event!(
        ctx,
        INFO,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "configuration resolved",
        config_dir = config.config_dir.display().to_string().as_str(),
        match_policy = probe.match_policy.to_string().as_str()
    );

    let monitor = AutoStartMonitor::new(device_runner(&probe), monitor_settings, ctx.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match driver::run(
        &monitor,
        &ctx,
        &config.catalog,
        &package,
        args.skip_declared,
        global.format,
        &mut out,
    ) {
        Ok(_) => ExitCode::Clean,
        Err(e) => io_exit(e),
    }
}

fn run_catalog(global: &GlobalOpts, args: &CatalogArgs) -> ExitCode {
    let config = match load(global) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let catalog = match args.package.as_deref().map(str::trim) {
        Some(package) if !package.is_empty() && !args.skip_declared => {
            let probe = match effective_probe_settings(global, &config.probe) {
                Ok(p) => p,
                Err(code) => return code,
            };
            discover_catalog(&device_runner(&probe), &config.catalog, package, false)
        }
        _ => build_catalog(&config.catalog, &[]),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match render_catalog(&catalog, global.format, &mut out) {
        Ok(()) => ExitCode::Clean,
        Err(e) => io_exit(e),
    }
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ExitCode {
    match &args.command {
        ConfigCommands::Show => run_config_show(global),
        ConfigCommands::Schema { file } => run_config_schema(*file),
        ConfigCommands::Validate { path } => run_config_validate(global, path.as_ref()),
    }
}

fn source_line(path: Option<&PathBuf>, hash: Option<&String>, filename: &str) -> String {
    match (path, hash) {
        (Some(path), Some(hash)) => format!("{} (sha256 {})", path.display(), hash),
        (Some(path), None) => path.display().to_string(),
        _ => format!("built-in defaults (no {} found)", filename),
    }
}

fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let config = match load(global) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let snapshot = config.snapshot();

    let result = if global.format.is_machine() {
        let response = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "provenance": &snapshot,
            "catalog": &config.catalog,
            "probe": &config.probe,
        });
        serde_json::to_string_pretty(&response)
            .map_err(io::Error::from)
            .and_then(|s| writeln!(io::stdout(), "{}", s))
    } else {
        write_config_human(&mut io::stdout().lock(), &config, &snapshot)
    };

    match result {
        Ok(()) => ExitCode::Clean,
        Err(e) => io_exit(e),
    }
}

fn write_config_human<W: Write>(
    out: &mut W,
    config: &ResolvedConfig,
    snapshot: &ConfigSnapshot,
) -> io::Result<()> {
    writeln!(out, "# autoprobe config show")?;
    writeln!(out)?;
    writeln!(
        out,
        "Config directory: {} ({})",
        snapshot.config_dir.display(),
        snapshot.source
    )?;
    writeln!(
        out,
        "Catalog: {}",
        source_line(snapshot.catalog_path.as_ref(), snapshot.catalog_hash.as_ref(), CATALOG_FILENAME)
    )?;
    writeln!(
        out,
        "Probe: {}",
        source_line(snapshot.probe_path.as_ref(), snapshot.probe_hash.as_ref(), PROBE_FILENAME)
    )?;
    writeln!(out)?;
    writeln!(out, "Common actions: {}", config.catalog.common_actions.len())?;
    for group in &config.catalog.vendor_actions {
        writeln!(out, "Vendor actions ({}): {}", group.vendor, group.actions.len())?;
    }
    writeln!(out, "Excluded actions: {}", config.catalog.excluded_actions.join(", "))?;
    writeln!(out, "Match policy: {}", config.probe.match_policy)?;
    writeln!(out, "adb: {}", config.probe.adb_path)?;
    writeln!(
        out,
        "Serial: {}",
        config.probe.serial.as_deref().unwrap_or("(adb default)")
    )?;
    writeln!(out, "Settle delay: {}ms", config.probe.settle_delay_ms)?;
    Ok(())
}

fn run_config_schema(file: ConfigFile) -> ExitCode {
    let schema = match file {
        ConfigFile::Catalog => schemars::schema_for!(CatalogConfig),
        ConfigFile::Probe => schemars::schema_for!(ProbeSettings),
    };
    match serde_json::to_string_pretty(&schema) {
        Ok(s) => {
            println!("{}", s);
            ExitCode::Clean
        }
        Err(e) => {
            eprintln!("error: failed to serialize schema: {}", e);
            ExitCode::InternalError
        }
    }
}

fn run_config_validate(global: &GlobalOpts, path: Option<&PathBuf>) -> ExitCode {
    let options = ConfigOptions {
        config_dir: path.cloned().or_else(|| global.config.clone()),
    };
    let config = match load_config(&options) {
        Ok(c) => c,
        Err(e) => {
            let err = ap_common::Error::from(e);
            if global.format.is_machine() {
                let response = serde_json::json!({
                    "schema_version": SCHEMA_VERSION,
                    "status": "invalid",
                    "error": StructuredError::from(&err),
                });
                println!("{}", response);
                return ExitCode::from(&err);
            }
            return report_error(global, &err, None);
        }
    };

    let snapshot = config.snapshot();
    if global.format.is_machine() {
        let response = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "status": "valid",
            "catalog": {
                "path": snapshot.catalog_path,
                "using_defaults": snapshot.catalog_path.is_none(),
            },
            "probe": {
                "path": snapshot.probe_path,
                "using_defaults": snapshot.probe_path.is_none(),
            },
        });
        println!("{}", response);
    } else {
        println!("Status: valid");
        println!(
            "Catalog: {}",
            source_line(snapshot.catalog_path.as_ref(), None, CATALOG_FILENAME)
        );
        println!(
            "Probe: {}",
            source_line(snapshot.probe_path.as_ref(), None, PROBE_FILENAME)
        );
    }
    ExitCode::Clean
}

fn print_version(global: &GlobalOpts) -> ExitCode {
    if global.format.is_machine() {
        let version_info = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "autoprobe_version": env!("CARGO_PKG_VERSION"),
            "rust_version": env!("CARGO_PKG_RUST_VERSION"),
        });
        println!("{}", version_info);
    } else {
        println!("autoprobe {}", env!("CARGO_PKG_VERSION"));
        println!("schema version: {}", SCHEMA_VERSION);
    }
    ExitCode::Clean
}
