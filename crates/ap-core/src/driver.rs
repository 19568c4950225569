//! Probe run driver.
//!
//! Obtains the package name, builds the catalog and probes every action in
//! order, writing the transcript (or JSON) to the given writer. Verdicts
//! never stop the loop and never change the outcome of the run.

use crate::catalog::{discover_catalog, ActionCatalog};
use crate::device::DeviceShell;
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::monitor::{AutoStartMonitor, ProbeResult};
use ap_common::{OutputFormat, SCHEMA_VERSION};
use ap_config::CatalogConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, BufRead, Write};

pub const PROMPT: &str = "Package name to monitor (required): ";

pub const EMPTY_PACKAGE_MESSAGE: &str = "error: a package name is required";

/// Prompt on `prompt_out` and read one line from `input`.
///
/// Returns None when the trimmed line is empty or input is closed.
pub fn read_package_name<R: BufRead, W: Write>(
    input: &mut R,
    prompt_out: &mut W,
) -> io::Result<Option<String>> {
    write!(prompt_out, "{}", PROMPT)?;
    prompt_out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let package = line.trim();
    if package.is_empty() {
        Ok(None)
    } else {
        Ok(Some(package.to_string()))
    }
}

/// All probe results of one run (`--format json`).
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: &'static str,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub package: String,
    pub catalog_size: usize,
    pub results: Vec<ProbeResult>,
}

impl RunReport {
    pub fn auto_started(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.auto_started)
    }
}

/// Human verdict line for one probe.
pub fn verdict_line(result: &ProbeResult) -> String {
    if result.auto_started {
        format!(
            "[AUTO-START] {} auto-started on broadcast {} (new processes: {})",
            result.package,
            result.action,
            result.new_processes.join(", ")
        )
    } else {
        format!(
            "No auto-start of {} detected for broadcast {}",
            result.package, result.action
        )
    }
}

/// Probe `package` with every action in `catalog`.
pub fn run_probes<S: DeviceShell, W: Write>(
    monitor: &AutoStartMonitor<S>,
    ctx: &LogContext,
    catalog: &ActionCatalog,
    package: &str,
    format: OutputFormat,
    out: &mut W,
) -> io::Result<RunReport> {
    let mut report = RunReport {
        schema_version: SCHEMA_VERSION,
        run_id: ctx.run_id.clone(),
        generated_at: Utc::now(),
        package: package.to_string(),
        catalog_size: catalog.len(),
        results: Vec::with_capacity(catalog.len()),
    };

    if format == OutputFormat::Human {
        writeln!(out, "Sending broadcast actions and monitoring auto-start responses...")?;
    }

    for action in catalog.actions() {
        if format == OutputFormat::Human {
            writeln!(out, "\n--- Testing broadcast: {} ---", action)?;
            out.flush()?;
        }

        let result = monitor.probe(package, action);

        match format {
            OutputFormat::Human => writeln!(out, "{}", verdict_line(&result))?,
            OutputFormat::Jsonl => writeln!(out, "{}", serde_json::to_string(&result)?)?,
            OutputFormat::Json => {}
        }
        out.flush()?;
        report.results.push(result);
    }

    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    }

    Ok(report)
}

/// Build the catalog for `package` and probe it.
pub fn run<S: DeviceShell, W: Write>(
    monitor: &AutoStartMonitor<S>,
    ctx: &LogContext,
    catalog_config: &CatalogConfig,
    package: &str,
    skip_declared: bool,
    format: OutputFormat,
    out: &mut W,
) -> io::Result<RunReport> {
    let _span = ctx.run_span(package).entered();
    log_event!(
        ctx,
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "probe run started",
        package = package
    );

    let catalog = discover_catalog(monitor.device(), catalog_config, package, skip_declared);
    let report = run_probes(monitor, ctx, &catalog, package, format, out)?;

    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Verdict,
        "probe run finished",
        package = package,
        probes = report.results.len() as u64,
        auto_started = report.auto_started().count() as u64
    );
    Ok(report)
}

/// Write the catalog in `format`.
pub fn render_catalog<W: Write>(
    catalog: &ActionCatalog,
    format: OutputFormat,
    out: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Human => {
            for entry in catalog.entries() {
                writeln!(out, "{:<9} {}", entry.source, entry.action)?;
            }
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(catalog)?)?,
        OutputFormat::Jsonl => {
            for entry in catalog.entries() {
                writeln!(out, "{}", serde_json::to_string(entry)?)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_package_name() {
        let mut input = Cursor::new("  com.example.app  \n");
        let mut prompt = Vec::new();
        let package = read_package_name(&mut input, &mut prompt).unwrap();
        assert_eq!(package.as_deref(), Some("com.example.app"));
        assert_eq!(String::from_utf8(prompt).unwrap(), PROMPT);
    }

    #[test]
    fn test_read_package_name_empty() {
        let mut prompt = Vec::new();
        assert!(read_package_name(&mut Cursor::new("   \n"), &mut prompt)
            .unwrap()
            .is_none());
        assert!(read_package_name(&mut Cursor::new(""), &mut prompt)
            .unwrap()
            .is_none());
    }

    fn result(auto_started: bool) -> ProbeResult {
        ProbeResult {
            package: "com.example".to_string(),
            action: "android.intent.action.SCREEN_ON".to_string(),
            target_was_running: false,
            termination: None,
            broadcast_sent: true,
            new_processes: if auto_started {
                vec!["com.example.helper".to_string()]
            } else {
                vec![]
            },
            auto_started,
        }
    }

    #[test]
    fn test_verdict_lines() {
        assert_eq!(
            verdict_line(&result(true)),
            "[AUTO-START] com.example auto-started on broadcast android.intent.action.SCREEN_ON (new processes: com.example.helper)"
        );
        assert!(verdict_line(&result(false)).starts_with("No auto-start of com.example"));
    }

    #[test]
    fn test_render_catalog_human() {
        let catalog = crate::catalog::build_catalog(&CatalogConfig::default(), &["x.Y".to_string()]);
        let mut out = Vec::new();
        render_catalog(&catalog, OutputFormat::Human, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), catalog.len());
        assert!(text.lines().last().unwrap().starts_with("declared"));
    }
}
