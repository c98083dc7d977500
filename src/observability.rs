//! Conversion outcome reporting.
//!
//! Observers receive field-level [`Diagnostic`]s, a success callback with [`ConversionStats`], and
//! failure/alert callbacks with a [`Severity`]. [`crate::pipeline::run_conversion`] drives them.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::conversion::{ConversionStats, Diagnostic};
use crate::error::ConversionError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Non-fatal; the affected field kept a fallback value.
    Warning,
    /// A field or the whole conversion was dropped.
    Error,
    /// I/O or other infrastructure failure.
    Critical,
}

/// Context about a conversion attempt.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// Input metadata file.
    pub input: PathBuf,
    /// Human-readable mapping source (`embedded` or a file path).
    pub mapping: String,
}

/// Observer interface for conversion outcomes.
pub trait ConversionObserver: Send + Sync {
    /// Called once per field-level diagnostic, before `on_success`.
    fn on_diagnostic(&self, _ctx: &ConversionContext, _diagnostic: &Diagnostic) {}

    /// Called when the output document was written.
    fn on_success(&self, _ctx: &ConversionContext, _stats: ConversionStats) {}

    /// Called when the conversion failed.
    fn on_failure(&self, _ctx: &ConversionContext, _severity: Severity, _error: &ConversionError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ConversionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ConversionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ConversionObserver for CompositeObserver {
    fn on_diagnostic(&self, ctx: &ConversionContext, diagnostic: &Diagnostic) {
        for o in &self.observers {
            o.on_diagnostic(ctx, diagnostic);
        }
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Writes conversion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ConversionObserver for StdErrObserver {
    fn on_diagnostic(&self, ctx: &ConversionContext, diagnostic: &Diagnostic) {
        eprintln!(
            "[convert][{:?}] input={} {}",
            diagnostic.severity(),
            ctx.input.display(),
            diagnostic
        );
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        eprintln!(
            "[convert][ok] input={} mapping={} rules={} resolved={} array_elements={}",
            ctx.input.display(),
            ctx.mapping,
            stats.rules,
            stats.resolved,
            stats.array_elements
        );
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        eprintln!(
            "[convert][{:?}] input={} mapping={} err={}",
            severity,
            ctx.input.display(),
            ctx.mapping,
            error
        );
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        eprintln!(
            "[ALERT][convert][{:?}] input={} mapping={} err={}",
            severity,
            ctx.input.display(),
            ctx.mapping,
            error
        );
    }
}

/// Forwards conversion events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ConversionObserver for TracingObserver {
    fn on_diagnostic(&self, ctx: &ConversionContext, diagnostic: &Diagnostic) {
        let input = ctx.input.display();
        match diagnostic.severity() {
            Severity::Info => tracing::info!(%input, %diagnostic, "conversion diagnostic"),
            Severity::Warning => tracing::warn!(%input, %diagnostic, "conversion diagnostic"),
            Severity::Error | Severity::Critical => {
                tracing::error!(%input, %diagnostic, "conversion diagnostic")
            }
        }
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        tracing::info!(
            input = %ctx.input.display(),
            mapping = %ctx.mapping,
            rules = stats.rules,
            resolved = stats.resolved,
            deferred = stats.deferred,
            array_elements = stats.array_elements,
            "conversion finished"
        );
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        tracing::error!(
            input = %ctx.input.display(),
            mapping = %ctx.mapping,
            ?severity,
            %error,
            "conversion failed"
        );
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, _error: &ConversionError) {
        tracing::error!(
            input = %ctx.input.display(),
            mapping = %ctx.mapping,
            ?severity,
            alert = true,
            "conversion alert"
        );
    }
}

/// Appends conversion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ConversionObserver for FileObserver {
    fn on_diagnostic(&self, ctx: &ConversionContext, diagnostic: &Diagnostic) {
        self.append_line(&format!(
            "{} diagnostic severity={:?} input={} {}",
            unix_ts(),
            diagnostic.severity(),
            ctx.input.display(),
            diagnostic
        ));
    }

    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.append_line(&format!(
            "{} ok input={} mapping={} rules={} resolved={} deferred={} array_elements={}",
            unix_ts(),
            ctx.input.display(),
            ctx.mapping,
            stats.rules,
            stats.resolved,
            stats.deferred,
            stats.array_elements
        ));
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        self.append_line(&format!(
            "{} fail severity={:?} input={} mapping={} err={}",
            unix_ts(),
            severity,
            ctx.input.display(),
            ctx.mapping,
            error
        ));
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: Severity, error: &ConversionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} input={} mapping={} err={}",
            unix_ts(),
            severity,
            ctx.input.display(),
            ctx.mapping,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
