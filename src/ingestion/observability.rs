use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::MigrationError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (unreachable storage or document store).
    Critical,
}

/// Pipeline step an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching and sniffing a source object.
    Read,
    /// Dropping rows with missing values.
    Clean,
    /// Bulk insert into the target collection.
    Load,
    /// Source/target comparison.
    Reconcile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Clean => "clean",
            Stage::Load => "load",
            Stage::Reconcile => "reconcile",
        };
        f.write_str(name)
    }
}

/// Context about a pipeline event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    /// Step that produced the event.
    pub stage: Stage,
    /// Source bucket.
    pub bucket: String,
    /// Source object key.
    pub key: String,
    /// Target collection, when known.
    pub collection: Option<String>,
}

impl EventContext {
    pub fn new(stage: Stage, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            stage,
            bucket: bucket.into(),
            key: key.into(),
            collection: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}

/// Minimal stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStats {
    /// Rows read, kept, or inserted, depending on the stage.
    pub rows: usize,
}

/// Observer interface for pipeline outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait MigrationObserver: Send + Sync {
    /// Called when a stage succeeds.
    fn on_success(&self, _ctx: &EventContext, _stats: EventStats) {}

    /// Called when a stage fails.
    fn on_failure(&self, _ctx: &EventContext, _severity: Severity, _error: &MigrationError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &EventContext, severity: Severity, error: &MigrationError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Classify an error for observer callbacks.
pub fn severity_for_error(e: &MigrationError) -> Severity {
    match e {
        MigrationError::Io(_) => Severity::Critical,
        MigrationError::Storage { .. } => Severity::Critical,
        MigrationError::StoreUnreachable { .. } => Severity::Critical,
        MigrationError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        MigrationError::Json(_)
        | MigrationError::Store { .. }
        | MigrationError::Envelope { .. }
        | MigrationError::Delimited { .. }
        | MigrationError::Unparseable { .. }
        | MigrationError::Naming { .. }
        | MigrationError::Config { .. } => Severity::Error,
        MigrationError::AllRowsMissing { .. } => Severity::Warning,
    }
}

/// Dispatches events to an optional observer and applies the alert threshold.
#[derive(Clone)]
pub struct Reporter {
    observer: Option<Arc<dyn MigrationObserver>>,
    alert_at_or_above: Severity,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(None, Severity::Critical)
    }
}

impl Reporter {
    pub fn new(observer: Option<Arc<dyn MigrationObserver>>, alert_at_or_above: Severity) -> Self {
        Self {
            observer,
            alert_at_or_above,
        }
    }

    pub fn success(&self, ctx: &EventContext, rows: usize) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_success(ctx, EventStats { rows });
        }
    }

    pub fn failure(&self, ctx: &EventContext, error: &MigrationError) {
        if let Some(obs) = self.observer.as_ref() {
            let sev = severity_for_error(error);
            obs.on_failure(ctx, sev, error);
            if sev >= self.alert_at_or_above {
                obs.on_alert(ctx, sev, error);
            }
        }
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn MigrationObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn MigrationObserver>>) -> Self {
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

impl MigrationObserver for CompositeObserver {
    fn on_success(&self, ctx: &EventContext, stats: EventStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &EventContext, severity: Severity, error: &MigrationError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &EventContext, severity: Severity, error: &MigrationError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn on_success(&self, ctx: &EventContext, stats: EventStats) {
        tracing::info!(
            stage = %ctx.stage,
            bucket = %ctx.bucket,
            key = %ctx.key,
            collection = ctx.collection.as_deref().unwrap_or("-"),
            rows = stats.rows,
            "stage ok"
        );
    }

    fn on_failure(&self, ctx: &EventContext, severity: Severity, error: &MigrationError) {
        let collection = ctx.collection.as_deref().unwrap_or("-");
        match severity {
            Severity::Info => tracing::info!(stage = %ctx.stage, key = %ctx.key, collection, err = %error, "stage skipped"),
            Severity::Warning => tracing::warn!(stage = %ctx.stage, key = %ctx.key, collection, err = %error, "stage skipped"),
            Severity::Error | Severity::Critical => {
                tracing::error!(stage = %ctx.stage, key = %ctx.key, collection, ?severity, err = %error, "stage failed")
            }
        }
    }

    fn on_alert(&self, ctx: &EventContext, severity: Severity, error: &MigrationError) {
        tracing::error!(
            alert = true,
            stage = %ctx.stage,
            bucket = %ctx.bucket,
            key = %ctx.key,
            ?severity,
            err = %error,
            "ALERT"
        );
    }
}

/// Appends events to a local log file.
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

impl MigrationObserver for FileObserver {
    fn on_success(&self, ctx: &EventContext, stats: EventStats) {
        self.append_line(&format!(
            "{} ok stage={} key={}/{} rows={}",
            unix_ts(),
            ctx.stage,
            ctx.bucket,
            ctx.key,
            stats.rows
        ));
    }

    fn on_failure(&self, ctx: &EventContext, severity: Severity, error: &MigrationError) {
        self.append_line(&format!(
            "{} fail severity={:?} stage={} key={}/{} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.bucket,
            ctx.key,
            error
        ));
    }

    fn on_alert(&self, ctx: &EventContext, severity: Severity, error: &MigrationError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} stage={} key={}/{} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.bucket,
            ctx.key,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_store_is_critical() {
        let err = MigrationError::StoreUnreachable {
            uri: "file:///nope".to_string(),
            message: "no such directory".to_string(),
        };
        assert_eq!(severity_for_error(&err), Severity::Critical);
    }

    #[test]
    fn file_observer_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let obs = FileObserver::new(&path);
        let ctx = EventContext::new(Stage::Load, "meteo", "a/b.csv").with_collection("b");
        obs.on_success(&ctx, EventStats { rows: 3 });
        obs.on_failure(
            &ctx,
            Severity::Error,
            &MigrationError::Store {
                message: "boom".to_string(),
            },
        );

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ok stage=load key=meteo/a/b.csv rows=3"));
        assert!(lines[1].contains("fail severity=Error"));
    }
}
