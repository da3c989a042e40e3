//! Record of objects a simulated run would have created

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;

/// Append-only log of would-be objects
///
/// Shared by every step of a simulated run; appends are serialised by an
/// internal lock.
#[derive(Debug, Default)]
pub struct DryLogger {
    inner: Mutex<Vec<Value>>,
}

impl DryLogger {
    /// Empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `object` of `kind`
    pub fn add_object<T: Serialize>(&self, kind: &str, object: &T) -> Result<(), serde_json::Error> {
        let entry = json!({ "kind": kind, "object": serde_json::to_value(object)? });
        tracing::debug!("Dry run recorded {}", kind);
        self.inner.lock().push(entry);
        Ok(())
    }

    /// Snapshot of recorded objects, in insertion order
    pub fn objects(&self) -> Vec<Value> {
        self.inner.lock().clone()
    }

    /// Write recorded objects as a pretty JSON array
    pub fn write_to(&self, mut out: impl Write) -> std::io::Result<()> {
        let objects = self.objects();
        serde_json::to_writer_pretty(&mut out, &objects)?;
        writeln!(out)
    }
}
