use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Host-side surface for the home-screen widget. `reload_widgets` is
/// fire-and-forget and is invoked after every successful write or clear.
pub trait WidgetBridge: Send + Sync {
    fn write_snapshot(&self, payload: &str) -> Result<(), InfraError>;
    fn clear_snapshot(&self) -> Result<(), InfraError>;
    fn reload_widgets(&self);
}

/// Widget contract on the widget-capable platform: the snapshot lives in a
/// file the widget extension reads from the shared container.
#[derive(Debug, Clone)]
pub struct FileWidgetBridge {
    snapshot_path: PathBuf,
}

impl FileWidgetBridge {
    pub fn new(snapshot_path: impl AsRef<Path>) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }
}

impl WidgetBridge for FileWidgetBridge {
    fn write_snapshot(&self, payload: &str) -> Result<(), InfraError> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.snapshot_path, format!("{payload}\n"))?;
        Ok(())
    }

    fn clear_snapshot(&self) -> Result<(), InfraError> {
        match fs::remove_file(&self.snapshot_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(InfraError::Io(error)),
        }
    }

    fn reload_widgets(&self) {
        // The widget extension watches the snapshot file; rewriting it is the
        // refresh signal on this host.
    }
}

/// Bridge used on platforms without a widget host.
#[derive(Debug, Default)]
pub struct NoopWidgetBridge;

impl WidgetBridge for NoopWidgetBridge {
    fn write_snapshot(&self, _payload: &str) -> Result<(), InfraError> {
        Ok(())
    }

    fn clear_snapshot(&self) -> Result<(), InfraError> {
        Ok(())
    }

    fn reload_widgets(&self) {}
}

/// Recording bridge for tests and diagnostics.
#[derive(Debug, Default)]
pub struct InMemoryWidgetBridge {
    writes: Mutex<Vec<String>>,
    clear_count: AtomicUsize,
    reload_count: AtomicUsize,
}

impl InMemoryWidgetBridge {
    pub fn writes(&self) -> Result<Vec<String>, InfraError> {
        Ok(self
            .writes
            .lock()
            .map_err(|error| InfraError::State(format!("widget bridge lock poisoned: {error}")))?
            .clone())
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::Relaxed)
    }

    pub fn reload_count(&self) -> usize {
        self.reload_count.load(Ordering::Relaxed)
    }
}

impl WidgetBridge for InMemoryWidgetBridge {
    fn write_snapshot(&self, payload: &str) -> Result<(), InfraError> {
        self.writes
            .lock()
            .map_err(|error| InfraError::State(format!("widget bridge lock poisoned: {error}")))?
            .push(payload.to_string());
        Ok(())
    }

    fn clear_snapshot(&self) -> Result<(), InfraError> {
        self.clear_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn reload_widgets(&self) {
        self.reload_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Selects the bridge for the current target: the file-based widget contract
/// where a widget host exists, a no-op everywhere else.
#[cfg(target_os = "ios")]
pub fn platform_widget_bridge(state_dir: &Path) -> std::sync::Arc<dyn WidgetBridge> {
    std::sync::Arc::new(FileWidgetBridge::new(state_dir.join("widget-snapshot.json")))
}

#[cfg(not(target_os = "ios"))]
pub fn platform_widget_bridge(_state_dir: &Path) -> std::sync::Arc<dyn WidgetBridge> {
    std::sync::Arc::new(NoopWidgetBridge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_bridge_writes_and_clears_snapshot_file() {
        let path = std::env::temp_dir().join(format!(
            "onegoal-widget-tests-{}/snapshot.json",
            std::process::id()
        ));
        let bridge = FileWidgetBridge::new(&path);

        bridge.write_snapshot("{\"title\":\"Read\"}").expect("write");
        let written = fs::read_to_string(&path).expect("read snapshot");
        assert_eq!(written, "{\"title\":\"Read\"}\n");

        bridge.clear_snapshot().expect("clear");
        assert!(!path.exists());

        let _ = fs::remove_dir_all(path.parent().expect("parent dir"));
    }

    #[test]
    fn file_bridge_clear_is_idempotent() {
        let path = std::env::temp_dir().join(format!(
            "onegoal-widget-tests-{}-missing/snapshot.json",
            std::process::id()
        ));
        let bridge = FileWidgetBridge::new(&path);
        bridge.clear_snapshot().expect("clear without file");
    }

    #[test]
    fn in_memory_bridge_records_calls() {
        let bridge = InMemoryWidgetBridge::default();
        bridge.write_snapshot("one").expect("write");
        bridge.reload_widgets();
        bridge.clear_snapshot().expect("clear");
        bridge.reload_widgets();

        assert_eq!(bridge.writes().expect("writes"), vec!["one".to_string()]);
        assert_eq!(bridge.clear_count(), 1);
        assert_eq!(bridge.reload_count(), 2);
    }
}
