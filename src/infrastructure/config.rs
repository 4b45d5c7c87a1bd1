use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "OneGoal",
        "timezone": null
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn read_app_config(config_dir: &Path) -> Result<serde_json::Value, InfraError> {
    read_config(&config_dir.join(APP_JSON))
}

/// Optional IANA timezone override for the daily completion gate. Absent or
/// blank means the device-local timezone.
pub fn read_timezone(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let app = read_app_config(config_dir)?;
    Ok(app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "onegoal-config-tests-{}-{name}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn ensure_default_configs_writes_app_json_once() {
        let dir = TempConfigDir::new("defaults");
        ensure_default_configs(&dir.path).expect("write defaults");
        assert_eq!(read_timezone(&dir.path).expect("read timezone"), None);

        fs::write(
            dir.path.join(APP_JSON),
            "{\"schema\":1,\"appName\":\"OneGoal\",\"timezone\":\"Europe/Berlin\"}\n",
        )
        .expect("overwrite config");
        ensure_default_configs(&dir.path).expect("second call keeps file");
        assert_eq!(
            read_timezone(&dir.path).expect("read timezone"),
            Some("Europe/Berlin".to_string())
        );
    }

    #[test]
    fn read_config_rejects_unknown_schema() {
        let dir = TempConfigDir::new("schema");
        fs::write(dir.path.join(APP_JSON), "{\"schema\":2}\n").expect("write config");
        match read_timezone(&dir.path) {
            Err(InfraError::InvalidConfig(message)) => {
                assert!(message.contains("unsupported schema"));
            }
            other => panic!("expected invalid config error, got {other:?}"),
        }
    }

    #[test]
    fn blank_timezone_reads_as_absent() {
        let dir = TempConfigDir::new("blank-tz");
        fs::write(dir.path.join(APP_JSON), "{\"schema\":1,\"timezone\":\"  \"}\n")
            .expect("write config");
        assert_eq!(read_timezone(&dir.path).expect("read timezone"), None);
    }
}
