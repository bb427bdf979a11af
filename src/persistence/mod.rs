use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

use crate::core::AnkimorphError;

const APP_NAME: &str = "ankimorph";

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    if let Some(base) = base {
        let app_dir = base.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

/// Downloaded dictionaries and the log file live here.
pub fn get_app_data_dir() -> PathBuf {
    app_dir(dirs::data_local_dir())
}

/// Settings live here.
pub fn get_app_config_dir() -> PathBuf {
    app_dir(dirs::config_dir())
}

pub fn save_json_in<T: Serialize>(dir: &Path, data: &T, filename: &str) -> Result<(), AnkimorphError> {
    let file_path = dir.join(filename);
    let json = serde_json::to_string_pretty(data)?;
    fs::write(&file_path, json)?;
    info!("Data saved to: {}", file_path.display());
    Ok(())
}

/// Missing files load as `T::default()`.
pub fn load_json_in<T: for<'de> Deserialize<'de> + Default>(
    dir: &Path,
    filename: &str,
) -> Result<T, AnkimorphError> {
    let file_path = dir.join(filename);

    if !file_path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(&file_path)?;
    let data: T = serde_json::from_str(&json)?;
    info!("Data loaded from: {}", file_path.display());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        size: usize,
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Doc { name: "deck".to_string(), size: 3 };
        save_json_in(dir.path(), &doc, "doc.json").unwrap();
        assert_eq!(load_json_in::<Doc>(dir.path(), "doc.json").unwrap(), doc);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_json_in::<Doc>(dir.path(), "nope.json").unwrap(), Doc::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.json"), "{ not json").unwrap();
        assert!(load_json_in::<Doc>(dir.path(), "doc.json").is_err());
    }
}
