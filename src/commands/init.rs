use crate::config::loader::DEFAULT_CONFIG;
use crate::config::CONFIG_FILE_NAME;
use crate::errors::AnalyzerError;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Write the default configuration into `project_root`.
pub fn init_config(project_root: &Path, force: bool) -> Result<PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        return Err(AnalyzerError::InvalidArgument(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        ))
        .into());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .map_err(|e| AnalyzerError::file_system(&config_path, e))?;
    println!("Created {} configuration file", config_path.display());

    Ok(config_path)
}
