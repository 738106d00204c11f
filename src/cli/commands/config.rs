//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command against `config_path`, or the default location.
pub fn run_config(action: &ConfigAction, config_path: Option<&Path>, settings: &Settings) -> Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            println!("{}", render(settings)?);
        }

        ConfigAction::Edit => edit(&config_path, settings)?,

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

fn render(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))
}

fn edit(config_path: &Path, settings: &Settings) -> Result<()> {
    if !config_path.exists() {
        settings.save_to(config_path)?;
        Output::info(&format!("Created default config at {}", config_path.display()));
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    Output::info(&format!("Opening config in {}...", editor));

    match std::process::Command::new(&editor).arg(config_path).status() {
        Ok(status) if status.success() => {
            // Reparse so mistakes show up now rather than on the next run.
            match Settings::load_from(Some(config_path)) {
                Ok(_) => Output::success("Config saved."),
                Err(e) => Output::warning(&format!("Config saved but does not parse: {}", e)),
            }
        }
        Ok(_) => Output::warning("Editor exited with non-zero status."),
        Err(e) => {
            Output::error(&format!("Failed to open editor: {}", e));
            Output::info(&format!("Config file is at: {}", config_path.display()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.retrieval.top_k = 3;
        std::fs::write(&path, render(&settings).unwrap()).unwrap();

        let loaded = Settings::load_from(Some(path.as_path())).unwrap();
        assert_eq!(loaded.retrieval.top_k, 3);
    }
}
