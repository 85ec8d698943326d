//! Configuration file editor command.

use std::process::Command;

use crate::config::{config_path, DisplayerConfig};

/// Opens the configuration file in the user's preferred editor, writing the
/// defaults first if the file does not exist yet.
///
/// Tries `$EDITOR`, then nano, then vi.
///
/// # Errors
/// - If no editor can be found or executed
/// - If the editor exits with an error
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = config_path()?;
    if !config_path.exists() {
        DisplayerConfig::default().save()?;
    }

    tracing::info!("Opening config file: {}", config_path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    // Catch mistakes now rather than on the next launch.
    let content = std::fs::read_to_string(&config_path)?;
    match DisplayerConfig::parse(&content).and_then(|c| Ok(c.audio.sampler_config()?)) {
        Ok(_) => tracing::info!("Config file edited successfully"),
        Err(e) => {
            tracing::warn!("Edited config is invalid: {e}");
            eprintln!("Warning: configuration is invalid: {e}");
        }
    }
    Ok(())
}

/// Finds the best available editor: $EDITOR, nano, vi.
fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    for editor in ["nano", "vi"] {
        if is_editor_available(editor) {
            return Ok(editor.to_string());
        }
    }

    Err(anyhow::anyhow!(
        "No editor found. Please set the $EDITOR environment variable."
    ))
}

/// Checks if an editor is available in the system PATH.
fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
