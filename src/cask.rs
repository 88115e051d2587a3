use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get Caskroom directory
pub fn caskroom_dir(prefix: &Path) -> PathBuf {
    prefix.join("Caskroom")
}

/// List tokens of installed casks
pub fn list_installed_casks(prefix: &Path) -> Result<Vec<String>> {
    let mut casks = Vec::new();
    let caskroom = caskroom_dir(prefix);

    if !caskroom.exists() {
        return Ok(casks);
    }

    for entry in std::fs::read_dir(&caskroom)? {
        let entry = entry?;
        let token = entry.file_name().to_string_lossy().to_string();

        if token.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        // Only count tokens that still hold a version directory
        let installed = std::fs::read_dir(entry.path())?
            .flatten()
            .any(|v| v.path().is_dir());
        if installed {
            casks.push(token);
        }
    }

    casks.sort();
    Ok(casks)
}

/// Extract `app` artifact names from cask JSON
pub fn extract_app_artifacts(artifacts: &[serde_json::Value]) -> Vec<String> {
    let mut apps = Vec::new();

    for artifact in artifacts {
        if let Some(obj) = artifact.as_object()
            && let Some(app_array) = obj.get("app")
            && let Some(arr) = app_array.as_array()
        {
            for item in arr {
                if let Some(app_name) = item.as_str() {
                    apps.push(app_name.to_string());
                }
            }
        }
    }

    apps
}

/// Name used to search for leftovers: the first app bundle without `.app`
pub fn app_search_name(token: &str, artifacts: &[serde_json::Value]) -> String {
    extract_app_artifacts(artifacts)
        .into_iter()
        .next()
        .map(|app| {
            let file = app.rsplit('/').next().unwrap_or(&app).to_string();
            file.strip_suffix(".app").map(str::to_string).unwrap_or(file)
        })
        .unwrap_or_else(|| token.to_string())
}
