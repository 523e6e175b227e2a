use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::token::TokenState;

/// Session file holding the TokenState between command invocations.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Result<Self> {
        let base = dirs::cache_dir()
            .or_else(dirs::home_dir)
            .context("Cannot determine cache directory")?;
        Ok(Self::new(base.join("waveglow").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<TokenState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session: {}", self.path.display()))?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt session file: {}", self.path.display()))?;
        Ok(Some(state))
    }

    pub fn save(&self, state: &TokenState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create session dir: {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session: {}", self.path.display()))?;
        restrict_permissions(&self.path)?;
        log::debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session: {}", self.path.display()))?;
            log::info!("Session cleared");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
