//! Session token persistence between runs

use crate::error::SessionFileError;
use std::fs;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// File holding the last issued session token
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Saved token, or None if no session is saved
    pub fn load(&self) -> Result<Option<Zeroizing<String>>, SessionFileError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = Zeroizing::new(fs::read_to_string(&self.path)?);
        let token = content.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Zeroizing::new(token.to_string())))
        }
    }

    /// Save `token`, replacing any previous one
    pub fn save(&self, token: &str) -> Result<(), SessionFileError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                SessionFileError::DirCreation(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        fs::write(&self.path, token)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    /// Forget the saved token; missing files are fine
    pub fn clear(&self) -> Result<(), SessionFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}
