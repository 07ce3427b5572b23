use std::path::{Path, PathBuf};

use crate::matchmaking::validate_session_token;

use super::ClientError;

/// The visitor's session token, persisted in a local file so the same
/// visitor keeps the same identity across restarts.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    token: String,
    path: PathBuf,
}

impl SessionIdentity {
    /// Read the token stored at `path`, or mint and store a new one if the
    /// file is missing or holds no usable token.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                if let Ok(token) = validate_session_token(&contents) {
                    return Ok(Self {
                        token: token.to_string(),
                        path,
                    });
                }
                tracing::warn!(path = %path.display(), "stored session token unusable, replacing it");
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let token = duet_common::id::prefixed_ulid(duet_common::id::prefix::SESSION);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &token)?;

        Ok(Self { token, path })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_then_reuses_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session");

        let first = SessionIdentity::load_or_create(&path).unwrap();
        assert!(first.token().starts_with("ses_"));

        let second = SessionIdentity::load_or_create(&path).unwrap();
        assert_eq!(first.token(), second.token());
    }

    #[test]
    fn replaces_blank_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        std::fs::write(&path, "   \n").unwrap();

        let identity = SessionIdentity::load_or_create(&path).unwrap();
        assert!(identity.token().starts_with("ses_"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), identity.token());
    }

    #[test]
    fn trims_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        std::fs::write(&path, "ses_custom\n").unwrap();

        let identity = SessionIdentity::load_or_create(&path).unwrap();
        assert_eq!(identity.token(), "ses_custom");
    }
}
