use std::{fs, path::Path};

/// Reads the bearer token left behind by the sign-in flow, if any.
pub(super) fn load_token_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                tracing::warn!(path = %path.display(), "Token file is empty");
                return None;
            }
            Some(trimmed.to_string())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Failed to read token file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_none() {
        let path = std::env::temp_dir().join("cbt-token-does-not-exist");
        assert_eq!(load_token_file(&path), None);
    }

    #[test]
    fn token_is_trimmed() {
        let path = std::env::temp_dir().join(format!("cbt-token-{}", std::process::id()));
        fs::write(&path, "  abc.def.ghi \n").expect("write token");
        assert_eq!(load_token_file(&path).as_deref(), Some("abc.def.ghi"));
        fs::remove_file(&path).ok();
    }
}
