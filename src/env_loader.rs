use std::path::PathBuf;

fn fallback_dotenv_path(config_dir: Option<PathBuf>) -> Option<PathBuf> {
    Some(config_dir?.join("photo-migrate").join(".env"))
}

/// Load `.env` from the working directory, falling back to
/// `~/.config/photo-migrate/.env`.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(dirs::home_dir().map(|h| h.join(".config")));
    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_lives_next_to_config_file() {
        let got = fallback_dotenv_path(Some(PathBuf::from("/home/alice/.config")));
        let want = Some(PathBuf::from("/home/alice/.config/photo-migrate/.env"));
        assert_eq!(got, want);
    }

    #[test]
    fn no_fallback_without_home() {
        assert_eq!(fallback_dotenv_path(None), None);
    }
}
