use std::path::{Path, PathBuf};

pub(crate) const BASE_DIR_ENV: &str = "ID_CARD_MASKER_DIR";

/// Per-user directory holding `settings.toml`; `ID_CARD_MASKER_DIR` wins over
/// `$HOME/.id-card-masker`.
pub(crate) fn settings_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    home_join(".id-card-masker")
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| normalize_dir(&value))
}

fn home_join(suffix: &str) -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(suffix))
        }
    })
}

fn normalize_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_tilde(trimmed);
    let mut normalized = PathBuf::new();
    for component in Path::new(&expanded).components() {
        normalized.push(component.as_os_str());
    }
    Some(normalized)
}

pub(crate) fn expand_tilde(value: &str) -> String {
    if value == "~" || value.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let home = home.trim();
            if home.is_empty() {
                return value.to_string();
            }
            if value == "~" {
                return home.to_string();
            }
            return format!("{}{}", home, &value[1..]);
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn settings_dir_lives_under_home() {
        with_temp_home(|home| {
            assert_eq!(settings_dir(), Some(home.join(".id-card-masker")));
            assert_eq!(expand_tilde("~/cards/a.jpg"), format!("{}/cards/a.jpg", home.display()));
            assert_eq!(expand_tilde("cards/a.jpg"), "cards/a.jpg");
        });
    }
}
