use std::path::PathBuf;

use crate::errors::ConfigPathScope;

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[must_use]
pub fn resolve_fundchain_cache_dir() -> PathBuf {
    if let Some(explicit) = non_empty_env(crate::ENV_FUNDCHAIN_CACHE_DIR) {
        return PathBuf::from(explicit);
    }
    if let Some(xdg_cache_home) = non_empty_env("XDG_CACHE_HOME") {
        return PathBuf::from(xdg_cache_home).join("fundchain");
    }
    if let Some(home) = non_empty_env("HOME") {
        return PathBuf::from(home).join(".cache").join("fundchain");
    }
    PathBuf::from(".fundchain").join("cache")
}

#[must_use]
pub fn resolve_fundchain_config_path(scope: ConfigPathScope) -> PathBuf {
    match scope {
        ConfigPathScope::User => {
            if let Some(xdg_config_home) = non_empty_env("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg_config_home)
                    .join("fundchain")
                    .join("config.env");
            }
            if let Some(home) = non_empty_env("HOME") {
                return PathBuf::from(home)
                    .join(".config")
                    .join("fundchain")
                    .join("config.env");
            }
            PathBuf::from(".fundchain").join("config.env")
        }
        ConfigPathScope::Workspace => PathBuf::from(".fundchain").join("config.env"),
    }
}
