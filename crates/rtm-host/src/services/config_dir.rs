// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration file resolution.

use std::ffi::OsString;
use std::path::PathBuf;

use rtm_core::BridgeConfig;
use tracing::{info, warn};

/// File name searched for in each candidate directory.
pub const CONFIG_FILE: &str = "rtm-bridge.json";

/// Load the bridge configuration.
///
/// An explicit path (first CLI argument) wins. Otherwise the XDG config dir,
/// then `~/.config/rtm-bridge`, then the working directory are searched.
/// Anything missing or unreadable falls back to defaults.
pub fn load_config(explicit: Option<PathBuf>) -> BridgeConfig {
    let candidates = match explicit {
        Some(path) => vec![path],
        None => search_path(std::env::var_os("XDG_CONFIG_HOME"), std::env::var_os("HOME")),
    };
    load_first(&candidates)
}

/// Candidate config files, most specific first.
fn search_path(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(xdg) = xdg_config_home.filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(xdg).join("rtm-bridge"));
    }
    if let Some(home) = home.filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(home).join(".config").join("rtm-bridge"));
    }
    dirs.push(PathBuf::new());
    dirs.into_iter().map(|dir| dir.join(CONFIG_FILE)).collect()
}

fn load_first(candidates: &[PathBuf]) -> BridgeConfig {
    let Some(path) = candidates.iter().find(|path| path.is_file()) else {
        warn!(searched = ?candidates, "no config file found, using defaults");
        return BridgeConfig::default();
    };
    match BridgeConfig::load(path) {
        Ok(config) => {
            info!(path = %path.display(), "config loaded");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            BridgeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_comes_before_home_and_cwd() {
        let paths = search_path(Some("/xdg".into()), Some("/home/ann".into()));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/xdg/rtm-bridge/rtm-bridge.json"),
                PathBuf::from("/home/ann/.config/rtm-bridge/rtm-bridge.json"),
                PathBuf::from("rtm-bridge.json"),
            ]
        );
    }

    #[test]
    fn empty_variables_are_ignored() {
        let paths = search_path(Some("".into()), None);
        assert_eq!(paths, vec![PathBuf::from("rtm-bridge.json")]);
    }

    #[test]
    fn first_existing_file_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        let present = dir.path().join("present.json");
        std::fs::write(&present, r#"{ "max_clients": 3 }"#).expect("write");

        let config = load_first(&[missing, present]);
        assert_eq!(config.max_clients, 3);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "max_clients = 3").expect("write");

        assert_eq!(load_first(&[path]), BridgeConfig::default());
    }

    #[test]
    fn explicit_missing_path_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(Some(dir.path().join("nope.json")));
        assert_eq!(config, BridgeConfig::default());
    }
}
