//! `.env` secrets file parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENV_FILE: &str = ".env";

/// API keys the bundled agent adapter knows how to use.
pub const KNOWN_API_KEYS: [&str; 3] = ["CLAUDE_API_KEY", "OPENAI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    #[error("failed to read env file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {message}")]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

pub fn parse_env_file(contents: &str, path: &Path) -> Result<BTreeMap<String, String>, EnvFileError> {
    let mut vars = BTreeMap::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let syntax = |message: &str| EnvFileError::Syntax {
            path: path.to_path_buf(),
            line: idx + 1,
            message: message.to_string(),
        };
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| syntax("expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(syntax("empty key"));
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    Ok(vars)
}

pub fn load_env_file(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>, EnvFileError> {
    let path_ref = path.as_ref();
    let body = fs::read_to_string(path_ref).map_err(|source| EnvFileError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_env_file(&body, path_ref)
}

/// Well-known API keys that are set to a non-empty value.
pub fn present_api_keys(vars: &BTreeMap<String, String>) -> Vec<&'static str> {
    KNOWN_API_KEYS
        .into_iter()
        .filter(|key| vars.get(*key).is_some_and(|value| !value.is_empty()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
