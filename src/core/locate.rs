use std::env;
use std::path::{Path, PathBuf};

use crate::core::config::RunConfig;
use crate::core::error::FfmpegError;

pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";

/// Resolves `name` from `env_var` first, then from `PATH`.
pub fn locate_binary(name: &str, env_var: Option<&str>) -> Result<PathBuf, FfmpegError> {
    if let Some(var) = env_var {
        if let Some(value) = env::var_os(var).filter(|value| !value.is_empty()) {
            let path = PathBuf::from(value);
            if path.is_file() {
                log::debug!("using {name} from {var}: {}", path.display());
                return Ok(path);
            }
            log::warn!("{var} is set but {} is not a file", path.display());
        }
    }

    which::which(name).map_err(|_| FfmpegError::BinaryNotFound {
        name: name.to_string(),
    })
}

/// The ffmpeg binary for `config`: explicit path, `FFMPEG_PATH`, then `PATH`.
pub fn locate_ffmpeg(config: &RunConfig) -> Result<PathBuf, FfmpegError> {
    match &config.ffmpeg_path {
        Some(path) => resolve_explicit(path),
        None => locate_binary("ffmpeg", Some(FFMPEG_PATH_ENV)),
    }
}

fn resolve_explicit(path: &Path) -> Result<PathBuf, FfmpegError> {
    if path.components().count() > 1 || path.is_absolute() {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(FfmpegError::BinaryNotFound {
            name: path.display().to_string(),
        });
    }
    which::which(path).map_err(|_| FfmpegError::BinaryNotFound {
        name: path.display().to_string(),
    })
}
