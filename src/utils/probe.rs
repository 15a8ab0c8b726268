//! Модуль для определения длительности аудио
//!
//! Этот модуль содержит функции для измерения длительности аудиофайлов
//! через FFprobe.

use std::process::Command;
use crate::error::{Result, EngineError};

/// Проверка наличия FFprobe
pub fn check_ffprobe_installed() -> Result<bool> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()?;

    Ok(output.status.success())
}

/// Получение длительности аудиофайла в секундах
pub fn get_audio_duration(file_path: &str) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
            file_path
        ])
        .output()?;

    if !output.status.success() {
        return Err(EngineError::Synthesis(
            format!("FFprobe command failed with status: {}", output.status)
        ));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration = duration_str.trim().parse::<f64>()
        .map_err(|_| EngineError::Synthesis(
            format!("Failed to parse audio duration: {}", duration_str)
        ))?;

    Ok(duration)
}
