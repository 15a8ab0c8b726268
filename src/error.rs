//! Модуль обработки ошибок библиотеки tts-verify
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при работе библиотеки.

use thiserror::Error;

/// Ошибки библиотеки tts-verify
#[derive(Debug, Error)]
pub enum EngineError {
    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка провайдера синтеза речи
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Ошибка провайдера распознавания речи
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Таймаут вызова провайдера
    #[error("Provider call timed out after {0} seconds")]
    ProviderTimeout(u64),

    /// Ни одна попытка не дала транскрипт (полный отказ провайдеров)
    #[error("All {attempts} synthesis attempts failed without producing a transcript")]
    ExhaustedRetries {
        /// Количество выполненных попыток
        attempts: u32,
    },

    /// Операция отменена вызывающей стороной
    #[error("Verification cancelled after attempt {after_attempt}")]
    Cancelled {
        /// Номер последней завершенной попытки
        after_attempt: u32,
    },

    /// Ошибка нормализации текста
    #[error("Text normalization error: {0}")]
    Normalization(String),

    /// Ошибка выравнивания сегментов
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Файл не найден
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Неверный формат
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

/// Тип Result для библиотеки tts-verify
pub type Result<T> = std::result::Result<T, EngineError>;
