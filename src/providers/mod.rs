//! Модуль внешних провайдеров синтеза и распознавания речи
//!
//! Движок не синтезирует и не распознаёт речь сам: обе возможности
//! вызываются через асинхронные трейты этого модуля. Реализация для
//! OpenAI API находится в подмодуле openai.

pub mod cache;
pub mod openai;

pub use cache::SynthesisCache;
pub use openai::{OpenAiSynthesizer, OpenAiTranscriber};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;

/// Ссылка на синтезированное аудио
///
/// Движок не интерпретирует содержимое ссылки: это может быть путь
/// к файлу, URL или идентификатор объекта в хранилище.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedAudio {
    /// Непрозрачная ссылка на аудио
    pub reference: String,
    /// Длительность аудио в секундах
    pub duration_secs: f64,
}

/// Один сегмент транскрипта с временными метками
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Время начала сегмента (секунды)
    pub start: f64,
    /// Время окончания сегмента (секунды)
    pub end: f64,
    /// Текст сегмента
    pub text: String,
}

/// Результат распознавания аудио
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    /// Полный текст транскрипта
    pub text: String,
    /// Сегменты с временными метками
    pub segments: Vec<TranscriptSegment>,
    /// Длительность аудио в секундах
    pub duration_secs: f64,
}

/// Провайдер синтеза речи
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Синтезировать речь для текста указанным голосом
    ///
    /// Каждый вызов выполняет новый синтез: повторные попытки с тем же
    /// текстом должны давать независимое аудио.
    async fn synthesize(&self, text: &str, voice: &str, language: &str) -> Result<SynthesizedAudio>;

    /// Пометить синтезированное аудио как принятое
    ///
    /// Вызывается после того, как аудио прошло верификацию. Провайдер
    /// может сохранить принятое аудио для повторного использования;
    /// по умолчанию вызов ничего не делает.
    async fn commit(&self, _text: &str, _voice: &str, _audio_reference: &str) -> Result<()> {
        Ok(())
    }
}

/// Провайдер распознавания речи
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    /// Распознать аудио по ссылке, вернув текст и сегменты с метками
    async fn transcribe(&self, audio_reference: &str, language: &str) -> Result<Transcription>;
}
