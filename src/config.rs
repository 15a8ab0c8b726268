//! Модуль конфигурации библиотеки tts-verify
//!
//! Этот модуль содержит структуры и перечисления для настройки библиотеки.

use serde::{Deserialize, Serialize};

/// Модель TTS для использования с OpenAI API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TtsModel {
    /// Стандартная модель
    Standard,
    /// Модель высокого качества
    HighDefinition,
}

impl Default for TtsModel {
    fn default() -> Self {
        Self::Standard
    }
}

impl TtsModel {
    /// Получить строковое представление модели
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "tts-1",
            Self::HighDefinition => "tts-1-hd",
        }
    }
}

/// Голос для использования с OpenAI API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TtsVoice {
    /// Голос Alloy
    Alloy,
    /// Голос Echo
    Echo,
    /// Голос Fable
    Fable,
    /// Голос Onyx
    Onyx,
    /// Голос Nova
    Nova,
    /// Голос Shimmer
    Shimmer,
}

impl Default for TtsVoice {
    fn default() -> Self {
        Self::Nova
    }
}

impl TtsVoice {
    /// Получить строковое представление голоса
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Shimmer => "shimmer",
        }
    }
}

/// Параметры системы обучения длительности
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Скорость обучения для сглаживания поправочного коэффициента
    pub learning_rate: f64,
    /// Нижняя граница поправочного коэффициента
    pub factor_min: f64,
    /// Верхняя граница поправочного коэффициента
    pub factor_max: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            factor_min: 0.5,
            factor_max: 2.0,
        }
    }
}

/// Параметры выравнивания сегментов по временной шкале
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Минимальное сходство для принятия окна кандидата
    pub similarity_floor: f64,
    /// Максимальное количество сегментов в окне кандидата
    pub max_window: usize,
    /// Максимальный зазор между соседними юнитами, который закрывается
    /// расширением обоих соседей (в секундах)
    pub gap_close_threshold: f64,
    /// Максимальный зазор между последним юнитом и концом аудио,
    /// который закрывается расширением последнего юнита (в секундах)
    pub tail_close_threshold: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.80,
            max_window: 20,
            gap_close_threshold: 0.5,
            tail_close_threshold: 1.0,
        }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// API ключ для OpenAI
    pub openai_api_key: String,
    /// Модель TTS
    pub tts_model: TtsModel,
    /// Голос TTS
    pub tts_voice: TtsVoice,
    /// Минимальное сходство нормализованного текста и транскрипта
    /// для принятия попытки синтеза
    pub accuracy_threshold: f64,
    /// Максимальное количество попыток синтеза
    pub max_attempts: u32,
    /// Таймаут одного вызова провайдера (в секундах)
    pub provider_timeout_secs: u64,
    /// Максимальное количество одновременных запросов к API
    pub max_concurrent_requests: usize,
    /// Параметры системы обучения длительности
    pub learning: LearningConfig,
    /// Путь к JSON файлу поправочных коэффициентов;
    /// None означает хранение только в памяти
    pub factors_path: Option<String>,
    /// Параметры выравнивания сегментов
    pub aligner: AlignerConfig,
    /// Использовать кэширование синтезированного аудио
    pub use_caching: bool,
    /// Директория для кэша
    pub cache_dir: Option<String>,
    /// Максимальный размер кэша в байтах
    pub max_cache_size: Option<u64>,
    /// Удалять временные файлы после завершения
    pub cleanup_temp_files: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            tts_model: TtsModel::default(),
            tts_voice: TtsVoice::default(),
            accuracy_threshold: 0.95,
            max_attempts: 5,
            provider_timeout_secs: 120,
            max_concurrent_requests: 5,
            learning: LearningConfig::default(),
            factors_path: None,
            aligner: AlignerConfig::default(),
            use_caching: true,
            cache_dir: None,
            max_cache_size: Some(1024 * 1024 * 1024), // 1 GB
            cleanup_temp_files: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.accuracy_threshold, 0.95);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.learning.learning_rate, 0.1);
        assert_eq!(config.aligner.similarity_floor, 0.80);
        assert_eq!(config.tts_model.as_str(), "tts-1");
        assert_eq!(config.tts_voice.as_str(), "nova");
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.max_attempts, config.max_attempts);
        assert_eq!(restored.aligner.gap_close_threshold, config.aligner.gap_close_threshold);
    }
}
