//! Модуль для интеграции с OpenAI API
//!
//! Этот модуль содержит реализации провайдеров синтеза речи
//! (/v1/audio/speech) и распознавания речи (/v1/audio/transcriptions).

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use crate::config::EngineConfig;
use crate::error::{Result, EngineError};
use crate::providers::cache::SynthesisCache;
use crate::providers::{SpeechSynthesizer, SpeechTranscriber, SynthesizedAudio, Transcription, TranscriptSegment};
use crate::utils::probe;
use crate::utils::temp::TempFileManager;

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const MODELS_URL: &str = "https://api.openai.com/v1/models";

/// Провайдер синтеза речи через OpenAI API
///
/// Синтезированное аудио сохраняется во временную директорию;
/// ссылка на аудио — путь к mp3 файлу.
pub struct OpenAiSynthesizer {
    /// HTTP клиент
    client: Client,
    /// API ключ
    api_key: String,
    /// Модель TTS
    model: String,
    /// Кэш синтезированного аудио
    cache: Option<Mutex<SynthesisCache>>,
    /// Менеджер временных файлов
    temp: Mutex<TempFileManager>,
}

impl OpenAiSynthesizer {
    /// Создать провайдер из конфигурации
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if config.openai_api_key.trim().is_empty() {
            log::error!("OpenAI API key is empty");
            return Err(EngineError::Configuration(
                "OpenAI API key is required for speech synthesis".to_string(),
            ));
        }

        let cache = if config.use_caching {
            Some(Mutex::new(SynthesisCache::new(config)?))
        } else {
            None
        };

        Ok(Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.tts_model.as_str().to_string(),
            cache,
            temp: Mutex::new(TempFileManager::new(config.cleanup_temp_files)?),
        })
    }

    /// Проверить API ключ тестовым запросом
    pub async fn validate_api_key(&self) -> Result<()> {
        log::debug!("Making test request to OpenAI API to validate key...");
        let response = self.client
            .get(MODELS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("Failed to read error response: {}", e),
            };
            log::error!("OpenAI API key validation failed (status {}): {}", status, error_text);
            return Err(EngineError::Configuration(format!(
                "Invalid OpenAI API key: {} (status {})", error_text, status
            )));
        }

        log::info!("OpenAI API key validated successfully");
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str, _language: &str) -> Result<SynthesizedAudio> {
        // Кэш содержит только принятое аудио (см. commit), поэтому
        // попадание означает ранее верифицированный результат
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.lock().get_cached_file(text, voice, &self.model) {
                log::debug!("Synthesis cache hit for voice '{}'", voice);
                let duration = probe::get_audio_duration(&cached)?;
                return Ok(SynthesizedAudio {
                    reference: cached,
                    duration_secs: duration,
                });
            }
        }

        log::info!("Sending TTS request to OpenAI API ({} chars, voice '{}')", text.chars().count(), voice);
        let response = self.client
            .post(SPEECH_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "voice": voice,
                "input": text,
                "response_format": "mp3",
                "speed": 1.0
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("Failed to read error response: {}", e),
            };
            log::error!("OpenAI API error (status {}): {}", status, error_text);
            return Err(EngineError::Synthesis(format!(
                "OpenAI speech API error (status {}): {}", status, error_text
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            log::error!("Received empty response from speech API");
            return Err(EngineError::Synthesis("Received empty audio response".to_string()));
        }

        let file_path = self.temp.lock().create_temp_file("speech", "mp3")?;
        tokio::fs::write(&file_path, &bytes).await?;
        let file_path = file_path.to_string_lossy().to_string();
        log::debug!("Saved synthesized audio to {}", file_path);

        let duration = probe::get_audio_duration(&file_path)?;

        Ok(SynthesizedAudio {
            reference: file_path,
            duration_secs: duration,
        })
    }

    /// Принятое аудио копируется в кэш; до принятия файл остаётся
    /// только во временной директории и повторный синтез того же
    /// текста выполняет новый запрос
    async fn commit(&self, text: &str, voice: &str, audio_reference: &str) -> Result<()> {
        if let Some(cache) = &self.cache {
            let cached = cache.lock().add_to_cache(text, voice, &self.model, audio_reference)?;
            log::debug!("Accepted audio cached at {}", cached);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[tokio::test]
    async fn test_cache_holds_only_committed_audio() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            openai_api_key: "test-key".to_string(),
            cache_dir: Some(temp_dir.path().join("cache").to_string_lossy().to_string()),
            ..EngineConfig::default()
        };
        let synthesizer = OpenAiSynthesizer::new(&config).unwrap();

        let audio = temp_dir.path().join("attempt.mp3");
        std::fs::write(&audio, b"fake mp3 bytes").unwrap();

        // До принятия аудио кэш пуст и повторный синтез не найдет файл
        {
            let cache = synthesizer.cache.as_ref().unwrap().lock();
            assert!(cache.get_cached_file("텍스트", "nova", &synthesizer.model).is_none());
        }

        synthesizer
            .commit("텍스트", "nova", &audio.to_string_lossy())
            .await
            .unwrap();

        let cache = synthesizer.cache.as_ref().unwrap().lock();
        assert!(cache.get_cached_file("텍스트", "nova", &synthesizer.model).is_some());
    }
}

/// Ответ /v1/audio/transcriptions в формате verbose_json
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

/// Сегмент в ответе verbose_json
#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Провайдер распознавания речи через OpenAI API
pub struct OpenAiTranscriber {
    /// HTTP клиент
    client: Client,
    /// API ключ
    api_key: String,
}

impl OpenAiTranscriber {
    /// Создать провайдер из конфигурации
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if config.openai_api_key.trim().is_empty() {
            log::error!("OpenAI API key is empty");
            return Err(EngineError::Configuration(
                "OpenAI API key is required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
        })
    }
}

#[async_trait]
impl SpeechTranscriber for OpenAiTranscriber {
    async fn transcribe(&self, audio_reference: &str, language: &str) -> Result<Transcription> {
        let file_content = tokio::fs::read(audio_reference).await.map_err(|e| {
            EngineError::FileNotFound(format!("Failed to read audio file {}: {}", audio_reference, e))
        })?;

        let file_name = std::path::Path::new(audio_reference)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(file_content)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .map_err(|e| EngineError::Transcription(e.to_string()))?,
            )
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("language", language.to_string());

        log::info!("Sending transcription request to OpenAI API for {}", audio_reference);
        let response = self.client
            .post(TRANSCRIPTION_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("Failed to read error response: {}", e),
            };
            log::error!("OpenAI transcription error (status {}): {}", status, error_text);
            return Err(EngineError::Transcription(format!(
                "OpenAI transcription API error (status {}): {}", status, error_text
            )));
        }

        let verbose: VerboseTranscription = response.json().await?;

        let segments = verbose.segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
            })
            .collect();

        Ok(Transcription {
            text: verbose.text,
            segments,
            duration_secs: verbose.duration,
        })
    }
}
