//! Модуль цикла верификации синтеза речи
//!
//! Центральный оркестратор: нормализует текст, синтезирует речь,
//! распознаёт результат и повторяет попытки, пока сходство транскрипта
//! с исходным текстом не достигнет порога. Каждая завершённая попытка
//! отправляет наблюдение в систему обучения длительности.

pub mod similarity;

use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use crate::config::EngineConfig;
use crate::duration::{DurationEstimate, DurationEstimator, DurationLearning, RecordTags};
use crate::error::{Result, EngineError};
use crate::progress::{AttemptInfo, ProcessStep, ProgressTracker};
use crate::providers::{SpeechSynthesizer, SpeechTranscriber};
use crate::text::{self, NormalizationMapping};

/// Состояние цикла верификации
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Выполняется попытка с указанным номером
    Attempting(u32),
    /// Порог сходства достигнут
    Accepted,
    /// Бюджет попыток исчерпан, но транскрипты получены
    SoftFailed,
    /// Ни одна попытка не дала транскрипт
    HardFailed,
    /// Отменено вызывающей стороной
    Cancelled,
}

/// Статус итогового результата верификации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// Сходство достигло порога
    Accepted,
    /// Бюджет попыток исчерпан: возвращена лучшая попытка,
    /// вызывающая сторона решает, принимать ли её
    BelowThreshold,
}

/// Одна попытка цикла верификации
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationAttempt {
    /// Номер попытки (начиная с 1)
    pub index: u32,
    /// Ссылка на синтезированное аудио, если синтез удался
    pub audio_reference: Option<String>,
    /// Длительность синтезированного аудио (секунды)
    pub audio_duration: Option<f64>,
    /// Полученный транскрипт, если распознавание удалось
    pub transcript: Option<String>,
    /// Сходство нормализованного текста и транскрипта
    pub similarity: f64,
    /// Достигла ли попытка порога сходства
    pub accepted: bool,
    /// Причина неудачи попытки, если провайдер вернул ошибку
    pub error: Option<String>,
}

/// Итог цикла верификации
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Ссылка на итоговое аудио (лучшая попытка)
    pub audio_reference: String,
    /// Длительность итогового аудио (секунды)
    pub audio_duration: f64,
    /// Итоговое сходство
    pub final_similarity: f64,
    /// Количество выполненных попыток
    pub attempt_count: u32,
    /// Статус результата
    pub status: VerificationStatus,
    /// Нормализованный текст, отправленный в синтезатор
    pub normalized_text: String,
    /// Выполненные замены нормализации
    pub mappings: Vec<NormalizationMapping>,
    /// Предсказанная длительность, вычисленная до синтеза
    pub estimate: DurationEstimate,
    /// Все попытки в порядке выполнения
    pub attempts: Vec<VerificationAttempt>,
}

/// Оркестратор верифицированного синтеза речи
pub struct SpeechVerifier {
    /// Конфигурация движка
    config: EngineConfig,
    /// Провайдер синтеза речи
    synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Провайдер распознавания речи
    transcriber: Arc<dyn SpeechTranscriber>,
    /// Система обучения длительности
    learning: Arc<DurationLearning>,
    /// Оценщик длительности
    estimator: DurationEstimator,
}

impl SpeechVerifier {
    /// Создать оркестратор с указанными провайдерами
    pub fn new(
        config: EngineConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcriber: Arc<dyn SpeechTranscriber>,
        learning: Arc<DurationLearning>,
    ) -> Self {
        let estimator = DurationEstimator::new(learning.store().clone());
        Self {
            config,
            synthesizer,
            transcriber,
            learning,
            estimator,
        }
    }

    /// Конфигурация движка
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Система обучения длительности
    pub fn learning(&self) -> &Arc<DurationLearning> {
        &self.learning
    }

    /// Оценщик длительности
    pub fn estimator(&self) -> &DurationEstimator {
        &self.estimator
    }

    /// Выполнить верифицированный синтез речи
    ///
    /// Попытки строго последовательны и ограничены max_attempts.
    /// Первая попытка, чьё сходство достигает порога, принимается сразу.
    /// Если порог не достигнут, но транскрипты получены, возвращается
    /// лучшая попытка со статусом BelowThreshold. Ошибка ExhaustedRetries
    /// возвращается только когда ни одна попытка не дала транскрипт.
    pub async fn verify_and_synthesize(
        &self,
        text: &str,
        language: &str,
        voice: &str,
        tracker: Option<&ProgressTracker>,
        cancel: Option<&CancellationToken>,
    ) -> Result<VerificationResult> {
        log::info!("Starting speech verification for {} chars of '{}' text", text.chars().count(), language);

        if let Some(t) = tracker {
            t.set_step(ProcessStep::TextNormalization);
            t.update_step_progress(0.0, Some("Нормализация текста".to_string()));
        }

        let outcome = text::normalize(text, language);
        if outcome.normalized_text.is_empty() {
            return Err(EngineError::Normalization(
                "Text is empty after normalization".to_string(),
            ));
        }

        if let Some(t) = tracker {
            t.set_step(ProcessStep::DurationEstimation);
        }

        let estimate = self.estimator.estimate(&outcome.normalized_text, language);
        log::debug!(
            "Estimated duration {:.2}s for {} units (factor {:.4})",
            estimate.final_duration, estimate.unit_count, estimate.correction_factor,
        );

        let mut attempts: Vec<VerificationAttempt> = Vec::new();
        let mut state = LoopState::Attempting(1);

        while let LoopState::Attempting(index) = state {
            // Отмена проверяется между попытками, не внутри вызова провайдера
            if cancel.map_or(false, |c| c.is_cancelled()) {
                state = LoopState::Cancelled;
                break;
            }

            let attempt = self
                .run_attempt(index, &outcome.normalized_text, language, voice, &estimate, tracker)
                .await;
            let accepted = attempt.accepted;
            attempts.push(attempt);

            state = if accepted {
                LoopState::Accepted
            } else if index >= self.config.max_attempts {
                if attempts.iter().any(|a| a.transcript.is_some()) {
                    LoopState::SoftFailed
                } else {
                    LoopState::HardFailed
                }
            } else {
                LoopState::Attempting(index + 1)
            };
        }

        match state {
            LoopState::Accepted | LoopState::SoftFailed => {
                if let Some(t) = tracker {
                    t.complete();
                }
                let result =
                    self.build_result(state, outcome.normalized_text, outcome.mappings, estimate, attempts)?;

                // Кэшируется только принятое аудио: отклонённый результат
                // не должен подменять будущие синтезы того же текста
                if result.status == VerificationStatus::Accepted {
                    if let Err(e) = self
                        .synthesizer
                        .commit(&result.normalized_text, voice, &result.audio_reference)
                        .await
                    {
                        log::warn!("Failed to commit accepted audio: {}", e);
                    }
                }

                Ok(result)
            }
            LoopState::HardFailed => {
                log::error!("All {} attempts failed without producing a transcript", self.config.max_attempts);
                Err(EngineError::ExhaustedRetries {
                    attempts: self.config.max_attempts,
                })
            }
            LoopState::Cancelled => {
                let after_attempt = attempts.len() as u32;
                log::warn!("Verification cancelled after attempt {}", after_attempt);
                Err(EngineError::Cancelled { after_attempt })
            }
            LoopState::Attempting(_) => unreachable!("loop exits only in a terminal state"),
        }
    }

    /// Выполнить одну попытку: синтез, распознавание, оценка сходства
    ///
    /// Ошибка или таймаут провайдера не прерывает цикл: попытка
    /// фиксируется как неудачная и расходует бюджет.
    async fn run_attempt(
        &self,
        index: u32,
        normalized_text: &str,
        language: &str,
        voice: &str,
        estimate: &DurationEstimate,
        tracker: Option<&ProgressTracker>,
    ) -> VerificationAttempt {
        let provider_timeout = Duration::from_secs(self.config.provider_timeout_secs);
        let mut attempt = VerificationAttempt {
            index,
            audio_reference: None,
            audio_duration: None,
            transcript: None,
            similarity: 0.0,
            accepted: false,
            error: None,
        };

        if let Some(t) = tracker {
            t.set_step(ProcessStep::SpeechSynthesis);
            t.update_step_progress(
                0.0,
                Some(format!("Попытка {} из {}", index, self.config.max_attempts)),
            );
        }

        let audio = match timeout(
            provider_timeout,
            self.synthesizer.synthesize(normalized_text, voice, language),
        )
        .await
        {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => {
                log::warn!("Synthesis failed on attempt {}: {}", index, e);
                attempt.error = Some(e.to_string());
                self.report_attempt(tracker, &attempt, "synthesis failed");
                return attempt;
            }
            Err(_) => {
                log::warn!(
                    "Synthesis timed out after {}s on attempt {}",
                    self.config.provider_timeout_secs, index,
                );
                attempt.error =
                    Some(EngineError::ProviderTimeout(self.config.provider_timeout_secs).to_string());
                self.report_attempt(tracker, &attempt, "synthesis timed out");
                return attempt;
            }
        };

        attempt.audio_reference = Some(audio.reference.clone());
        attempt.audio_duration = Some(audio.duration_secs);

        // Каждая попытка с успешным синтезом кормит систему обучения
        self.learning.record(
            normalized_text,
            language,
            estimate.final_duration,
            audio.duration_secs,
            Some(RecordTags {
                platform: None,
                voice: Some(voice.to_string()),
            }),
        );

        if let Some(t) = tracker {
            t.set_step(ProcessStep::Transcription);
        }

        let transcription = match timeout(
            provider_timeout,
            self.transcriber.transcribe(&audio.reference, language),
        )
        .await
        {
            Ok(Ok(transcription)) => transcription,
            Ok(Err(e)) => {
                log::warn!("Transcription failed on attempt {}: {}", index, e);
                attempt.error = Some(e.to_string());
                self.report_attempt(tracker, &attempt, "transcription failed");
                return attempt;
            }
            Err(_) => {
                log::warn!(
                    "Transcription timed out after {}s on attempt {}",
                    self.config.provider_timeout_secs, index,
                );
                attempt.error =
                    Some(EngineError::ProviderTimeout(self.config.provider_timeout_secs).to_string());
                self.report_attempt(tracker, &attempt, "transcription timed out");
                return attempt;
            }
        };

        if let Some(t) = tracker {
            t.set_step(ProcessStep::SimilarityCheck);
        }

        attempt.similarity = similarity::similarity(normalized_text, &transcription.text);
        attempt.transcript = Some(transcription.text);
        attempt.accepted = attempt.similarity >= self.config.accuracy_threshold;

        log::info!(
            "Attempt {} similarity {:.3} (threshold {:.3})",
            index, attempt.similarity, self.config.accuracy_threshold,
        );

        let status = if attempt.accepted { "accepted" } else { "retrying" };
        self.report_attempt(tracker, &attempt, status);

        attempt
    }

    /// Уведомить наблюдателей о завершении попытки
    fn report_attempt(&self, tracker: Option<&ProgressTracker>, attempt: &VerificationAttempt, status: &str) {
        if let Some(t) = tracker {
            t.report_attempt(
                AttemptInfo {
                    index: attempt.index,
                    similarity: attempt.similarity,
                    status: status.to_string(),
                },
                Some(format!("Попытка {}: сходство {:.3}", attempt.index, attempt.similarity)),
            );
        }
    }

    /// Собрать итоговый результат из лучшей попытки
    fn build_result(
        &self,
        state: LoopState,
        normalized_text: String,
        mappings: Vec<NormalizationMapping>,
        estimate: DurationEstimate,
        attempts: Vec<VerificationAttempt>,
    ) -> Result<VerificationResult> {
        let best = attempts
            .iter()
            .filter(|a| a.transcript.is_some() && a.audio_reference.is_some())
            .max_by(|a, b| a.similarity.partial_cmp(&b.similarity).unwrap_or(std::cmp::Ordering::Equal))
            .cloned()
            .ok_or_else(|| EngineError::Other("No usable attempt in terminal state".to_string()))?;

        let status = match state {
            LoopState::Accepted => VerificationStatus::Accepted,
            _ => VerificationStatus::BelowThreshold,
        };

        if status == VerificationStatus::BelowThreshold {
            log::warn!(
                "Accuracy threshold {:.3} not met, returning best attempt {} with similarity {:.3}",
                self.config.accuracy_threshold, best.index, best.similarity,
            );
        }

        Ok(VerificationResult {
            audio_reference: best.audio_reference.clone().unwrap_or_default(),
            audio_duration: best.audio_duration.unwrap_or_default(),
            final_similarity: best.similarity,
            attempt_count: attempts.len() as u32,
            status,
            normalized_text,
            mappings,
            estimate,
            attempts,
        })
    }
}
