//! Основной файл библиотеки tts-verify с поддержкой системы прогресса и уведомлений
//!
//! Эта библиотека синтезирует речь с верификацией результата: текст
//! нормализуется, синтезируется, распознаётся обратно и сравнивается
//! с исходным, пока сходство не достигнет порога. Дополнительно
//! библиотека предсказывает длительность речи с самообучающейся
//! поправкой и выравнивает единицы контента по таймкодам транскрипта.

pub mod progress;
pub mod notification;
pub mod config;
pub mod error;
pub mod text;
pub mod duration;
pub mod providers;
pub mod verify;
pub mod align;
pub mod batch;
pub mod utils;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use crate::align::{AlignmentOutcome, ContentUnit, TimingAligner};
use crate::batch::{BatchItem, BatchItemResult};
use crate::config::EngineConfig;
use crate::duration::{
    CorrectionFactor, CorrectionFactorStore, DurationEstimate, DurationLearning,
    JsonFactorRepository, LearningRecord, MemoryFactorRepository, RecordTags, StatsFilter,
};
use crate::error::{Result, EngineError};
use crate::progress::{ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};
use crate::providers::{
    OpenAiSynthesizer, OpenAiTranscriber, SpeechSynthesizer, SpeechTranscriber, TranscriptSegment,
};
use crate::verify::{SpeechVerifier, VerificationResult};

/// Сводная статистика системы обучения длительности
#[derive(Debug, Clone)]
pub struct LearningStats {
    /// Средняя точность предсказаний по фильтру
    pub average_accuracy: Option<f64>,
    /// Средний поправочный коэффициент по фильтру
    pub average_factor: Option<f64>,
}

/// Основная структура для работы с библиотекой
pub struct SpeechEngine {
    /// Конфигурация библиотеки
    config: EngineConfig,
    /// Оркестратор верифицированного синтеза
    verifier: Arc<SpeechVerifier>,
    /// Система обучения длительности
    learning: Arc<DurationLearning>,
    /// Выравниватель таймингов
    aligner: TimingAligner,
    /// Трекер прогресса
    progress_tracker: Option<ProgressTracker>,
}

impl std::fmt::Debug for SpeechEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SpeechEngine {
    /// Создать новый экземпляр SpeechEngine с указанными провайдерами
    pub fn new(
        config: EngineConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcriber: Arc<dyn SpeechTranscriber>,
    ) -> Self {
        let store = match &config.factors_path {
            Some(path) => Arc::new(CorrectionFactorStore::new(
                config.learning.clone(),
                Arc::new(JsonFactorRepository::open(path)),
            )),
            None => Arc::new(CorrectionFactorStore::new(
                config.learning.clone(),
                Arc::new(MemoryFactorRepository::new()),
            )),
        };
        let learning = Arc::new(DurationLearning::new(store));
        let verifier = Arc::new(SpeechVerifier::new(
            config.clone(),
            synthesizer,
            transcriber,
            learning.clone(),
        ));
        let aligner = TimingAligner::new(config.aligner.clone());

        Self {
            config,
            verifier,
            learning,
            aligner,
            progress_tracker: None,
        }
    }

    /// Создать экземпляр с провайдерами OpenAI из конфигурации
    pub fn with_openai(config: EngineConfig) -> Result<Self> {
        let synthesizer = Arc::new(OpenAiSynthesizer::new(&config)?);
        let transcriber = Arc::new(OpenAiTranscriber::new(&config)?);
        Ok(Self::new(config, synthesizer, transcriber))
    }

    /// Создать экземпляр с указанными провайдерами и репортером прогресса
    pub fn with_progress_reporter(
        config: EngineConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcriber: Arc<dyn SpeechTranscriber>,
        reporter: Box<dyn ProgressReporter>,
    ) -> Self {
        let mut engine = Self::new(config, synthesizer, transcriber);
        engine.set_progress_reporter(reporter);
        engine
    }

    /// Установить репортер прогресса
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        if let Some(tracker) = &mut self.progress_tracker {
            tracker.set_reporter(reporter);
        } else {
            let mut tracker = ProgressTracker::new();
            tracker.set_reporter(reporter);
            self.progress_tracker = Some(tracker);
        }
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> Result<usize> {
        if self.progress_tracker.is_none() {
            let mut tracker = ProgressTracker::new();
            tracker.set_reporter(Box::new(progress::DefaultProgressReporter::new()));
            self.progress_tracker = Some(tracker);
        }

        let tracker = self.progress_tracker.as_mut().unwrap_or_else(|| unreachable!());
        tracker
            .add_observer(observer)
            .ok_or_else(|| EngineError::Configuration("Progress reporter is not set".to_string()))
    }

    /// Конфигурация библиотеки
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Выполнить верифицированный синтез речи
    ///
    /// Голос берётся из конфигурации. Возвращает результат со ссылкой
    /// на аудио лучшей попытки и полным журналом попыток.
    pub async fn verify_and_synthesize(
        &self,
        text: &str,
        language: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<VerificationResult> {
        self.verifier
            .verify_and_synthesize(
                text,
                language,
                self.config.tts_voice.as_str(),
                self.progress_tracker.as_ref(),
                cancel,
            )
            .await
    }

    /// Верифицировать пакет текстов с ограниченным параллелизмом
    pub async fn verify_batch(
        &self,
        items: Vec<BatchItem>,
        cancel: Option<CancellationToken>,
    ) -> Vec<BatchItemResult> {
        batch::verify_batch(self.verifier.clone(), items, cancel).await
    }

    /// Выровнять единицы контента по сегментам транскрипта
    pub fn align_content_units(
        &self,
        segments: &[TranscriptSegment],
        units: &[ContentUnit],
        total_audio_duration: f64,
    ) -> AlignmentOutcome {
        if let Some(t) = &self.progress_tracker {
            t.set_step(ProcessStep::TimingAlignment);
            t.update_step_progress(0.0, Some("Выравнивание таймингов".to_string()));
        }

        let outcome = self.aligner.align(segments, units, total_audio_duration);

        if let Some(t) = &self.progress_tracker {
            t.update_step_progress(100.0, Some("Выравнивание таймингов завершено".to_string()));
        }

        outcome
    }

    /// Предсказать длительность речи для текста
    ///
    /// Текст нормализуется перед оценкой, как перед синтезом.
    pub fn estimate_duration(&self, text: &str, language: &str) -> DurationEstimate {
        let outcome = text::normalize(text, language);
        self.verifier.estimator().estimate(&outcome.normalized_text, language)
    }

    /// Зафиксировать фактическую длительность для внешнего синтеза
    ///
    /// Позволяет обучать поправочный коэффициент на наблюдениях,
    /// полученных вне цикла верификации.
    pub fn record_feedback(
        &self,
        text: &str,
        language: &str,
        predicted_duration: f64,
        actual_duration: f64,
        tags: Option<RecordTags>,
    ) -> LearningRecord {
        self.learning.record(text, language, predicted_duration, actual_duration, tags)
    }

    /// Текущий поправочный коэффициент языка
    pub fn correction_factor(&self, language: &str) -> CorrectionFactor {
        self.learning.store().snapshot(language)
    }

    /// Сводная статистика обучения по фильтру
    pub fn learning_stats(&self, filter: &StatsFilter) -> LearningStats {
        LearningStats {
            average_accuracy: self.learning.average_accuracy(filter),
            average_factor: self.learning.average_factor(filter),
        }
    }
}

/// Публичный API для удобного использования
pub async fn verify_speech(
    text: &str,
    language: &str,
    openai_api_key: &str,
) -> Result<VerificationResult> {
    let config = EngineConfig {
        openai_api_key: openai_api_key.to_string(),
        ..EngineConfig::default()
    };

    let engine = SpeechEngine::with_openai(config)?;
    engine.verify_and_synthesize(text, language, None).await
}

/// Публичный API с поддержкой отслеживания прогресса
pub async fn verify_speech_with_progress(
    text: &str,
    language: &str,
    openai_api_key: &str,
    reporter: Box<dyn ProgressReporter>,
) -> Result<VerificationResult> {
    let config = EngineConfig {
        openai_api_key: openai_api_key.to_string(),
        ..EngineConfig::default()
    };

    let synthesizer = Arc::new(OpenAiSynthesizer::new(&config)?);
    let transcriber = Arc::new(OpenAiTranscriber::new(&config)?);
    let engine = SpeechEngine::with_progress_reporter(config, synthesizer, transcriber, reporter);
    engine.verify_and_synthesize(text, language, None).await
}
