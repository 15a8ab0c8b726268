//! Модуль пакетной верификации
//!
//! Обрабатывает набор текстов параллельно с ограничением количества
//! одновременных запросов к провайдерам. Ошибка одного элемента не
//! прерывает обработку остальных.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use crate::error::EngineError;
use crate::verify::{SpeechVerifier, VerificationResult, VerificationStatus};

/// Один элемент пакета
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// Идентификатор элемента, возвращается в результате
    pub id: String,
    /// Текст для синтеза
    pub text: String,
    /// Код языка
    pub language: String,
    /// Голос синтеза
    pub voice: String,
}

/// Статус обработки одного элемента пакета
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchItemStatus {
    /// Порог сходства достигнут
    Success,
    /// Бюджет попыток исчерпан, возвращена лучшая попытка
    BelowThreshold,
    /// Верификация завершилась ошибкой
    Failed,
}

/// Результат обработки одного элемента пакета
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    /// Идентификатор элемента
    pub id: String,
    /// Статус обработки
    pub status: BatchItemStatus,
    /// Результат верификации, если она завершилась
    pub result: Option<VerificationResult>,
    /// Сообщение об ошибке, если верификация не удалась
    pub error: Option<String>,
}

/// Верифицировать пакет текстов с ограниченным параллелизмом
///
/// Количество одновременных верификаций ограничено
/// max_concurrent_requests из конфигурации. Результаты возвращаются
/// в порядке исходных элементов независимо от порядка завершения.
pub async fn verify_batch(
    verifier: Arc<SpeechVerifier>,
    items: Vec<BatchItem>,
    cancel: Option<CancellationToken>,
) -> Vec<BatchItemResult> {
    let limit = verifier.config().max_concurrent_requests.max(1);
    log::info!("Verifying batch of {} items ({} concurrent)", items.len(), limit);

    let semaphore = Arc::new(Semaphore::new(limit));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let verifier = verifier.clone();
        let semaphore = semaphore.clone();
        let cancel = cancel.clone();
        let item_id = item.id.clone();

        handles.push((item_id, tokio::spawn(async move {
            // Закрытый семафор означает отмену всего пакета
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return failed_item(item.id, EngineError::Cancelled { after_attempt: 0 }.to_string());
                }
            };

            if cancel.as_ref().map_or(false, |c| c.is_cancelled()) {
                return failed_item(item.id, EngineError::Cancelled { after_attempt: 0 }.to_string());
            }

            let outcome = verifier
                .verify_and_synthesize(&item.text, &item.language, &item.voice, None, cancel.as_ref())
                .await;

            match outcome {
                Ok(result) => {
                    let status = match result.status {
                        VerificationStatus::Accepted => BatchItemStatus::Success,
                        VerificationStatus::BelowThreshold => BatchItemStatus::BelowThreshold,
                    };
                    BatchItemResult {
                        id: item.id,
                        status,
                        result: Some(result),
                        error: None,
                    }
                }
                Err(e) => {
                    log::warn!("Batch item '{}' failed: {}", item.id, e);
                    failed_item(item.id, e.to_string())
                }
            }
        })));
    }

    let (ids, tasks): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let joined = futures::future::join_all(tasks).await;
    let mut results = Vec::with_capacity(joined.len());
    for (id, outcome) in ids.into_iter().zip(joined) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                log::error!("Batch task for item '{}' panicked: {}", id, e);
                results.push(failed_item(id, e.to_string()));
            }
        }
    }

    let failed = results.iter().filter(|r| r.status == BatchItemStatus::Failed).count();
    log::info!("Batch finished: {}/{} items failed", failed, results.len());

    results
}

fn failed_item(id: String, error: String) -> BatchItemResult {
    BatchItemResult {
        id,
        status: BatchItemStatus::Failed,
        result: None,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use crate::config::{EngineConfig, LearningConfig};
    use crate::duration::{CorrectionFactorStore, DurationLearning};
    use crate::error::Result;
    use crate::providers::{SpeechSynthesizer, SpeechTranscriber, SynthesizedAudio, Transcription};

    /// Синтезатор-эхо: следит за пиковым параллелизмом и падает на
    /// текстах с пометкой fail
    struct EchoSynthesizer {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl EchoSynthesizer {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        async fn synthesize(&self, text: &str, _voice: &str, _language: &str) -> Result<SynthesizedAudio> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if text.contains("fail") {
                return Err(EngineError::Synthesis("scripted failure".to_string()));
            }
            if text.contains("panic") {
                panic!("scripted panic");
            }
            Ok(SynthesizedAudio {
                reference: format!("echo:{}", text),
                duration_secs: 3.0,
            })
        }
    }

    /// Распознаватель-эхо: возвращает текст из ссылки на аудио
    struct EchoTranscriber;

    #[async_trait]
    impl SpeechTranscriber for EchoTranscriber {
        async fn transcribe(&self, audio_reference: &str, _language: &str) -> Result<Transcription> {
            let text = audio_reference.trim_start_matches("echo:").to_string();
            Ok(Transcription {
                text,
                segments: Vec::new(),
                duration_secs: 3.0,
            })
        }
    }

    fn verifier(max_concurrent: usize, max_attempts: u32) -> (Arc<SpeechVerifier>, Arc<EchoSynthesizer>) {
        let synthesizer = Arc::new(EchoSynthesizer::new());
        let config = EngineConfig {
            max_concurrent_requests: max_concurrent,
            max_attempts,
            ..EngineConfig::default()
        };
        let store = Arc::new(CorrectionFactorStore::in_memory(LearningConfig::default()));
        let learning = Arc::new(DurationLearning::new(store));
        let verifier = Arc::new(SpeechVerifier::new(
            config,
            synthesizer.clone(),
            Arc::new(EchoTranscriber),
            learning,
        ));
        (verifier, synthesizer)
    }

    fn item(id: &str, text: &str) -> BatchItem {
        BatchItem {
            id: id.to_string(),
            text: text.to_string(),
            language: "en".to_string(),
            voice: "nova".to_string(),
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let (verifier, _) = verifier(2, 1);
        let items = vec![
            item("a", "the first sentence of the batch"),
            item("b", "this one is marked fail on purpose"),
            item("c", "the third sentence of the batch"),
        ];

        let results = verify_batch(verifier, items, None).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].status, BatchItemStatus::Success);
        assert_eq!(results[1].id, "b");
        assert_eq!(results[1].status, BatchItemStatus::Failed);
        assert!(results[1].error.is_some());
        assert_eq!(results[2].id, "c");
        assert_eq!(results[2].status, BatchItemStatus::Success);
    }

    #[tokio::test]
    async fn test_batch_respects_concurrency_limit() {
        let (verifier, synthesizer) = verifier(2, 1);
        let items: Vec<BatchItem> = (0..8)
            .map(|i| item(&format!("item-{}", i), "a short sentence to synthesize"))
            .collect();

        let results = verify_batch(verifier, items, None).await;

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.status == BatchItemStatus::Success));
        assert!(synthesizer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_batch_panicked_task_keeps_item_id() {
        let (verifier, _) = verifier(2, 1);
        let items = vec![
            item("a", "the first sentence of the batch"),
            item("b", "this one will panic inside the task"),
            item("c", "the third sentence of the batch"),
        ];

        let results = verify_batch(verifier, items, None).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[1].id, "b");
        assert_eq!(results[1].status, BatchItemStatus::Failed);
        assert!(results[1].error.is_some());
        assert_eq!(results[0].status, BatchItemStatus::Success);
        assert_eq!(results[2].status, BatchItemStatus::Success);
    }

    #[tokio::test]
    async fn test_batch_cancellation() {
        let (verifier, _) = verifier(1, 1);
        let token = CancellationToken::new();
        token.cancel();

        let items = vec![
            item("a", "the first sentence of the batch"),
            item("b", "the second sentence of the batch"),
        ];

        let results = verify_batch(verifier, items, Some(token)).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == BatchItemStatus::Failed));
    }
}
