//! Модуль оценки длительности речи
//!
//! Этот модуль предсказывает длительность произнесения нормализованного
//! текста по скорости чтения языка, паузам на знаках препинания и
//! текущему поправочному коэффициенту.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::duration::learning::CorrectionFactorStore;

/// Вес паузы для знака препинания (в секундах)
const SENTENCE_END_PAUSE: f64 = 0.5;
const COMMA_PAUSE: f64 = 0.2;
const SEMICOLON_PAUSE: f64 = 0.3;
const LINE_BREAK_PAUSE: f64 = 0.4;

/// Предсказанная длительность произнесения текста
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationEstimate {
    /// Базовая длительность по скорости чтения (секунды)
    pub base_duration: f64,
    /// Длительность пауз на знаках препинания (секунды)
    pub pause_duration: f64,
    /// Применённый поправочный коэффициент
    pub correction_factor: f64,
    /// Итоговая длительность (секунды)
    pub final_duration: f64,
    /// Количество учтённых единиц контента (символы без пробелов)
    pub unit_count: usize,
}

/// Скорость чтения языка (символов в минуту, без пробелов)
fn reading_rate(language: &str) -> f64 {
    match language {
        "ko" => 200.0,
        "ja" => 250.0,
        "zh" => 220.0,
        // Латинские алфавиты: ~200 слов в минуту при средней длине слова 5
        _ => 1000.0,
    }
}

/// Оценщик длительности речи
///
/// Читает текущий поправочный коэффициент языка, но никогда его не изменяет.
pub struct DurationEstimator {
    /// Сервис поправочных коэффициентов
    store: Arc<CorrectionFactorStore>,
}

impl DurationEstimator {
    /// Создать оценщик, читающий коэффициенты из указанного сервиса
    pub fn new(store: Arc<CorrectionFactorStore>) -> Self {
        Self { store }
    }

    /// Предсказать длительность произнесения нормализованного текста
    ///
    /// Пустой текст даёт нулевую длительность без ошибки.
    pub fn estimate(&self, normalized_text: &str, language: &str) -> DurationEstimate {
        estimate_with_factor(normalized_text, language, self.store.factor(language))
    }

    /// Оценить допустимое количество единиц контента для бюджета времени
    ///
    /// Обратная операция к estimate: инвертирует базовую формулу
    /// и применяет допуск margin с обеих сторон.
    pub fn estimate_unit_count(
        &self,
        target_duration: f64,
        language: &str,
        margin: f64,
    ) -> (usize, usize) {
        let factor = self.store.factor(language);
        if target_duration <= 0.0 || factor <= 0.0 {
            return (0, 0);
        }

        let units = target_duration / factor * reading_rate(language) / 60.0;
        let min_units = (units * (1.0 - margin)).floor().max(0.0) as usize;
        let max_units = (units * (1.0 + margin)).ceil() as usize;
        (min_units, max_units)
    }
}

/// Предсказать длительность с явно заданным коэффициентом
pub fn estimate_with_factor(normalized_text: &str, language: &str, factor: f64) -> DurationEstimate {
    let unit_count = normalized_text.chars().filter(|c| !c.is_whitespace()).count();

    let base_duration = unit_count as f64 / reading_rate(language) * 60.0;
    let pause_duration = pause_duration(normalized_text);
    let final_duration = (base_duration + pause_duration) * factor;

    DurationEstimate {
        base_duration,
        pause_duration,
        correction_factor: factor,
        final_duration,
        unit_count,
    }
}

/// Суммарная длительность пауз на знаках препинания
fn pause_duration(text: &str) -> f64 {
    text.chars()
        .map(|c| match c {
            '.' | '!' | '?' | '…' | '。' | '！' | '？' => SENTENCE_END_PAUSE,
            ',' | '、' | '，' => COMMA_PAUSE,
            ';' | ':' => SEMICOLON_PAUSE,
            '\n' => LINE_BREAK_PAUSE,
            _ => 0.0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearningConfig;

    fn estimator() -> DurationEstimator {
        DurationEstimator::new(Arc::new(CorrectionFactorStore::in_memory(LearningConfig::default())))
    }

    #[test]
    fn test_korean_scenario() {
        let estimator = estimator();
        let estimate = estimator.estimate("안녕하세요. 오늘은 좋은 날씨입니다.", "ko");

        // 17 символов без пробелов при 200 символах в минуту
        assert_eq!(estimate.unit_count, 17);
        assert!((estimate.base_duration - 17.0 / 200.0 * 60.0).abs() < 1e-9);
        // Две точки в конце предложений
        assert!((estimate.pause_duration - 1.0).abs() < 1e-9);
        assert_eq!(estimate.correction_factor, 1.0);
        assert!((estimate.final_duration - (estimate.base_duration + 1.0)).abs() < 1e-9);
        // 17 / 200 * 60 + 1.0 при коэффициенте 1.0
        assert!((estimate.final_duration - 6.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text() {
        let estimator = estimator();
        let estimate = estimator.estimate("", "ko");

        assert_eq!(estimate.unit_count, 0);
        assert_eq!(estimate.final_duration, 0.0);
    }

    #[test]
    fn test_pause_weights() {
        assert!((pause_duration("a, b; c:\nd.") - (0.2 + 0.3 + 0.3 + 0.4 + 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_correction_factor_applied() {
        let store = Arc::new(CorrectionFactorStore::in_memory(LearningConfig::default()));
        // Сдвигаем коэффициент вверх наблюдением с error_ratio = 2.0
        store.apply_observation("ko", 2.0);
        let factor = store.factor("ko");
        assert!((factor - 1.1).abs() < 1e-9);

        let estimator = DurationEstimator::new(store);
        let estimate = estimator.estimate("안녕하세요", "ko");
        let unscaled = estimate.base_duration + estimate.pause_duration;
        assert!((estimate.final_duration - unscaled * factor).abs() < 1e-9);
    }

    #[test]
    fn test_unit_count_round_trip() {
        let estimator = estimator();
        // Текст без знаков препинания: инверсия точна
        let text = "안녕하세요 좋은 아침입니다";
        let estimate = estimator.estimate(text, "ko");

        let (min_units, max_units) = estimator.estimate_unit_count(estimate.final_duration, "ko", 0.0);
        let visible = estimate.unit_count;
        assert!(min_units <= visible && visible <= max_units);
        assert!(max_units - min_units <= 1);
    }

    #[test]
    fn test_unit_count_margin() {
        let estimator = estimator();
        let (min_units, max_units) = estimator.estimate_unit_count(60.0, "ko", 0.1);

        // 60 секунд при 200 символах в минуту — 200 символов ± 10%
        assert_eq!(min_units, 180);
        assert_eq!(max_units, 220);
    }

    #[test]
    fn test_zero_target_duration() {
        let estimator = estimator();
        assert_eq!(estimator.estimate_unit_count(0.0, "ko", 0.1), (0, 0));
    }
}
