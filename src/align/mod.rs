//! Модуль выравнивания таймингов по сегментам транскрипта
//!
//! Сопоставляет единицы контента (сценарные реплики) с таймкодами
//! сегментов распознавания методом скользящего окна и корректирует
//! границы соседних единиц.

use serde::{Deserialize, Serialize};
use crate::config::AlignerConfig;
use crate::providers::TranscriptSegment;
use crate::verify::similarity;

/// Единица контента для выравнивания
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Порядковый номер единицы
    pub index: usize,
    /// Текст сценария единицы
    pub script: String,
}

/// Тайминг одной единицы контента
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTiming {
    /// Порядковый номер единицы
    pub unit_index: usize,
    /// Время начала (секунды)
    pub start_time: f64,
    /// Время окончания (секунды)
    pub end_time: f64,
    /// Длительность (секунды)
    pub duration: f64,
    /// Сходство сопоставленного окна со сценарием единицы
    pub confidence: f64,
    /// Текст сопоставленного окна сегментов
    pub matched_text: String,
    /// Найдено ли окно выше порога сходства
    pub matched: bool,
}

/// Итог выравнивания
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentOutcome {
    /// Тайминги всех единиц в исходном порядке
    pub timings: Vec<UnitTiming>,
    /// Оценка точности выравнивания в процентах
    pub accuracy: f64,
}

/// Выравниватель таймингов
pub struct TimingAligner {
    /// Параметры сопоставления и коррекции границ
    config: AlignerConfig,
}

impl TimingAligner {
    /// Создать выравниватель с указанной конфигурацией
    pub fn new(config: AlignerConfig) -> Self {
        Self { config }
    }

    /// Сопоставить единицы контента с сегментами транскрипта
    ///
    /// Сегменты расходуются последовательно: каждое принятое окно
    /// сдвигает курсор за свой последний сегмент. Единица без окна
    /// выше порога получает нулевую длительность и нулевую
    /// уверенность, но не прерывает выравнивание остальных.
    pub fn align(
        &self,
        segments: &[TranscriptSegment],
        units: &[ContentUnit],
        total_audio_duration: f64,
    ) -> AlignmentOutcome {
        log::info!(
            "Aligning {} content units against {} transcript segments ({:.2}s of audio)",
            units.len(), segments.len(), total_audio_duration,
        );

        let mut timings: Vec<UnitTiming> = Vec::with_capacity(units.len());
        let mut cursor = 0usize;

        for unit in units {
            let target = normalize_for_matching(&unit.script);
            if target.is_empty() || cursor >= segments.len() {
                timings.push(unmatched_timing(unit.index, last_end(&timings)));
                continue;
            }

            match self.best_window(segments, cursor, &target) {
                Some((window_len, score)) => {
                    let window = &segments[cursor..cursor + window_len];
                    let start_time = window[0].start;
                    let end_time = window[window_len - 1].end;
                    let matched_text = window
                        .iter()
                        .map(|s| s.text.trim())
                        .collect::<Vec<_>>()
                        .join(" ");

                    log::debug!(
                        "Unit {} matched {} segment(s) at {:.2}-{:.2}s (similarity {:.3})",
                        unit.index, window_len, start_time, end_time, score,
                    );

                    timings.push(UnitTiming {
                        unit_index: unit.index,
                        start_time,
                        end_time,
                        duration: end_time - start_time,
                        confidence: score,
                        matched_text,
                        matched: true,
                    });
                    cursor += window_len;
                }
                None => {
                    log::warn!(
                        "No segment window reached similarity floor {:.2} for unit {}",
                        self.config.similarity_floor, unit.index,
                    );
                    timings.push(unmatched_timing(unit.index, last_end(&timings)));
                }
            }
        }

        self.adjust_boundaries(&mut timings, total_audio_duration);

        let accuracy = validate_accuracy(&timings, None);
        log::info!(
            "Alignment finished: {}/{} units matched, accuracy {:.1}%",
            timings.iter().filter(|t| t.matched).count(), timings.len(), accuracy,
        );

        AlignmentOutcome { timings, accuracy }
    }

    /// Найти лучшее окно из 1..=max_window сегментов начиная с курсора
    ///
    /// Возвращает длину окна и его сходство с текстом единицы, если
    /// хотя бы одно окно достигает порога. При равном сходстве
    /// предпочитается более короткое окно.
    fn best_window(&self, segments: &[TranscriptSegment], cursor: usize, target: &str) -> Option<(usize, f64)> {
        let max_window = self.config.max_window.min(segments.len() - cursor);
        let mut window_text = String::new();
        let mut best: Option<(usize, f64)> = None;

        for window_len in 1..=max_window {
            if !window_text.is_empty() {
                window_text.push(' ');
            }
            window_text.push_str(&segments[cursor + window_len - 1].text);

            let candidate = normalize_for_matching(&window_text);
            let score = similarity::lcs_ratio(target, &candidate);
            if score >= self.config.similarity_floor
                && best.map_or(true, |(_, best_score)| score > best_score)
            {
                best = Some((window_len, score));
            }
        }

        best
    }

    /// Скорректировать границы соседних сопоставленных единиц
    ///
    /// Перекрытие схлопывается в середину пересечения. Зазор не больше
    /// gap_close_threshold делится между соседями поровну. Хвостовой
    /// зазор не больше tail_close_threshold закрывается продлением
    /// последней единицы до конца аудио.
    fn adjust_boundaries(&self, timings: &mut [UnitTiming], total_audio_duration: f64) {
        let matched: Vec<usize> = timings
            .iter()
            .enumerate()
            .filter(|(_, t)| t.matched)
            .map(|(i, _)| i)
            .collect();

        for pair in matched.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            let left_end = timings[left].end_time;
            let right_start = timings[right].start_time;

            if right_start < left_end {
                let midpoint = (left_end + right_start) / 2.0;
                log::debug!(
                    "Units {} and {} overlap {:.2}-{:.2}s, boundary moved to {:.2}s",
                    timings[left].unit_index, timings[right].unit_index,
                    right_start, left_end, midpoint,
                );
                timings[left].end_time = midpoint;
                timings[right].start_time = midpoint;
            } else {
                let gap = right_start - left_end;
                if gap > 0.0 && gap <= self.config.gap_close_threshold {
                    let midpoint = left_end + gap / 2.0;
                    timings[left].end_time = midpoint;
                    timings[right].start_time = midpoint;
                }
            }
        }

        if let Some(&last) = matched.last() {
            let tail_gap = total_audio_duration - timings[last].end_time;
            if tail_gap > 0.0 && tail_gap <= self.config.tail_close_threshold {
                timings[last].end_time = total_audio_duration;
            }
        }

        // Несопоставленные единицы привязываются к уже скорректированной
        // границе соседа, иначе после расширения они окажутся внутри его
        // интервала
        let mut current_end = 0.0;
        for timing in timings.iter_mut() {
            if timing.matched {
                current_end = timing.end_time;
            } else {
                timing.start_time = current_end;
                timing.end_time = current_end;
            }
        }

        for timing in timings.iter_mut() {
            timing.duration = (timing.end_time - timing.start_time).max(0.0);
        }
    }
}

/// Оценить точность выравнивания в процентах
///
/// Базовая оценка — средняя уверенность по всем единицам, где
/// несопоставленные единицы считаются нулём. Если переданы ожидаемые
/// длительности, уверенность каждой единицы дополнительно взвешивается
/// отклонением фактической длительности от ожидаемой.
pub fn validate_accuracy(timings: &[UnitTiming], expected_durations: Option<&[f64]>) -> f64 {
    if timings.is_empty() {
        return 0.0;
    }

    let total: f64 = timings
        .iter()
        .enumerate()
        .map(|(i, timing)| {
            if !timing.matched {
                return 0.0;
            }
            let weight = match expected_durations.and_then(|d| d.get(i)) {
                Some(&expected) if expected > 0.0 => {
                    (1.0 - ((timing.duration - expected).abs() / expected).min(1.0)).max(0.0)
                }
                _ => 1.0,
            };
            timing.confidence * weight
        })
        .sum();

    total / timings.len() as f64 * 100.0
}

/// Нормализовать текст для сопоставления: нижний регистр, без
/// пунктуации, пробелы схлопнуты
fn normalize_for_matching(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Тайминг несопоставленной единицы: нулевая длительность на границе
/// предыдущей единицы
fn unmatched_timing(unit_index: usize, at: f64) -> UnitTiming {
    UnitTiming {
        unit_index,
        start_time: at,
        end_time: at,
        duration: 0.0,
        confidence: 0.0,
        matched_text: String::new(),
        matched: false,
    }
}

/// Время окончания последней единицы в списке
fn last_end(timings: &[UnitTiming]) -> f64 {
    timings.last().map(|t| t.end_time).unwrap_or(0.0)
}
