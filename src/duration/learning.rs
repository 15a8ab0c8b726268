//! Модуль системы обучения длительности
//!
//! Этот модуль принимает пары (предсказанная, фактическая) длительности,
//! вычисляет точность предсказания и корректирует поправочный коэффициент
//! языка ограниченным сглаживанием. История наблюдений только дополняется,
//! записи никогда не изменяются и не удаляются.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use crate::config::LearningConfig;
use crate::error::Result;

/// Поправочный коэффициент длительности для одного языка
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionFactor {
    /// Код языка
    pub language: String,
    /// Значение коэффициента (начинается с 1.0)
    pub factor: f64,
    /// Количество выполненных обновлений
    pub update_count: u64,
}

impl CorrectionFactor {
    /// Начальный коэффициент для языка
    pub fn initial(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            factor: 1.0,
            update_count: 0,
        }
    }
}

/// Хранилище поправочных коэффициентов между перезапусками
///
/// Движок зависит только от операций загрузки и сохранения;
/// конкретный способ хранения определяет вызывающая сторона.
pub trait FactorRepository: Send + Sync {
    /// Загрузить коэффициент языка
    fn load(&self, language: &str) -> Result<Option<CorrectionFactor>>;
    /// Сохранить коэффициент языка
    fn save(&self, factor: &CorrectionFactor) -> Result<()>;
}

/// Хранилище коэффициентов в памяти (для тестов и разовых запусков)
pub struct MemoryFactorRepository {
    /// Карта язык → коэффициент
    factors: Mutex<HashMap<String, CorrectionFactor>>,
}

impl MemoryFactorRepository {
    /// Создать пустое хранилище
    pub fn new() -> Self {
        Self {
            factors: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryFactorRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl FactorRepository for MemoryFactorRepository {
    fn load(&self, language: &str) -> Result<Option<CorrectionFactor>> {
        Ok(self.factors.lock().get(language).cloned())
    }

    fn save(&self, factor: &CorrectionFactor) -> Result<()> {
        self.factors.lock().insert(factor.language.clone(), factor.clone());
        Ok(())
    }
}

/// Хранилище коэффициентов в JSON файле
///
/// Весь набор коэффициентов хранится одним JSON объектом язык → запись.
pub struct JsonFactorRepository {
    /// Путь к файлу с коэффициентами
    path: PathBuf,
    /// Кэш содержимого файла
    cache: Mutex<HashMap<String, CorrectionFactor>>,
}

impl JsonFactorRepository {
    /// Открыть хранилище по указанному пути
    ///
    /// Нечитаемый или повреждённый файл не считается фатальной ошибкой:
    /// хранилище начинает с пустого набора с предупреждением в логе.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Corrupt correction factor file {}: {}, starting fresh", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            cache: Mutex::new(cache),
        }
    }
}

impl FactorRepository for JsonFactorRepository {
    fn load(&self, language: &str) -> Result<Option<CorrectionFactor>> {
        Ok(self.cache.lock().get(language).cloned())
    }

    fn save(&self, factor: &CorrectionFactor) -> Result<()> {
        let mut cache = self.cache.lock();
        cache.insert(factor.language.clone(), factor.clone());

        let json = serde_json::to_string_pretty(&*cache)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Сервис поправочных коэффициентов
///
/// Владеет картой язык → коэффициент; вся мутация проходит через
/// мьютекс соответствующего языка, поэтому конкурентные обновления
/// одного языка сериализуются, а разные языки не блокируют друг друга.
pub struct CorrectionFactorStore {
    /// Границы и скорость обучения
    config: LearningConfig,
    /// Хранилище для сохранения между перезапусками
    repository: Arc<dyn FactorRepository>,
    /// Коэффициенты по языкам
    factors: RwLock<HashMap<String, Arc<Mutex<CorrectionFactor>>>>,
}

impl CorrectionFactorStore {
    /// Создать сервис с указанным хранилищем
    pub fn new(config: LearningConfig, repository: Arc<dyn FactorRepository>) -> Self {
        Self {
            config,
            repository,
            factors: RwLock::new(HashMap::new()),
        }
    }

    /// Создать сервис с хранилищем в памяти
    pub fn in_memory(config: LearningConfig) -> Self {
        Self::new(config, Arc::new(MemoryFactorRepository::new()))
    }

    /// Получить текущее значение коэффициента языка
    pub fn factor(&self, language: &str) -> f64 {
        self.entry(language).lock().factor
    }

    /// Получить снимок коэффициента языка
    pub fn snapshot(&self, language: &str) -> CorrectionFactor {
        self.entry(language).lock().clone()
    }

    /// Применить наблюдение к коэффициенту языка
    ///
    /// Обновление выполняется под мьютексом языка: чтение, сглаживание,
    /// ограничение диапазона и сохранение составляют одну критическую секцию.
    /// Возвращает новое значение коэффициента.
    pub fn apply_observation(&self, language: &str, error_ratio: f64) -> f64 {
        let entry = self.entry(language);
        let mut factor = entry.lock();

        let updated = factor.factor * (1.0 + (error_ratio - 1.0) * self.config.learning_rate);
        factor.factor = updated.clamp(self.config.factor_min, self.config.factor_max);
        factor.update_count += 1;

        if let Err(e) = self.repository.save(&factor) {
            log::warn!("Failed to persist correction factor for '{}': {}", language, e);
        }

        log::debug!(
            "Correction factor for '{}' updated to {:.4} (error ratio {:.4}, update #{})",
            language, factor.factor, error_ratio, factor.update_count,
        );

        factor.factor
    }

    /// Получить запись языка, загрузив её из хранилища при первом обращении
    ///
    /// Значение вне допустимого диапазона ограничивается, а не отвергается.
    fn entry(&self, language: &str) -> Arc<Mutex<CorrectionFactor>> {
        if let Some(entry) = self.factors.read().get(language) {
            return entry.clone();
        }

        let mut factors = self.factors.write();
        factors
            .entry(language.to_string())
            .or_insert_with(|| {
                let mut factor = match self.repository.load(language) {
                    Ok(Some(factor)) => factor,
                    Ok(None) => CorrectionFactor::initial(language),
                    Err(e) => {
                        log::warn!("Failed to load correction factor for '{}': {}", language, e);
                        CorrectionFactor::initial(language)
                    }
                };
                if factor.factor < self.config.factor_min || factor.factor > self.config.factor_max {
                    log::warn!(
                        "Persisted correction factor {:.4} for '{}' out of bounds, clamping",
                        factor.factor, language,
                    );
                    factor.factor = factor.factor.clamp(self.config.factor_min, self.config.factor_max);
                }
                Arc::new(Mutex::new(factor))
            })
            .clone()
    }
}

/// Дополнительные метки наблюдения
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordTags {
    /// Платформа, для которой готовился контент
    pub platform: Option<String>,
    /// Использованный голос
    pub voice: Option<String>,
}

/// Одно наблюдение (предсказанная, фактическая) длительности
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRecord {
    /// Текст, для которого выполнялось предсказание
    pub text: String,
    /// Код языка
    pub language: String,
    /// Предсказанная длительность (секунды)
    pub predicted_duration: f64,
    /// Фактическая длительность (секунды)
    pub actual_duration: f64,
    /// Точность предсказания в диапазоне [0, 1]
    pub accuracy: f64,
    /// Отношение фактической длительности к предсказанной
    pub error_ratio: f64,
    /// Значение коэффициента после применения наблюдения
    pub resulting_factor: f64,
    /// Дополнительные метки
    pub tags: RecordTags,
    /// Момент наблюдения
    pub recorded_at: DateTime<Utc>,
}

/// Фильтр для агрегационных запросов по истории наблюдений
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    /// Только записи этого языка
    pub language: Option<String>,
    /// Только записи этой платформы
    pub platform: Option<String>,
    /// Только записи не раньше этого момента
    pub since: Option<DateTime<Utc>>,
    /// Только записи не позже этого момента
    pub until: Option<DateTime<Utc>>,
}

impl StatsFilter {
    /// Проверить, подходит ли запись под фильтр
    fn matches(&self, record: &LearningRecord) -> bool {
        if let Some(language) = &self.language {
            if &record.language != language {
                return false;
            }
        }
        if let Some(platform) = &self.platform {
            if record.tags.platform.as_deref() != Some(platform.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.recorded_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.recorded_at > until {
                return false;
            }
        }
        true
    }
}

/// Сервис обучения длительности
///
/// Принимает наблюдения, обновляет коэффициенты через
/// CorrectionFactorStore и хранит историю для статистики.
pub struct DurationLearning {
    /// Сервис поправочных коэффициентов
    store: Arc<CorrectionFactorStore>,
    /// История наблюдений (только дополняется)
    history: RwLock<Vec<LearningRecord>>,
}

impl DurationLearning {
    /// Создать сервис обучения
    pub fn new(store: Arc<CorrectionFactorStore>) -> Self {
        Self {
            store,
            history: RwLock::new(Vec::new()),
        }
    }

    /// Получить сервис коэффициентов
    pub fn store(&self) -> &Arc<CorrectionFactorStore> {
        &self.store
    }

    /// Зафиксировать наблюдение и обновить коэффициент языка
    ///
    /// Точность: 1 - |факт - прогноз| / факт, ограниченная [0, 1].
    /// Нулевая или отрицательная фактическая длительность даёт нулевую
    /// точность и не сдвигает коэффициент.
    pub fn record(
        &self,
        text: &str,
        language: &str,
        predicted_duration: f64,
        actual_duration: f64,
        tags: Option<RecordTags>,
    ) -> LearningRecord {
        let (accuracy, error_ratio) = if actual_duration > 0.0 && predicted_duration > 0.0 {
            let accuracy = (1.0 - (actual_duration - predicted_duration).abs() / actual_duration)
                .clamp(0.0, 1.0);
            (accuracy, actual_duration / predicted_duration)
        } else {
            (0.0, 1.0)
        };

        let resulting_factor = self.store.apply_observation(language, error_ratio);

        let record = LearningRecord {
            text: text.to_string(),
            language: language.to_string(),
            predicted_duration,
            actual_duration,
            accuracy,
            error_ratio,
            resulting_factor,
            tags: tags.unwrap_or_default(),
            recorded_at: Utc::now(),
        };

        log::info!(
            "Duration observation for '{}': predicted {:.2}s, actual {:.2}s, accuracy {:.3}, factor {:.4}",
            language, predicted_duration, actual_duration, accuracy, resulting_factor,
        );

        self.history.write().push(record.clone());
        record
    }

    /// Средняя точность предсказаний по фильтру
    pub fn average_accuracy(&self, filter: &StatsFilter) -> Option<f64> {
        let history = self.history.read();
        let matched: Vec<f64> = history
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.accuracy)
            .collect();

        if matched.is_empty() {
            None
        } else {
            Some(matched.iter().sum::<f64>() / matched.len() as f64)
        }
    }

    /// Средний поправочный коэффициент по фильтру
    pub fn average_factor(&self, filter: &StatsFilter) -> Option<f64> {
        let history = self.history.read();
        let matched: Vec<f64> = history
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.resulting_factor)
            .collect();

        if matched.is_empty() {
            None
        } else {
            Some(matched.iter().sum::<f64>() / matched.len() as f64)
        }
    }

    /// Последние наблюдения языка в хронологическом порядке
    pub fn recent_trend(&self, language: &str, limit: usize) -> Vec<LearningRecord> {
        let history = self.history.read();
        let matched: Vec<&LearningRecord> = history
            .iter()
            .filter(|r| r.language == language)
            .collect();

        matched
            .iter()
            .skip(matched.len().saturating_sub(limit))
            .map(|r| (*r).clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learning() -> DurationLearning {
        DurationLearning::new(Arc::new(CorrectionFactorStore::in_memory(LearningConfig::default())))
    }

    #[test]
    fn test_record_updates_factor() {
        let learning = learning();

        // Сценарий: прогноз 60 секунд, факт 58 секунд
        let record = learning.record("테스트", "ko", 60.0, 58.0, None);

        assert!((record.error_ratio - 58.0 / 60.0).abs() < 1e-9);
        assert!((record.accuracy - (1.0 - 2.0 / 58.0)).abs() < 1e-9);
        assert!((record.resulting_factor - 0.996_666_666).abs() < 1e-6);
        assert_eq!(learning.store().factor("ko"), record.resulting_factor);
    }

    #[test]
    fn test_factor_stays_bounded() {
        let learning = learning();

        // Экстремальные наблюдения не должны выводить коэффициент за границы
        for _ in 0..200 {
            learning.record("x", "ko", 1.0, 100.0, None);
        }
        assert!(learning.store().factor("ko") <= 2.0);

        for _ in 0..400 {
            learning.record("x", "ko", 100.0, 1.0, None);
        }
        assert!(learning.store().factor("ko") >= 0.5);
    }

    #[test]
    fn test_zero_actual_duration() {
        let learning = learning();
        let record = learning.record("x", "ko", 10.0, 0.0, None);

        assert_eq!(record.accuracy, 0.0);
        assert_eq!(record.error_ratio, 1.0);
        assert_eq!(learning.store().factor("ko"), 1.0);
    }

    #[test]
    fn test_languages_independent() {
        let learning = learning();
        learning.record("x", "ko", 60.0, 70.0, None);

        assert!(learning.store().factor("ko") > 1.0);
        assert_eq!(learning.store().factor("en"), 1.0);
    }

    #[test]
    fn test_stats_filters() {
        let learning = learning();
        let tags = RecordTags { platform: Some("youtube".to_string()), voice: None };

        learning.record("a", "ko", 10.0, 10.0, Some(tags.clone()));
        learning.record("b", "ko", 10.0, 5.0, None);
        learning.record("c", "en", 10.0, 10.0, None);

        let ko_only = StatsFilter { language: Some("ko".to_string()), ..Default::default() };
        let accuracy = learning.average_accuracy(&ko_only).unwrap();
        assert!((accuracy - 0.5).abs() < 1e-9);

        let youtube = StatsFilter { platform: Some("youtube".to_string()), ..Default::default() };
        assert_eq!(learning.average_accuracy(&youtube), Some(1.0));

        let none = StatsFilter { language: Some("ja".to_string()), ..Default::default() };
        assert_eq!(learning.average_accuracy(&none), None);
    }

    #[test]
    fn test_recent_trend_order() {
        let learning = learning();
        learning.record("first", "ko", 10.0, 10.0, None);
        learning.record("second", "ko", 10.0, 11.0, None);
        learning.record("third", "ko", 10.0, 12.0, None);
        learning.record("other", "en", 10.0, 10.0, None);

        let trend = learning.recent_trend("ko", 2);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].text, "second");
        assert_eq!(trend[1].text, "third");
    }

    #[test]
    fn test_json_repository_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factors.json");

        {
            let repo = JsonFactorRepository::open(&path);
            let store = CorrectionFactorStore::new(LearningConfig::default(), Arc::new(repo));
            store.apply_observation("ko", 1.2);
        }

        // Коэффициент переживает перезапуск
        let repo = JsonFactorRepository::open(&path);
        let store = CorrectionFactorStore::new(LearningConfig::default(), Arc::new(repo));
        assert!((store.factor("ko") - 1.02).abs() < 1e-9);
        assert_eq!(store.snapshot("ko").update_count, 1);
    }

    #[test]
    fn test_out_of_bounds_persisted_factor_clamped() {
        let repo = MemoryFactorRepository::new();
        repo.save(&CorrectionFactor {
            language: "ko".to_string(),
            factor: 7.5,
            update_count: 3,
        }).unwrap();

        let store = CorrectionFactorStore::new(LearningConfig::default(), Arc::new(repo));
        assert_eq!(store.factor("ko"), 2.0);
    }
}
