//! Модуль предсказания и калибровки длительности речи

pub mod estimator;
pub mod learning;

pub use estimator::{DurationEstimate, DurationEstimator};
pub use learning::{
    CorrectionFactor, CorrectionFactorStore, DurationLearning, FactorRepository,
    JsonFactorRepository, LearningRecord, MemoryFactorRepository, RecordTags, StatsFilter,
};
