//! Модуль нормализации текста для синтеза речи

pub mod normalizer;
pub mod numbers;
pub mod rules;

pub use normalizer::{normalize, strip_markup, NormalizationMapping, NormalizationOutcome};
pub use rules::RuleCategory;
