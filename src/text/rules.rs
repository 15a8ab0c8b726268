//! Модуль правил нормализации текста
//!
//! Этот модуль содержит типизированные таблицы правил преобразования
//! письменной формы числовых литералов в произносимую форму для каждого
//! поддерживаемого языка. Таблицы строятся один раз при первом обращении.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use crate::text::numbers;

/// Категория правила нормализации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    /// Год (2024년)
    Year,
    /// Дата (1월 15일)
    Date,
    /// Денежная сумма (2,000원, $5)
    Currency,
    /// Время суток (3시 30분, 3:30)
    ClockTime,
    /// Процент (15%)
    Percent,
    /// Телефонный номер (010-1234-5678)
    PhoneNumber,
    /// Количество со счётным словом (3개)
    Count,
    /// Возраст (25살)
    Age,
}

/// Одно правило нормализации: шаблон и функция замены
pub struct NormalizationRule {
    /// Категория правила
    pub category: RuleCategory,
    /// Шаблон для поиска письменной формы
    pub pattern: Regex,
    /// Функция построения произносимой формы
    replace: Box<dyn Fn(&Captures) -> String + Send + Sync>,
}

impl NormalizationRule {
    fn new(
        category: RuleCategory,
        pattern: &str,
        replace: impl Fn(&Captures) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            pattern: Regex::new(pattern).expect("invalid normalization rule pattern"),
            replace: Box::new(replace),
        }
    }

    /// Построить замену для найденного совпадения
    pub fn apply(&self, caps: &Captures) -> String {
        (self.replace)(caps)
    }
}

/// Упорядоченная таблица правил для одного языка
pub struct LanguageRules {
    /// Код языка
    pub language: &'static str,
    /// Правила в порядке приоритета (при равной длине совпадения
    /// побеждает более раннее правило)
    pub rules: Vec<NormalizationRule>,
}

lazy_static! {
    static ref KO_RULES: LanguageRules = korean_rules();
    static ref EN_RULES: LanguageRules = english_rules();
}

/// Получить таблицу правил для языка
///
/// Для неизвестного языка возвращается None: числовые правила
/// пропускаются, применяется только структурная очистка.
pub fn rules_for(language: &str) -> Option<&'static LanguageRules> {
    match language {
        "ko" => Some(&KO_RULES),
        "en" => Some(&EN_RULES),
        _ => None,
    }
}

/// Разобрать число с разделителями разрядов
fn parse_grouped(digits: &str) -> u64 {
    digits.replace(',', "").parse().unwrap_or(0)
}

/// Произнести десятичное число по сино-корейски (3.5 → 삼점오)
fn sino_decimal(value: &str) -> String {
    match value.split_once('.') {
        Some((int, frac)) => {
            let mut result = numbers::sino_korean(parse_grouped(int));
            result.push('점');
            for c in frac.chars().filter_map(|c| c.to_digit(10)) {
                result.push_str(match c {
                    0 => "영",
                    d => ["", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"][d as usize],
                });
            }
            result
        }
        None => numbers::sino_korean(parse_grouped(value)),
    }
}

/// Произнести месяц по-корейски (6월 и 10월 читаются неправильно
/// по общей схеме: 유월 и 시월)
fn korean_month(month: u64) -> String {
    match month {
        6 => "유월".to_string(),
        10 => "시월".to_string(),
        m => format!("{}월", numbers::sino_korean(m)),
    }
}

/// Произнести час по-корейски: до 12 включительно используется
/// исконная система (한시, 두시), дальше — сино-корейская
fn korean_hour(hour: u64) -> String {
    if (1..=12).contains(&hour) {
        format!("{}시", numbers::native_korean(hour))
    } else {
        format!("{}시", numbers::sino_korean(hour))
    }
}

/// Таблица правил для корейского языка
fn korean_rules() -> LanguageRules {
    let rules = vec![
        NormalizationRule::new(
            RuleCategory::PhoneNumber,
            r"0\d{1,2}-\d{3,4}-\d{4}",
            |caps| {
                caps[0]
                    .split('-')
                    .map(numbers::korean_digit_by_digit)
                    .collect::<Vec<String>>()
                    .join(" ")
            },
        ),
        NormalizationRule::new(
            RuleCategory::Year,
            r"(\d{4})년",
            |caps| format!("{}년", numbers::sino_korean(parse_grouped(&caps[1]))),
        ),
        NormalizationRule::new(
            RuleCategory::Date,
            r"(\d{1,2})월",
            |caps| korean_month(parse_grouped(&caps[1])),
        ),
        NormalizationRule::new(
            RuleCategory::Date,
            r"(\d{1,2})일",
            |caps| format!("{}일", numbers::sino_korean(parse_grouped(&caps[1]))),
        ),
        NormalizationRule::new(
            RuleCategory::Currency,
            r"(\d{1,3}(?:,\d{3})+|\d+)원",
            |caps| format!("{}원", numbers::sino_korean(parse_grouped(&caps[1]))),
        ),
        NormalizationRule::new(
            RuleCategory::ClockTime,
            r"(\d{1,2})시(?:\s*(\d{1,2})분)?",
            |caps| {
                let mut result = korean_hour(parse_grouped(&caps[1]));
                if let Some(minutes) = caps.get(2) {
                    result.push_str(&format!(" {}분", numbers::sino_korean(parse_grouped(minutes.as_str()))));
                }
                result
            },
        ),
        NormalizationRule::new(
            RuleCategory::Percent,
            r"(\d+(?:\.\d+)?)\s?(?:%|퍼센트)",
            |caps| format!("{}퍼센트", sino_decimal(&caps[1])),
        ),
        NormalizationRule::new(
            RuleCategory::Age,
            r"(\d{1,3})살",
            |caps| format!("{}살", numbers::native_korean(parse_grouped(&caps[1]))),
        ),
        NormalizationRule::new(
            RuleCategory::Count,
            r"(\d+)\s?(개|명|마리|번|권|잔|병|장|대)",
            |caps| format!("{}{}", numbers::native_korean(parse_grouped(&caps[1])), &caps[2]),
        ),
    ];

    LanguageRules { language: "ko", rules }
}

/// Произнести минуты по-английски внутри времени
fn english_minutes(minutes: u64) -> String {
    match minutes {
        0 => "o'clock".to_string(),
        m if m < 10 => format!("oh {}", numbers::english_cardinal(m)),
        m => numbers::english_cardinal(m),
    }
}

/// Таблица правил для английского языка
fn english_rules() -> LanguageRules {
    let rules = vec![
        NormalizationRule::new(
            RuleCategory::PhoneNumber,
            r"\d{3}-\d{3,4}-\d{4}",
            |caps| {
                caps[0]
                    .split('-')
                    .map(numbers::english_digit_by_digit)
                    .collect::<Vec<String>>()
                    .join(", ")
            },
        ),
        NormalizationRule::new(
            RuleCategory::Currency,
            r"\$(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{2}))?",
            |caps| {
                let dollars = parse_grouped(&caps[1]);
                let unit = if dollars == 1 { "dollar" } else { "dollars" };
                let mut result = format!("{} {}", numbers::english_cardinal(dollars), unit);
                if let Some(cents) = caps.get(2) {
                    let cents = parse_grouped(cents.as_str());
                    if cents > 0 {
                        let cent_unit = if cents == 1 { "cent" } else { "cents" };
                        result.push_str(&format!(" and {} {}", numbers::english_cardinal(cents), cent_unit));
                    }
                }
                result
            },
        ),
        NormalizationRule::new(
            RuleCategory::Percent,
            r"(\d+(?:\.\d+)?)\s?(?:%|percent)",
            |caps| {
                let value = &caps[1];
                let spoken = match value.split_once('.') {
                    Some((int, frac)) => format!(
                        "{} point {}",
                        numbers::english_cardinal(parse_grouped(int)),
                        numbers::english_digit_by_digit(frac)
                    ),
                    None => numbers::english_cardinal(parse_grouped(value)),
                };
                format!("{} percent", spoken)
            },
        ),
        NormalizationRule::new(
            RuleCategory::ClockTime,
            r"\b(\d{1,2}):([0-5]\d)\b",
            |caps| {
                format!(
                    "{} {}",
                    numbers::english_cardinal(parse_grouped(&caps[1])),
                    english_minutes(parse_grouped(&caps[2]))
                )
            },
        ),
        NormalizationRule::new(
            RuleCategory::Year,
            r"\b(1[5-9]\d{2}|20\d{2})\b",
            |caps| numbers::english_year(parse_grouped(&caps[1])),
        ),
        NormalizationRule::new(
            RuleCategory::Count,
            r"\b\d{1,3}(?:,\d{3})+\b|\b\d+\b",
            |caps| numbers::english_cardinal(parse_grouped(&caps[0])),
        ),
    ];

    LanguageRules { language: "en", rules }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_for_known_languages() {
        assert!(rules_for("ko").is_some());
        assert!(rules_for("en").is_some());
        assert!(rules_for("xx").is_none());
    }

    #[test]
    fn test_korean_month_irregulars() {
        assert_eq!(korean_month(1), "일월");
        assert_eq!(korean_month(6), "유월");
        assert_eq!(korean_month(10), "시월");
        assert_eq!(korean_month(12), "십이월");
    }

    #[test]
    fn test_korean_hour() {
        assert_eq!(korean_hour(1), "한시");
        assert_eq!(korean_hour(12), "열두시");
        assert_eq!(korean_hour(14), "십사시");
    }

    #[test]
    fn test_sino_decimal() {
        assert_eq!(sino_decimal("3.5"), "삼점오");
        assert_eq!(sino_decimal("15"), "십오");
        assert_eq!(sino_decimal("0.05"), "영점영오");
    }
}
