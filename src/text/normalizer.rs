//! Модуль нормализации текста
//!
//! Этот модуль преобразует письменную форму текста в произносимую:
//! применяет числовые правила выбранного языка и удаляет структурную
//! разметку, которая не должна попадать в синтезатор речи.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::text::rules::{self, RuleCategory};

/// Одна выполненная замена письменной формы на произносимую
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationMapping {
    /// Исходный фрагмент текста
    pub original: String,
    /// Произносимая форма
    pub replacement: String,
    /// Категория применённого правила
    pub category: RuleCategory,
}

/// Результат нормализации текста
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationOutcome {
    /// Нормализованный текст
    pub normalized_text: String,
    /// Список выполненных замен для аудита
    pub mappings: Vec<NormalizationMapping>,
}

lazy_static! {
    /// HTML-теги
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    /// Встроенные аннотации метаданных ([слайд 1], [음악] и т.п.)
    static ref INLINE_ANNOTATION: Regex = Regex::new(r"\[[^\]]*\]").unwrap();
}

/// Кандидат на замену в числовом проходе
struct Candidate {
    start: usize,
    end: usize,
    rule_idx: usize,
    replacement: String,
    category: RuleCategory,
}

/// Нормализовать текст для синтеза речи
///
/// Сначала выполняется структурная очистка, затем числовые правила
/// языка применяются слева направо по непересекающимся фрагментам.
/// При пересечении кандидатов побеждает более длинное совпадение,
/// при равной длине — более раннее правило таблицы.
///
/// Текст без совпадений возвращается без изменений с пустым списком замен.
pub fn normalize(text: &str, language: &str) -> NormalizationOutcome {
    let cleaned = strip_markup(text);

    let table = match rules::rules_for(language) {
        Some(table) => table,
        None => {
            log::debug!("No normalization rules for language '{}', structural pass only", language);
            return NormalizationOutcome {
                normalized_text: cleaned,
                mappings: Vec::new(),
            };
        }
    };

    // Собираем кандидатов от всех правил таблицы
    let mut candidates = Vec::new();
    for (rule_idx, rule) in table.rules.iter().enumerate() {
        for caps in rule.pattern.captures_iter(&cleaned) {
            let m = caps.get(0).unwrap();
            candidates.push(Candidate {
                start: m.start(),
                end: m.end(),
                rule_idx,
                replacement: rule.apply(&caps),
                category: rule.category,
            });
        }
    }

    // Более длинное совпадение важнее, при равенстве — порядок правил
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.end.cmp(&a.end))
            .then(a.rule_idx.cmp(&b.rule_idx))
    });

    // Жадный выбор непересекающихся фрагментов слева направо
    let mut selected: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        match selected.last() {
            Some(last) if candidate.start < last.end => continue,
            _ => selected.push(candidate),
        }
    }

    // Собираем итоговый текст и список замен
    let mut normalized = String::with_capacity(cleaned.len());
    let mut mappings = Vec::with_capacity(selected.len());
    let mut cursor = 0;

    for candidate in selected {
        normalized.push_str(&cleaned[cursor..candidate.start]);
        normalized.push_str(&candidate.replacement);
        mappings.push(NormalizationMapping {
            original: cleaned[candidate.start..candidate.end].to_string(),
            replacement: candidate.replacement,
            category: candidate.category,
        });
        cursor = candidate.end;
    }
    normalized.push_str(&cleaned[cursor..]);

    NormalizationOutcome {
        normalized_text: normalized,
        mappings,
    }
}

/// Удалить структурную разметку, которая не должна произноситься
///
/// Удаляются строки-заголовки, строки-директивы, встроенные аннотации
/// и HTML-теги; пробелы внутри строк схлопываются, переносы строк
/// между содержательными строками сохраняются.
pub fn strip_markup(text: &str) -> String {
    let mut lines = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        // Заголовки разделов и строки-директивы не произносятся
        if trimmed.starts_with('#') || trimmed.starts_with("---") || trimmed.starts_with('@') {
            continue;
        }

        let without_tags = HTML_TAG.replace_all(trimmed, "");
        let without_annotations = INLINE_ANNOTATION.replace_all(&without_tags, " ");

        // Заменяем HTML-сущности
        let decoded = without_annotations
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&apos;", "'");

        // Схлопываем пробелы внутри строки
        let collapsed = decoded.split_whitespace().collect::<Vec<&str>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_korean_scenario() {
        let outcome = normalize("2024년 1월 15일, 사과 3개를 2,000원에 샀습니다.", "ko");

        assert_eq!(
            outcome.normalized_text,
            "이천이십사년 일월 십오일, 사과 세개를 이천원에 샀습니다."
        );

        let pairs: Vec<(&str, &str)> = outcome
            .mappings
            .iter()
            .map(|m| (m.original.as_str(), m.replacement.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("2024년", "이천이십사년"),
                ("1월", "일월"),
                ("15일", "십오일"),
                ("3개", "세개"),
                ("2,000원", "이천원"),
            ]
        );
    }

    #[test]
    fn test_korean_categories() {
        let outcome = normalize("010-1234-5678로 전화하세요. 수수료는 3.5%입니다.", "ko");

        assert_eq!(outcome.mappings.len(), 2);
        assert_eq!(outcome.mappings[0].category, RuleCategory::PhoneNumber);
        assert_eq!(outcome.mappings[0].replacement, "공일공 일이삼사 오육칠팔");
        assert_eq!(outcome.mappings[1].category, RuleCategory::Percent);
        assert_eq!(outcome.mappings[1].replacement, "삼점오퍼센트");
    }

    #[test]
    fn test_english_rules() {
        let outcome = normalize("The price was $1,500.50, up 25% since 1999.", "en");

        let replacements: Vec<&str> = outcome
            .mappings
            .iter()
            .map(|m| m.replacement.as_str())
            .collect();
        assert_eq!(
            replacements,
            vec![
                "one thousand five hundred dollars and fifty cents",
                "twenty-five percent",
                "nineteen ninety-nine",
            ]
        );
    }

    #[test]
    fn test_longest_match_wins() {
        // Телефонный номер не должен распадаться на отдельные числа
        let outcome = normalize("Call 555-123-4567 now", "en");
        assert_eq!(outcome.mappings.len(), 1);
        assert_eq!(outcome.mappings[0].category, RuleCategory::PhoneNumber);
    }

    #[test]
    fn test_structural_markup_removed() {
        let text = "# 제목\n[슬라이드 1]\n안녕하세요   여러분\n---\n@speed 1.2";
        let outcome = normalize(text, "ko");
        assert_eq!(outcome.normalized_text, "안녕하세요 여러분");
        assert!(outcome.mappings.is_empty());
    }

    #[test]
    fn test_no_match_returns_unchanged() {
        let outcome = normalize("안녕하세요", "ko");
        assert_eq!(outcome.normalized_text, "안녕하세요");
        assert!(outcome.mappings.is_empty());
    }

    #[test]
    fn test_unknown_language_structural_only() {
        let outcome = normalize("# header\n2024년", "xx");
        assert_eq!(outcome.normalized_text, "2024년");
        assert!(outcome.mappings.is_empty());
    }

    #[test]
    fn test_idempotence() {
        let first = normalize("2024년 3시 30분, 15% 할인", "ko");
        let second = normalize(&first.normalized_text, "ko");

        assert!(second.mappings.is_empty());
        assert_eq!(second.normalized_text, first.normalized_text);
    }
}
