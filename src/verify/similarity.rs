//! Модуль вычисления сходства текстов
//!
//! Этот модуль содержит метрику сходства нормализованного текста и
//! транскрипта, основанную на длине наибольшей общей подпоследовательности.

/// Привести текст к виду для сравнения
///
/// Сравнение не должно штрафовать за регистр и косметические различия
/// в пробелах, поэтому текст приводится к нижнему регистру, а пробелы
/// схлопываются.
pub fn normalize_for_comparison(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Вычислить сходство двух текстов в диапазоне [0, 1]
///
/// Метрика: 2 * LCS(a, b) / (|a| + |b|) по символам приведённых строк.
/// Два пустых текста считаются полностью совпадающими.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_for_comparison(a);
    let b = normalize_for_comparison(b);
    lcs_ratio(&a, &b)
}

/// Отношение длины наибольшей общей подпоследовательности к средней длине строк
pub fn lcs_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Две строки таблицы достаточно: храним только предыдущую
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let mut prev = vec![0_usize; short.len() + 1];
    let mut current = vec![0_usize; short.len() + 1];

    for long_char in long.iter() {
        for (j, short_char) in short.iter().enumerate() {
            current[j + 1] = if long_char == short_char {
                prev[j] + 1
            } else {
                prev[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut prev, &mut current);
    }

    let lcs = prev[short.len()];
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts() {
        assert_eq!(similarity("안녕하세요", "안녕하세요"), 1.0);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(similarity("Hello   World", "hello world"), 1.0);
        assert_eq!(similarity("HELLO\nWORLD", "hello world"), 1.0);
    }

    #[test]
    fn test_disjoint_texts() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_empty_texts() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // LCS("abcd", "abxd") = "abd", ratio = 2*3/8
        assert!((lcs_ratio("abcd", "abxd") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_bounds() {
        let score = similarity("안녕하세요 여러분", "안녕하십니까 여러분들");
        assert!(score > 0.0 && score < 1.0);
    }
}
