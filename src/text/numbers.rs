//! Модуль преобразования чисел в словесную форму
//!
//! Этот модуль содержит функции для преобразования числовых литералов
//! в произносимую форму для поддерживаемых языков.

/// Цифры в сино-корейской системе
const SINO_DIGITS: [&str; 10] = ["", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];

/// Цифры для почерёдного произнесения (телефонные номера)
const SINO_PHONE_DIGITS: [&str; 10] = ["공", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];

/// Разряды внутри группы из четырёх цифр
const SINO_SMALL_UNITS: [&str; 4] = ["", "십", "백", "천"];

/// Разряды групп по четыре цифры
const SINO_LARGE_UNITS: [&str; 4] = ["", "만", "억", "조"];

/// Исконно корейские числительные (определительная форма перед счётным словом)
const NATIVE_UNITS: [&str; 10] = ["", "한", "두", "세", "네", "다섯", "여섯", "일곱", "여덟", "아홉"];

/// Исконно корейские десятки (определительная форма)
const NATIVE_TENS: [&str; 10] = ["", "열", "스물", "서른", "마흔", "쉰", "예순", "일흔", "여든", "아흔"];

/// Преобразовать неотрицательное число в сино-корейскую словесную форму
///
/// Используется для годов, дат, денежных сумм, процентов и минут.
/// Ноль произносится как 영.
pub fn sino_korean(value: u64) -> String {
    if value == 0 {
        return "영".to_string();
    }

    // Разбиваем число на группы по четыре цифры (만/억/조)
    let mut groups = Vec::new();
    let mut rest = value;
    while rest > 0 {
        groups.push(rest % 10_000);
        rest /= 10_000;
    }

    let mut result = String::new();
    for (group_idx, group) in groups.iter().enumerate().rev() {
        if *group == 0 {
            continue;
        }
        result.push_str(&sino_korean_group(*group));
        result.push_str(SINO_LARGE_UNITS[group_idx]);
    }

    result
}

/// Преобразовать группу из четырёх цифр в сино-корейскую форму
///
/// Единица перед разрядом опускается: 15 → 십오, а не 일십오.
fn sino_korean_group(group: u64) -> String {
    let mut result = String::new();

    for (unit_idx, unit) in SINO_SMALL_UNITS.iter().enumerate().rev() {
        let digit = (group / 10_u64.pow(unit_idx as u32)) % 10;
        if digit == 0 {
            continue;
        }
        if digit != 1 || unit_idx == 0 {
            result.push_str(SINO_DIGITS[digit as usize]);
        }
        result.push_str(unit);
    }

    result
}

/// Преобразовать число в исконно корейскую определительную форму
///
/// Используется перед счётными словами (개, 명, 살 и т.д.).
/// Исконная система ограничена 99; большие значения произносятся
/// по сино-корейски.
pub fn native_korean(value: u64) -> String {
    if value == 0 {
        return "영".to_string();
    }
    if value > 99 {
        return sino_korean(value);
    }
    // Ровно 20 перед счётным словом сокращается до 스무 (스무 개),
    // но с единицами остаётся полная форма 스물 (스물한 개)
    if value == 20 {
        return "스무".to_string();
    }

    let tens = (value / 10) as usize;
    let units = (value % 10) as usize;
    format!("{}{}", NATIVE_TENS[tens], NATIVE_UNITS[units])
}

/// Произнести последовательность цифр почерёдно (телефонные номера)
pub fn korean_digit_by_digit(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| SINO_PHONE_DIGITS[d as usize])
        .collect()
}

const EN_ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen",
    "seventeen", "eighteen", "nineteen",
];

const EN_TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Преобразовать неотрицательное число в английскую словесную форму
pub fn english_cardinal(value: u64) -> String {
    if value < 20 {
        return EN_ONES[value as usize].to_string();
    }
    if value < 100 {
        let tens = EN_TENS[(value / 10) as usize];
        let rest = value % 10;
        return if rest == 0 {
            tens.to_string()
        } else {
            format!("{}-{}", tens, EN_ONES[rest as usize])
        };
    }
    if value < 1_000 {
        let hundreds = english_cardinal(value / 100);
        let rest = value % 100;
        return if rest == 0 {
            format!("{} hundred", hundreds)
        } else {
            format!("{} hundred {}", hundreds, english_cardinal(rest))
        };
    }

    for (scale, name) in [
        (1_000_000_000_000_u64, "trillion"),
        (1_000_000_000, "billion"),
        (1_000_000, "million"),
        (1_000, "thousand"),
    ] {
        if value >= scale {
            let head = english_cardinal(value / scale);
            let rest = value % scale;
            return if rest == 0 {
                format!("{} {}", head, name)
            } else {
                format!("{} {} {}", head, name, english_cardinal(rest))
            };
        }
    }

    unreachable!("value ranges are exhaustive")
}

/// Произнести год по-английски
///
/// Годы вида 1999 читаются парами (nineteen ninety-nine),
/// 2000-2009 — как обычные числа, 2010+ — снова парами.
pub fn english_year(year: u64) -> String {
    if (1100..=1999).contains(&year) || (2010..=2099).contains(&year) {
        let head = year / 100;
        let tail = year % 100;
        if tail == 0 {
            format!("{} hundred", english_cardinal(head))
        } else if tail < 10 {
            format!("{} oh {}", english_cardinal(head), english_cardinal(tail))
        } else {
            format!("{} {}", english_cardinal(head), english_cardinal(tail))
        }
    } else {
        english_cardinal(year)
    }
}

/// Произнести последовательность цифр почерёдно по-английски
pub fn english_digit_by_digit(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| if d == 0 { "oh" } else { EN_ONES[d as usize] })
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sino_korean_basic() {
        assert_eq!(sino_korean(0), "영");
        assert_eq!(sino_korean(1), "일");
        assert_eq!(sino_korean(15), "십오");
        assert_eq!(sino_korean(20), "이십");
        assert_eq!(sino_korean(111), "백십일");
        assert_eq!(sino_korean(2000), "이천");
        assert_eq!(sino_korean(2024), "이천이십사");
        assert_eq!(sino_korean(10_000), "만");
        assert_eq!(sino_korean(35_000), "삼만오천");
        assert_eq!(sino_korean(100_000_000), "억");
    }

    #[test]
    fn test_native_korean() {
        assert_eq!(native_korean(1), "한");
        assert_eq!(native_korean(2), "두");
        assert_eq!(native_korean(3), "세");
        assert_eq!(native_korean(4), "네");
        assert_eq!(native_korean(5), "다섯");
        assert_eq!(native_korean(10), "열");
        assert_eq!(native_korean(20), "스무");
        assert_eq!(native_korean(21), "스물한");
        assert_eq!(native_korean(35), "서른다섯");
        // Значения за пределами исконной системы читаются по сино-корейски
        assert_eq!(native_korean(120), "백이십");
    }

    #[test]
    fn test_korean_digit_by_digit() {
        assert_eq!(korean_digit_by_digit("010"), "공일공");
        assert_eq!(korean_digit_by_digit("1234"), "일이삼사");
    }

    #[test]
    fn test_english_cardinal() {
        assert_eq!(english_cardinal(0), "zero");
        assert_eq!(english_cardinal(14), "fourteen");
        assert_eq!(english_cardinal(42), "forty-two");
        assert_eq!(english_cardinal(100), "one hundred");
        assert_eq!(english_cardinal(1_500), "one thousand five hundred");
        assert_eq!(english_cardinal(2_000_000), "two million");
    }

    #[test]
    fn test_english_year() {
        assert_eq!(english_year(1999), "nineteen ninety-nine");
        assert_eq!(english_year(2024), "twenty twenty-four");
        assert_eq!(english_year(2005), "two thousand five");
        assert_eq!(english_year(1900), "nineteen hundred");
        assert_eq!(english_year(2007), "two thousand seven");
    }

    #[test]
    fn test_english_digit_by_digit() {
        assert_eq!(english_digit_by_digit("103"), "one oh three");
    }
}
