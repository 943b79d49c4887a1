//! Portuguese-aware string ordering.
//!
//! Comparison runs in three passes: base letters (accent and case folded),
//! then accents, then case with lowercase first. Within the base pass,
//! whitespace sorts before punctuation, punctuation before digits and digits
//! before letters.

use std::cmp::Ordering;

/// Compare two strings the way a pt-BR collator orders them.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use sigma_core::collation::compare_pt;
///
/// assert_eq!(compare_pt("ação", "acordo"), Ordering::Less);
/// assert_eq!(compare_pt("Zebra", "abacaxi"), Ordering::Greater);
/// ```
pub fn compare_pt(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .map(primary_key)
        .cmp(b.chars().map(primary_key));
    if primary != Ordering::Equal {
        return primary;
    }

    let accents = a.chars().map(is_accented).cmp(b.chars().map(is_accented));
    if accents != Ordering::Equal {
        return accents;
    }

    let case = a.chars().map(char::is_uppercase).cmp(b.chars().map(char::is_uppercase));
    if case != Ordering::Equal {
        return case;
    }

    a.cmp(b)
}

/// Sort a vector of strings in place using [`compare_pt`].
pub fn sort_pt(values: &mut [String]) {
    values.sort_by(|a, b| compare_pt(a, b));
}

/// Strip diacritics from a single lowercase-folded character.
pub fn fold_char(c: char) -> char {
    let lower = c.to_lowercase().next().unwrap_or(c);
    match lower {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Lowercase and strip diacritics from a whole string.
pub fn fold(s: &str) -> String {
    s.chars().map(fold_char).collect()
}

fn primary_key(c: char) -> (u8, char) {
    let folded = fold_char(c);
    let class = if folded.is_whitespace() {
        0
    } else if folded.is_ascii_digit() {
        2
    } else if folded.is_alphabetic() {
        3
    } else {
        1
    };
    (class, folded)
}

fn is_accented(c: char) -> bool {
    let lower = c.to_lowercase().next().unwrap_or(c);
    fold_char(lower) != lower
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accents_do_not_affect_primary_order() {
        assert_eq!(compare_pt("código", "codigo"), Ordering::Greater);
        assert_eq!(compare_pt("código", "codigos"), Ordering::Less);
        assert_eq!(compare_pt("Égua", "escola"), Ordering::Less);
    }

    #[test]
    fn test_case_is_only_a_tiebreaker() {
        assert_eq!(compare_pt("abc", "ABD"), Ordering::Less);
        assert_eq!(compare_pt("abc", "ABC"), Ordering::Less);
        assert_eq!(compare_pt("ABC", "abc"), Ordering::Greater);
    }

    #[test]
    fn test_digits_before_letters() {
        assert_eq!(compare_pt("10", "a"), Ordering::Less);
        assert_eq!(compare_pt("-x", "1"), Ordering::Less);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(compare_pt("Hora", "Horas"), Ordering::Less);
        assert_eq!(compare_pt("", "a"), Ordering::Less);
    }

    #[test]
    fn test_sort_pt_orders_metric_names() {
        let mut v = vec![
            "Valor".to_string(),
            "Dt Pgto".to_string(),
            "hora".to_string(),
            "Árvore".to_string(),
        ];
        sort_pt(&mut v);
        assert_eq!(v, vec!["Árvore", "Dt Pgto", "hora", "Valor"]);
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("DESCRIÇÃO"), "descricao");
        assert_eq!(fold("Código"), "codigo");
    }
}
