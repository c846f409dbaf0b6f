/// Uppercase the first character of every space-separated word and lowercase
/// the rest. Spacing is preserved.
///
/// Applying it twice gives the same result as applying it once. A first
/// character whose uppercase form spans several characters (`ß`) is kept as is
/// for that reason.
pub fn capitalize_words(input: &str) -> String {
    input
        .split(' ')
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut upper = first.to_uppercase();
    let mut out = match (upper.next(), upper.next()) {
        (Some(single), None) => single.to_string(),
        _ => first.to_string(),
    };
    out.push_str(&chars.as_str().to_lowercase());
    out
}

/// Lowercased form stored alongside a searchable column.
///
/// SQLite only folds ASCII in `LOWER()` and `LIKE`, so substring filters
/// compare against this instead of the display value.
pub fn search_key(input: &str) -> String {
    input.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_word() {
        assert_eq!(capitalize_words("michael"), "Michael");
    }

    #[test]
    fn accented_mixed_case() {
        assert_eq!(capitalize_words("maría eleNa"), "María Elena");
    }

    #[test]
    fn keeps_spacing() {
        assert_eq!(capitalize_words("  ana  lucía "), "  Ana  Lucía ");
    }

    #[test]
    fn empty_string() {
        assert_eq!(capitalize_words(""), "");
    }

    #[test]
    fn search_key_folds_non_ascii() {
        assert_eq!(search_key("Émile Zola"), "émile zola");
        assert_eq!(search_key("ÉMILE"), search_key("émile"));
    }

    proptest! {
        #[test]
        fn idempotent(s in "\\PC*") {
            let once = capitalize_words(&s);
            prop_assert_eq!(capitalize_words(&once), once.clone());
        }
    }
}
