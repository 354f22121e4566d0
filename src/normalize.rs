//! File name normalization.
//!
//! Cyrillic letters in the base name are transliterated to ASCII and every
//! remaining character that is not an ASCII letter, digit or underscore is
//! replaced by `_`. Everything after the first dot is kept as-is.

use std::collections::HashMap;
use std::sync::LazyLock;

const ALPHABET: &str = "абвгдеєжзиіїйклмнопрстуфхцчшщьюя";

const LATIN: [&str; 32] = [
    "a", "b", "v", "g", "d", "e", "je", "zh", "z", "y", "i", "ji", "j", "k", "l", "m", "n", "o",
    "p", "r", "s", "t", "u", "f", "h", "ts", "ch", "sh", "sch", "", "ju", "ja",
];

/// Lowercase and uppercase letter to replacement.
static TRANSLITERATION: LazyLock<HashMap<char, String>> = LazyLock::new(|| {
    let mut table = HashMap::with_capacity(ALPHABET.chars().count() * 2);
    for (letter, latin) in ALPHABET.chars().zip(LATIN) {
        table.insert(letter, latin.to_string());
        for upper in letter.to_uppercase() {
            table.insert(upper, latin.to_uppercase());
        }
    }
    table
});

/// Transliterates a single character, if the table has an entry for it.
pub fn transliterate_char(c: char) -> Option<&'static str> {
    TRANSLITERATION.get(&c).map(String::as_str)
}

/// Transliterates `text` and escapes every non-word character to `_`.
fn escape_base(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match transliterate_char(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Normalizes a file name.
///
/// The name is split at its first dot; the part before it is transliterated
/// and escaped, the part after it is preserved verbatim. A name with no dot
/// at all comes back without one.
///
/// # Examples
///
/// ```
/// use cleanfolder::normalize::normalize;
///
/// assert_eq!(normalize("Привіт.txt"), "Pryvit.txt");
/// assert_eq!(normalize("my photo (1).jpg"), "my_photo__1_.jpg");
/// assert_eq!(normalize("archive.tar.gz"), "archive.tar.gz");
/// assert_eq!(normalize("README"), "README");
/// ```
pub fn normalize(file_name: &str) -> String {
    match file_name.split_once('.') {
        Some((base, suffix)) => format!("{}.{}", escape_base(base), suffix),
        None => escape_base(file_name),
    }
}
