//! Language tag to flag emoji mapping for stream descriptions

pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Languages whose flag is not simply the upper-cased language code
const LANGUAGE_COUNTRIES: &[(&str, &str)] = &[
    ("ar", "SA"),
    ("ca", "ES"),
    ("cs", "CZ"),
    ("da", "DK"),
    ("el", "GR"),
    ("en", "GB"),
    ("et", "EE"),
    ("fa", "IR"),
    ("he", "IL"),
    ("hi", "IN"),
    ("ja", "JP"),
    ("ko", "KR"),
    ("ms", "MY"),
    ("nb", "NO"),
    ("nn", "NO"),
    ("sl", "SI"),
    ("sr", "RS"),
    ("sv", "SE"),
    ("uk", "UA"),
    ("vi", "VN"),
    ("zh", "CN"),
];

/// Flag for an origin `languageTag` ("en", "pt-BR"); the region is ignored so
/// every English track maps to the same flag.
pub fn flag_emoji(language_tag: Option<&str>) -> String {
    let Some(tag) = language_tag else {
        return UNKNOWN_LANGUAGE.to_string();
    };
    let language = tag
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if language.len() != 2 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return UNKNOWN_LANGUAGE.to_string();
    }

    let country = LANGUAGE_COUNTRIES
        .iter()
        .find(|(lang, _)| *lang == language)
        .map(|(_, country)| (*country).to_string())
        .unwrap_or_else(|| language.to_ascii_uppercase());

    country
        .chars()
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}

pub fn english_flag() -> String {
    flag_emoji(Some("en"))
}
