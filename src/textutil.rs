use once_cell::sync::Lazy;
use regex::Regex;

// Matches the wide CJK stretch (Hangul jamo through Hangul syllables, which
// also spans the unified ideographs and kana). Such text tokenizes at
// roughly one token per character or worse.
static CJK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{3131}-\u{D79D}]").expect("cjk"));

/// Approximate LLM token cost of `text`. Heuristic only: its job is to keep
/// chunk sizes roughly bounded, not to match any real tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    if CJK_RE.is_match(text) {
        return text.chars().count() * 2;
    }
    let words = text.split_whitespace().count();
    (words as f64 * 1.3).round() as usize
}

/// Render a target-language identifier for a prompt. ISO-639-1 codes become
/// English language names (models follow "Korean" better than "ko"); free
/// text is passed through.
pub fn lang_label(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.len() == 2 {
        if let Some(lang) = isolang::Language::from_639_1(&trimmed.to_ascii_lowercase()) {
            return lang.to_name().to_string();
        }
    }
    trimmed.to_string()
}
