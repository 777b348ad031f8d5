use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Merged lines with more words than this are passed through
/// [`split_sentences`]; shorter lines (headers, bullets) stay atomic.
pub const SEGMENT_MIN_WORDS: usize = 10;

/// Tuning knobs for turning raw lines into sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Word count above which a merged line is segmented.
    pub segment_min_words: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            segment_min_words: SEGMENT_MIN_WORDS,
        }
    }
}

/// Abbreviations whose trailing period never ends a sentence.
static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "cf", "fig", "figs", "eq",
        "eqs", "sec", "ch", "no", "vol", "pp", "al", "approx", "dept", "inc", "ltd", "jan",
        "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
    ]
    .into_iter()
    .collect()
});

/// Whether a stripped line ends in `.`, `!` or `?`, optionally followed by a
/// closing quote.
pub fn ends_sentence(line: &str) -> bool {
    static LINE_END: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"[.!?]["'\u{201D}\u{2019}]?$"#).unwrap());
    LINE_END.is_match(line)
}

/// Repair line-wrapped paragraphs.
///
/// Consecutive non-blank lines are joined with a single space until a line
/// ends a sentence, at which point the buffer is flushed as one merged line.
/// Whatever is left in the buffer at the end is flushed as well.
pub fn merge_broken_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut merged = Vec::new();
    let mut buffer = String::new();

    for line in lines {
        let stripped = line.as_ref().trim();
        if stripped.is_empty() {
            continue;
        }
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(stripped);
        if ends_sentence(stripped) {
            merged.push(std::mem::take(&mut buffer));
        }
    }

    if !buffer.is_empty() {
        merged.push(buffer);
    }
    merged
}

/// Split running text into sentences.
///
/// A boundary is terminal punctuation (plus any closing quotes/brackets)
/// followed by whitespace, except when the period belongs to a known
/// abbreviation, a dotted abbreviation like `e.g.`, or a single-letter
/// initial, or when the next word starts lowercase.
pub fn split_sentences(text: &str) -> Vec<String> {
    static BOUNDARY: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"[.!?]+["'\u{201D}\u{2019})\]]*\s+"#).unwrap());

    let mut sentences = Vec::new();
    let mut current_start = 0;

    for m in BOUNDARY.find_iter(text) {
        let pos = m.start();
        if pos == 0 {
            continue;
        }

        if text[pos..].starts_with('.') && is_abbreviation_before(&text[..pos]) {
            continue;
        }

        // "approx. three", "i.e. the" and similar never start a new sentence.
        if text[m.end()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_lowercase())
        {
            continue;
        }

        let sentence = text[current_start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        current_start = m.end();
    }

    let remaining = text[current_start..].trim();
    if !remaining.is_empty() {
        sentences.push(remaining.to_string());
    }

    sentences
}

/// Inspect the token immediately before a period.
fn is_abbreviation_before(prefix: &str) -> bool {
    let mut token: Vec<char> = prefix
        .chars()
        .rev()
        .take_while(|c| c.is_alphabetic() || *c == '.')
        .collect();
    token.reverse();
    let token: String = token.into_iter().collect();
    if token.is_empty() {
        return false;
    }

    // Dotted forms: "e.g", "i.e", "U.S"
    if token.trim_matches('.').contains('.') {
        return true;
    }

    // Single-letter initial: "J. Smith"
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next())
        && c.is_uppercase()
    {
        return true;
    }

    ABBREVIATIONS.contains(token.to_lowercase().as_str())
}

/// Segment merged lines: long lines are split into sentences, short ones
/// are kept whole.
pub fn segment_lines(merged: Vec<String>, options: &NormalizeOptions) -> Vec<String> {
    let mut sentences = Vec::with_capacity(merged.len());
    for line in merged {
        if line.split_whitespace().count() > options.segment_min_words {
            sentences.extend(split_sentences(&line));
        } else {
            sentences.push(line);
        }
    }
    sentences
}

/// Raw lines to sentence sequence: [`merge_broken_lines`] then [`segment_lines`].
pub fn sentences_from_lines<S: AsRef<str>>(lines: &[S], options: &NormalizeOptions) -> Vec<String> {
    segment_lines(merge_broken_lines(lines), options)
}
