/*!
 * Context extraction.
 *
 * Turns a finalized selection into a clean word plus its containing
 * sentence. Input text may still carry inline markup and entity references
 * from the host's flattened ancestor text; everything here is pure and
 * total - every branch has a next fallback, so extraction never fails.
 *
 * Sentence boundaries are a simple punctuation heuristic: split on `.`,
 * `!`, `?` followed by whitespace. Abbreviations are not special-cased
 * ("Dr. Smith" splits after "Dr.") - downstream behavior depends on the
 * simple rule, so keep it simple.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::adapter::AncestorText;

/// Maximum sentence length returned to the dispatch pipeline
const MAX_SENTENCE_CHARS: usize = 500;

/// Marker appended when a sentence is truncated
const ELLIPSIS: char = '\u{2026}';

// @const: Leading open-brackets/quotes to strip from a selection
static LEADING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^[(\["'«]+"#).unwrap());

// @const: Trailing closers and terminal punctuation to strip
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[.,;:!?)\]"'»]+$"#).unwrap());

// @const: Complete-sentence shape: uppercase start, terminal punctuation end
static COMPLETE_SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z](?s:.)*[.!?]$").unwrap());

// @const: Sentence boundary: terminal punctuation followed by whitespace
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

// @const: Inline markup tags in flattened ancestor text
static INLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());

// @const: Numeric entity references
static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(\d+);").unwrap());

/// A word and its containing sentence, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContext {
    /// The selection with surrounding punctuation stripped
    pub word: String,

    /// The sentence containing the selection
    pub sentence: String,
}

/// Strip leading open-brackets/quotes and trailing closers/punctuation
pub fn trim_selection(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_trailing = TRAILING_PUNCT.replace(trimmed, "");
    LEADING_PUNCT.replace(&without_trailing, "").to_string()
}

/// Complete-sentence heuristic: uppercase start, `.`/`!`/`?` end
///
/// Shared with the dispatch scheduler's word-count gate.
pub fn is_complete_sentence(text: &str) -> bool {
    COMPLETE_SENTENCE.is_match(text.trim())
}

/// Whitespace-delimited word count
///
/// Undercounts for non-spaced scripts (CJK); accepted limitation.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Replace inline elements with their own text content and decode entities
///
/// Anchor-like wrappers disappear, their text stays in reading order.
pub fn flatten_inline_markup(text: &str) -> String {
    let without_tags = INLINE_TAG.replace_all(text, "");
    decode_entities(&without_tags)
}

/// Decode the common named entity references plus numeric ones
fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");

    let decoded = NUMERIC_ENTITY.replace_all(&named, |caps: &regex::Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; last so freshly decoded ampersands are not re-expanded
    decoded.replace("&amp;", "&")
}

/// Split text into sentences at terminal punctuation followed by whitespace
///
/// Falls back to a character scan splitting after every terminal mark when
/// the regex yields a single segment despite punctuation being present
/// (covers "end.Next" style boundaries with no space).
pub fn segment_sentences(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut last = 0;

    for m in SENTENCE_BOUNDARY.find_iter(text) {
        // Keep the terminal mark with the left segment (one ASCII byte)
        let end = m.start() + 1;
        let segment = text[last..end].trim();
        if !segment.is_empty() {
            segments.push(segment.to_string());
        }
        last = m.end();
    }

    let tail = text[last..].trim();
    if !tail.is_empty() {
        segments.push(tail.to_string());
    }

    if segments.len() <= 1 && has_interior_terminal(text) {
        return segment_by_scan(text);
    }

    segments
}

/// True when a terminal mark exists before the last non-whitespace char
fn has_interior_terminal(text: &str) -> bool {
    let mut chars = text.trim_end().chars();
    chars.next_back();
    chars.as_str().contains(['.', '!', '?'])
}

/// Manual scan: split after every terminal mark, whitespace or not
fn segment_by_scan(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let segment = current.trim();
            if !segment.is_empty() {
                segments.push(segment.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        segments.push(tail.to_string());
    }

    segments
}

/// First segment containing the needle, if any
fn segment_containing(text: &str, needle: &str) -> Option<String> {
    segment_sentences(text)
        .into_iter()
        .find(|segment| segment.contains(needle))
}

/// Scan outward from the needle's position to the nearest terminal marks
fn position_scan(flattened: &str, needle: &str) -> Option<String> {
    let start_idx = flattened.find(needle)?;
    let after_idx = start_idx + needle.len();

    // Backward: nearest preceding terminal punctuation
    let sentence_start = flattened[..start_idx]
        .char_indices()
        .rev()
        .find(|&(_, ch)| matches!(ch, '.' | '!' | '?'))
        .map(|(i, _)| i + 1)
        .unwrap_or(0);

    // Forward: nearest following terminal punctuation, included
    let sentence_end = flattened[after_idx..]
        .char_indices()
        .find(|&(_, ch)| matches!(ch, '.' | '!' | '?'))
        .map(|(i, _)| after_idx + i + 1)
        .unwrap_or(flattened.len());

    let result = flattened[sentence_start..sentence_end].trim();
    if result.is_empty() {
        None
    } else {
        Some(result.to_string())
    }
}

/// Cap sentence length, truncating on a char boundary with an ellipsis
fn enforce_max_length(sentence: String) -> String {
    if sentence.chars().count() <= MAX_SENTENCE_CHARS {
        return sentence;
    }

    let mut truncated: String = sentence.chars().take(MAX_SENTENCE_CHARS).collect();
    truncated.push(ELLIPSIS);
    truncated
}

/// Extract the clean word and containing sentence for a finalized selection
///
/// Fallback tiers, in order: complete-sentence shortcut, block-ancestor
/// segmentation, parent segmentation, position scan over the parent text,
/// the whole parent text. The last tier always yields something (worst case
/// the selection itself), so this function cannot fail.
pub fn extract_context(selection_text: &str, ancestor: &AncestorText) -> ExtractedContext {
    let raw = selection_text.trim();
    let word = trim_selection(raw);

    // The raw text already reads as a full sentence; skip extraction
    if raw.len() > 10 && is_complete_sentence(raw) {
        return ExtractedContext {
            word,
            sentence: enforce_max_length(raw.to_string()),
        };
    }

    let block_text = ancestor.block.as_deref().map(flatten_inline_markup);
    let parent_text = flatten_inline_markup(&ancestor.parent);

    let sentence = block_text
        .as_deref()
        .and_then(|block| segment_containing(block, &word))
        .or_else(|| segment_containing(&parent_text, &word))
        .or_else(|| position_scan(&parent_text, raw).or_else(|| position_scan(&parent_text, &word)))
        .unwrap_or_else(|| {
            let fallback = parent_text.trim();
            if fallback.is_empty() {
                raw.to_string()
            } else {
                fallback.to_string()
            }
        });

    ExtractedContext {
        word,
        sentence: enforce_max_length(sentence),
    }
}
