use crate::error::{CaptionError, CaptionResult};
use crate::transcriber::Word;

const STOP_CHARS: [char; 6] = ['.', '!', '?', ',', '"', '\''];

/// A contiguous, non-empty run of transcript words shown as one caption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionGroup<'a> {
    words: &'a [Word],
}

impl<'a> CaptionGroup<'a> {
    pub fn words(&self) -> &'a [Word] {
        self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.words[0].start
    }

    pub fn end(&self) -> f64 {
        self.words[self.words.len() - 1].end
    }

    /// Trimmed word texts, as drawn on screen.
    pub fn texts(&self) -> Vec<&'a str> {
        self.words.iter().map(|word| word.text.trim()).collect()
    }
}

/// Only the last character of the trimmed token counts; `...` breaks, `;` does not.
pub fn ends_caption(text: &str) -> bool {
    text.trim().ends_with(STOP_CHARS)
}

/// Splits `words` into caption groups of at most `max_size`, closing a group early
/// after any word that ends in terminal punctuation or a quote.
pub fn group_words(words: &[Word], max_size: usize) -> CaptionResult<Vec<CaptionGroup<'_>>> {
    if max_size == 0 {
        return Err(CaptionError::InvalidGroupSize(max_size));
    }

    let mut groups = Vec::new();
    let mut start = 0;
    for (i, word) in words.iter().enumerate() {
        if i + 1 - start == max_size || ends_caption(&word.text) {
            groups.push(CaptionGroup {
                words: &words[start..=i],
            });
            start = i + 1;
        }
    }
    if start < words.len() {
        groups.push(CaptionGroup {
            words: &words[start..],
        });
    }

    Ok(groups)
}
