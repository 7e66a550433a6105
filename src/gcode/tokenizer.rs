//! Line tokenizer.
//!
//! Splits one line of G-code into `(letter, value)` words. Whitespace,
//! `(...)` comments and `N` line numbers are skipped; a `;` comment, `%`
//! program marker or `*` checksum ends the line.
//!
//! Values are plain signed decimals without exponent, so `X10E5` reads as
//! `X10` followed by `E5`. A bare letter reads as zero, as in `G28 X Y`.

use winnow::ascii::space0;
use winnow::combinator::preceded;
use winnow::token::{one_of, take_while};
use winnow::Parser;

use crate::sink::MessageSink;

/// One `(letter, value)` pair. The letter is upper case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Word {
    /// Upper-case address letter.
    pub letter: char,
    /// Numeric value.
    pub value: f32,
}

impl Word {
    /// Create a word; the letter is upper-cased.
    pub fn new(letter: char, value: f32) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            value,
        }
    }

    /// The value as a command number, if it is a non-negative integer.
    ///
    /// `G1` yields `Some(1)`, `G38.2` yields `None`.
    pub fn code(&self) -> Option<u32> {
        if self.value >= 0.0 && self.value < 10_000.0 && self.value.fract() == 0.0 {
            Some(self.value as u32)
        } else {
            None
        }
    }
}

/// Extract the next word from `line`.
///
/// Returns the word and the unparsed rest of the line, or `None` when the
/// line is exhausted. Malformed values are reported to `sink` and skipped.
pub fn next_word<'a>(line: &'a str, sink: &mut MessageSink) -> Option<(Word, &'a str)> {
    locate_word(line, sink).map(|(word, _, rest)| (word, rest))
}

/// Like [`next_word`], additionally returning the line starting at the word.
///
/// Everything before that start has been consumed (and reported, if
/// malformed), so a caller that decides not to take the word can resume
/// scanning from there without duplicate diagnostics.
pub(crate) fn locate_word<'a>(
    mut line: &'a str,
    sink: &mut MessageSink,
) -> Option<(Word, &'a str, &'a str)> {
    loop {
        line = line.trim_start();
        let first = line.chars().next()?;
        match first {
            ';' | '%' | '*' => return None,
            '(' => {
                let end = line.find(')')?;
                line = &line[end + 1..];
                continue;
            }
            _ => {}
        }

        let start = line;
        let mut input = line;
        let (letter, number) = match address_word.parse_next(&mut input) {
            Ok(parsed) => parsed,
            Err(_) => {
                let (token, rest) = split_token(line);
                sink.diagnostic(format_args!("unexpected '{}'", token));
                line = rest;
                continue;
            }
        };

        let letter = letter.to_ascii_uppercase();
        let parsed = if number.is_empty() {
            Ok(0.0)
        } else {
            number.parse::<f32>()
        };
        match parsed {
            Ok(_) if letter == 'N' => line = input,
            Ok(value) => return Some((Word { letter, value }, start, input)),
            Err(_) => {
                let (token, rest) = split_token(&start[letter.len_utf8()..]);
                sink.diagnostic(format_args!(
                    "malformed value after '{}': '{}'",
                    letter, token
                ));
                line = rest;
            }
        }
    }
}

/// Address letter followed by the raw text of its number.
fn address_word<'a>(input: &mut &'a str) -> winnow::Result<(char, &'a str)> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        preceded(space0, take_while(0.., is_number_char)),
    )
        .parse_next(input)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | '+' | '-')
}

/// Split at the first whitespace.
fn split_token(line: &str) -> (&str, &str) {
    let end = line.find(char::is_whitespace).unwrap_or(line.len());
    line.split_at(end)
}
