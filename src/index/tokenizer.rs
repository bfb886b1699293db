//! Tokenizer for mixed Latin/Japanese note text.
//!
//! Latin words become single lowercase tokens. Kana and CJK ideographs have no
//! word separators, so each such char is emitted as a unigram plus a bigram
//! with the following char, letting partial phrases match.

use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

/// Name the tokenizer is registered under
pub const NOTE_TOKENIZER: &str = "note_text";

#[derive(Clone, Default)]
pub struct NoteTokenizer;

impl Tokenizer for NoteTokenizer {
    type TokenStream<'a> = NoteTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        NoteTokenStream {
            tokens: tokenize(text),
            index: 0,
            token: Token::default(),
        }
    }
}

pub struct NoteTokenStream {
    tokens: Vec<Token>,
    index: usize,
    token: Token,
}

impl TokenStream for NoteTokenStream {
    fn advance(&mut self) -> bool {
        match self.tokens.get(self.index) {
            Some(next) => {
                self.token = next.clone();
                self.index += 1;
                true
            }
            None => false,
        }
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

/// Split text into index tokens with byte offsets
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let mut push = |text: String, from: usize, to: usize, tokens: &mut Vec<Token>| {
        let position = tokens.len();
        tokens.push(Token {
            offset_from: from,
            offset_to: to,
            position,
            text,
            position_length: 1,
        });
    };

    while i < chars.len() {
        let (start, ch) = chars[i];

        if is_cjk(ch) {
            let end = start + ch.len_utf8();
            push(ch.to_string(), start, end, &mut tokens);
            if let Some(&(next_start, next)) = chars.get(i + 1)
                && is_cjk(next)
            {
                push(
                    format!("{}{}", ch, next),
                    start,
                    next_start + next.len_utf8(),
                    &mut tokens,
                );
            }
            i += 1;
        } else if ch.is_alphanumeric() {
            let mut end = start;
            let mut word = String::new();
            while let Some(&(pos, c)) = chars.get(i) {
                if !c.is_alphanumeric() || is_cjk(c) {
                    break;
                }
                word.extend(c.to_lowercase());
                end = pos + c.len_utf8();
                i += 1;
            }
            push(word, start, end, &mut tokens);
        } else {
            i += 1;
        }
    }

    tokens
}

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3040..=0x309F     // Hiragana
        | 0x30A0..=0x30FF   // Katakana
        | 0x3400..=0x4DBF   // CJK Extension A
        | 0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0xAC00..=0xD7AF   // Hangul Syllables
        | 0xFF66..=0xFF9F   // Half-width Katakana
        | 0x20000..=0x2A6DF // CJK Extension B
    )
}
