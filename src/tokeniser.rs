/*!
Tokenisers split a text into tokens carrying their character offsets; detokenisers join token
strings back into a text. Offsets count `char`s, like span offsets.
*/
use crate::entity::Token;
use crate::metrics::ComputationError;

pub trait Tokeniser {
    fn tokenise(&self, text: &str) -> Vec<Token>;
}

pub trait Detokeniser {
    fn detokenise(&self, tokens: &[&str]) -> String;
}

/// Tokens are the maximal runs of non-whitespace characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokeniser;

impl Tokeniser for WhitespaceTokeniser {
    fn tokenise(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut start = None;
        let mut length = 0;
        for (i, c) in text.chars().enumerate() {
            match (c.is_whitespace(), start) {
                (true, Some(s)) => {
                    tokens.push(Token::new(s, i));
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
            length = i + 1;
        }
        if let Some(s) = start {
            tokens.push(Token::new(s, length));
        }
        tokens
    }
}

/// Tokens are the maximal runs of alphanumeric characters, and every other non-whitespace
/// character on its own: "Melbourne." gives "Melbourne" and ".".
#[derive(Debug, Clone, Copy, Default)]
pub struct WordPunctTokeniser;

impl Tokeniser for WordPunctTokeniser {
    fn tokenise(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut word_start = None;
        let mut length = 0;
        for (i, c) in text.chars().enumerate() {
            if c.is_alphanumeric() {
                word_start.get_or_insert(i);
            } else {
                if let Some(s) = word_start.take() {
                    tokens.push(Token::new(s, i));
                }
                if !c.is_whitespace() {
                    tokens.push(Token::new(i, i + 1));
                }
            }
            length = i + 1;
        }
        if let Some(s) = word_start {
            tokens.push(Token::new(s, length));
        }
        tokens
    }
}

/// One token per non-whitespace character.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokeniser;

impl Tokeniser for CharTokeniser {
    fn tokenise(&self, text: &str) -> Vec<Token> {
        text.chars()
            .enumerate()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| Token::new(i, i + 1))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceJoinDetokeniser;

impl Detokeniser for SpaceJoinDetokeniser {
    fn detokenise(&self, tokens: &[&str]) -> String {
        tokens.join(" ")
    }
}

/// Text of a token.
pub fn token_text(text: &str, token: &Token) -> String {
    text.chars()
        .skip(token.start)
        .take(token.end.saturating_sub(token.start))
        .collect()
}

/// Factory for creating tokenisers and detokenisers from names.
pub struct TokeniserFactory;

impl TokeniserFactory {
    /// Create a tokeniser from a name.
    ///
    /// - `whitespace` / `WhitespaceTokeniser`
    /// - `word_punct` / `WordPunctTokeniser`
    /// - `char` / `CharTokeniser`
    pub fn create(name: &str) -> Result<Box<dyn Tokeniser + Send + Sync>, ComputationError> {
        match name.to_lowercase().as_str() {
            "whitespace" | "whitespacetokeniser" => Ok(Box::new(WhitespaceTokeniser)),
            "word_punct" | "wordpuncttokeniser" => Ok(Box::new(WordPunctTokeniser)),
            "char" | "chartokeniser" => Ok(Box::new(CharTokeniser)),
            _ => Err(ComputationError::UnknownComponent(String::from(name))),
        }
    }

    /// Create a detokeniser from a name.
    ///
    /// - `space_join` / `SpaceJoinDetokeniser`
    pub fn create_detokeniser(
        name: &str,
    ) -> Result<Box<dyn Detokeniser + Send + Sync>, ComputationError> {
        match name.to_lowercase().as_str() {
            "space_join" | "spacejoindetokeniser" => Ok(Box::new(SpaceJoinDetokeniser)),
            _ => Err(ComputationError::UnknownComponent(String::from(name))),
        }
    }
}
