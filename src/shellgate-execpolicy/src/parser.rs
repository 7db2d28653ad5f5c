//! Command-line splitting and defensive re-quoting.
//!
//! The lexer follows POSIX `sh` quoting closely enough to tell shell syntax
//! apart from literal text: an unquoted `|` is a pipe, a quoted one is part
//! of a word. It does not expand anything; instead each [`Word`] remembers
//! which kinds of expansion the shell *would* have performed on it.
//!
//! Bash-only operators are read the way `sh` reads them: `&>` is `&`
//! followed by `>`, while `|&` and `<<<` do not parse.

use std::iter::Peekable;
use std::str::CharIndices;

use serde::{Deserialize, Serialize};

use crate::command::ParsedCommand;
use crate::error::ParseError;

/// Operators that separate simple commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOperator {
    /// `|`
    Pipe,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `&`
    Background,
    /// `;` or an unquoted newline
    Sequence,
}

impl ControlOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pipe => "|",
            Self::Or => "||",
            Self::And => "&&",
            Self::Background => "&",
            Self::Sequence => ";",
        }
    }
}

/// Redirection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOperator {
    /// `<`
    Input,
    /// `>`
    Output,
    /// `>>`
    Append,
    /// `>|`
    Clobber,
    /// `<<`
    HereDoc,
    /// `<&`
    DupInput,
    /// `>&`
    DupOutput,
    /// `<>`
    ReadWrite,
}

impl RedirectOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "<",
            Self::Output => ">",
            Self::Append => ">>",
            Self::Clobber => ">|",
            Self::HereDoc => "<<",
            Self::DupInput => "<&",
            Self::DupOutput => ">&",
            Self::ReadWrite => "<>",
        }
    }
}

/// A single shell word with quoting removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word {
    /// Text of the word after quote removal. Expansions are kept verbatim.
    pub text: String,

    /// Parameter expansion (`$NAME`, `${...}`) or tilde expansion.
    pub has_expansion: bool,

    /// Command substitution (`$(...)` or backticks).
    pub has_substitution: bool,

    /// Unquoted glob or brace characters.
    pub has_glob: bool,

    /// Whether any part of the word was quoted or escaped.
    pub quoted: bool,
}

impl Word {
    /// Whether the shell would rewrite this word before running it.
    pub fn is_dynamic(&self) -> bool {
        self.has_expansion || self.has_substitution || self.has_glob
    }

    /// Whether the word has the shape of a `NAME=value` assignment.
    pub fn is_assignment(&self) -> bool {
        let Some((name, _)) = self.text.split_once('=') else {
            return false;
        };
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
    }
}

/// A lexical token of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(Word),
    Control(ControlOperator),
    Redirect {
        op: RedirectOperator,
        /// Explicit file descriptor, as in `2>`.
        fd: Option<u32>,
    },
    /// `(` or `)`
    Group(char),
}

impl Token {
    pub fn as_word(&self) -> Option<&Word> {
        match self {
            Token::Word(word) => Some(word),
            _ => None,
        }
    }
}

/// Split a command line into tokens.
pub fn split(line: &str) -> Result<Vec<Token>, ParseError> {
    let tokens = Lexer::new(line).run()?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(tokens)
}

/// Split a command line and return the words of its first simple command,
/// leaving out its redirections.
pub fn split_words(line: &str) -> Result<Vec<String>, ParseError> {
    let words = ParsedCommand::from_shell_string(line)?.leading_argv();
    if words.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(words)
}

/// Quoting rules of the shell a rewritten line is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// POSIX `sh -c`
    Posix,
    /// `cmd /C`, with arguments split by the MSVC runtime
    Cmd,
}

impl QuoteStyle {
    /// The style of the shell the process runner uses on this platform.
    pub fn native() -> Self {
        if cfg!(windows) { Self::Cmd } else { Self::Posix }
    }
}

impl Default for QuoteStyle {
    fn default() -> Self {
        Self::native()
    }
}

/// Characters `cmd.exe` acts on even inside double quotes.
const CMD_UNQUOTABLE: &[char] = &['"', '%', '!', '\r', '\n'];

/// Characters that need double quotes under `cmd.exe`.
const CMD_SPECIAL: &[char] = &[' ', '\t', '&', '|', '<', '>', '^', '(', ')', '@', ',', ';', '='];

/// Join words into a command line for the native shell, quoting each one so
/// that the shell reads back exactly the same words and nothing else.
pub fn rewrite<S: AsRef<str>>(words: &[S]) -> Result<String, ParseError> {
    rewrite_with(words, QuoteStyle::native())
}

/// [`rewrite`] for an explicit quoting style.
pub fn rewrite_with<S: AsRef<str>>(words: &[S], style: QuoteStyle) -> Result<String, ParseError> {
    match style {
        QuoteStyle::Posix => {
            shlex::try_join(words.iter().map(AsRef::as_ref)).map_err(|_| ParseError::NulByte)
        }
        QuoteStyle::Cmd => {
            let quoted = words
                .iter()
                .map(|w| cmd_quote(w.as_ref()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(quoted.join(" "))
        }
    }
}

fn cmd_quote(word: &str) -> Result<String, ParseError> {
    if word.contains('\0') {
        return Err(ParseError::NulByte);
    }
    if let Some(c) = word.chars().find(|c| CMD_UNQUOTABLE.contains(c)) {
        return Err(ParseError::Unquotable(c));
    }
    if !word.is_empty() && !word.contains(CMD_SPECIAL) {
        return Ok(word.to_string());
    }
    // Backslashes before the closing quote are doubled for the MSVC runtime
    let trailing = word.len() - word.trim_end_matches('\\').len();
    Ok(format!("\"{word}{}\"", "\\".repeat(trailing)))
}

struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    word: Option<Word>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            tokens: Vec::new(),
            word: None,
        }
    }

    fn word(&mut self) -> &mut Word {
        self.word.get_or_insert_with(Word::default)
    }

    fn finish_word(&mut self) {
        if let Some(word) = self.word.take() {
            self.tokens.push(Token::Word(word));
        }
    }

    fn next_is(&mut self, c: char) -> bool {
        if self.chars.peek().map(|&(_, n)| n) == Some(c) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn push_control(&mut self, op: ControlOperator) {
        self.finish_word();
        self.tokens.push(Token::Control(op));
    }

    fn push_redirect(&mut self, op: RedirectOperator) {
        // `2>` binds the digits to the operator, `2 >` does not
        let fd: Option<u32> = match &self.word {
            Some(w) if !w.quoted && !w.text.is_empty() && w.text.bytes().all(|b| b.is_ascii_digit()) => {
                w.text.parse().ok()
            }
            _ => None,
        };
        if fd.is_some() {
            self.word = None;
        } else {
            self.finish_word();
        }
        self.tokens.push(Token::Redirect { op, fd });
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some((idx, c)) = self.chars.next() {
            match c {
                '\0' => return Err(ParseError::NulByte),
                ' ' | '\t' | '\r' => self.finish_word(),
                '\n' => {
                    self.finish_word();
                    // Blank lines and a newline after `|`, `&&` or `||` separate nothing
                    if matches!(self.tokens.last(), Some(Token::Word(_) | Token::Group(')'))) {
                        self.tokens.push(Token::Control(ControlOperator::Sequence));
                    }
                }
                '#' if self.word.is_none() => {
                    // Comment until end of line
                    while let Some(&(_, n)) = self.chars.peek() {
                        if n == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '\'' => self.single_quoted(idx)?,
                '"' => self.double_quoted(idx)?,
                '\\' => match self.chars.next() {
                    Some((_, '\n')) => {}
                    Some((_, n)) => {
                        let word = self.word();
                        word.quoted = true;
                        word.text.push(n);
                    }
                    None => return Err(ParseError::TrailingBackslash),
                },
                '$' => self.dollar(idx)?,
                '`' => self.backticks(idx)?,
                '~' if self.word.is_none() => {
                    let word = self.word();
                    word.has_expansion = true;
                    word.text.push(c);
                }
                '*' | '?' | '[' | '{' => {
                    let word = self.word();
                    word.has_glob = true;
                    word.text.push(c);
                }
                '|' => {
                    if self.next_is('|') {
                        self.push_control(ControlOperator::Or);
                    } else {
                        self.push_control(ControlOperator::Pipe);
                    }
                }
                '&' => {
                    if self.next_is('&') {
                        self.push_control(ControlOperator::And);
                    } else {
                        self.push_control(ControlOperator::Background);
                    }
                }
                ';' => self.push_control(ControlOperator::Sequence),
                '<' => {
                    let op = if self.next_is('<') {
                        RedirectOperator::HereDoc
                    } else if self.next_is('&') {
                        RedirectOperator::DupInput
                    } else if self.next_is('>') {
                        RedirectOperator::ReadWrite
                    } else {
                        RedirectOperator::Input
                    };
                    self.push_redirect(op);
                }
                '>' => {
                    let op = if self.next_is('>') {
                        RedirectOperator::Append
                    } else if self.next_is('&') {
                        RedirectOperator::DupOutput
                    } else if self.next_is('|') {
                        RedirectOperator::Clobber
                    } else {
                        RedirectOperator::Output
                    };
                    self.push_redirect(op);
                }
                '(' | ')' => {
                    self.finish_word();
                    self.tokens.push(Token::Group(c));
                }
                _ => self.word().text.push(c),
            }
        }
        self.finish_word();
        Ok(self.tokens)
    }

    fn single_quoted(&mut self, start: usize) -> Result<(), ParseError> {
        self.word().quoted = true;
        for (_, c) in self.chars.by_ref() {
            if c == '\'' {
                return Ok(());
            }
            if c == '\0' {
                return Err(ParseError::NulByte);
            }
            self.word.get_or_insert_with(Word::default).text.push(c);
        }
        Err(ParseError::UnbalancedSingleQuote(start))
    }

    fn double_quoted(&mut self, start: usize) -> Result<(), ParseError> {
        self.word().quoted = true;
        while let Some((idx, c)) = self.chars.next() {
            match c {
                '"' => return Ok(()),
                '\0' => return Err(ParseError::NulByte),
                '\\' => match self.chars.next() {
                    Some((_, '\n')) => {}
                    Some((_, n @ ('"' | '\\' | '$' | '`'))) => self.word().text.push(n),
                    Some((_, n)) => {
                        let word = self.word();
                        word.text.push('\\');
                        word.text.push(n);
                    }
                    None => return Err(ParseError::UnbalancedDoubleQuote(start)),
                },
                '$' => self.dollar(idx)?,
                '`' => self.backticks(idx)?,
                _ => self.word().text.push(c),
            }
        }
        Err(ParseError::UnbalancedDoubleQuote(start))
    }

    fn dollar(&mut self, start: usize) -> Result<(), ParseError> {
        match self.chars.peek().map(|&(_, c)| c) {
            Some('(') => {
                self.chars.next();
                let end = self.skip_balanced(start, '(', ')')?;
                let raw = &self.src[start..end];
                let word = self.word.get_or_insert_with(Word::default);
                word.has_substitution = true;
                word.text.push_str(raw);
            }
            Some('{') => {
                self.chars.next();
                let end = self.skip_balanced(start, '{', '}')?;
                let raw = &self.src[start..end];
                let word = self.word.get_or_insert_with(Word::default);
                word.has_expansion = true;
                word.text.push_str(raw);
            }
            Some(c) if c == '_' || c.is_ascii_alphanumeric() || "@*#?$!-".contains(c) => {
                let word = self.word.get_or_insert_with(Word::default);
                word.has_expansion = true;
                word.text.push('$');
                if c.is_ascii_digit() || "@*#?$!-".contains(c) {
                    word.text.push(c);
                    self.chars.next();
                    return Ok(());
                }
                while let Some(&(_, n)) = self.chars.peek() {
                    if n != '_' && !n.is_ascii_alphanumeric() {
                        break;
                    }
                    word.text.push(n);
                    self.chars.next();
                }
            }
            _ => self.word().text.push('$'),
        }
        Ok(())
    }

    fn backticks(&mut self, start: usize) -> Result<(), ParseError> {
        while let Some((idx, c)) = self.chars.next() {
            match c {
                '\\' => {
                    self.chars.next();
                }
                '`' => {
                    let raw = &self.src[start..idx + 1];
                    let word = self.word.get_or_insert_with(Word::default);
                    word.has_substitution = true;
                    word.text.push_str(raw);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(ParseError::UnterminatedSubstitution(start))
    }

    /// Consume up to the bracket matching an already consumed `open`.
    /// Returns the byte offset just past the closing bracket.
    fn skip_balanced(&mut self, start: usize, open: char, close: char) -> Result<usize, ParseError> {
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        while let Some((idx, c)) = self.chars.next() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some('"'), '\\') => {
                    self.chars.next();
                }
                (Some(_), _) => {}
                (None, '\'' | '"') => quote = Some(c),
                (None, '\\') => {
                    self.chars.next();
                }
                (None, c) if c == open => depth += 1,
                (None, c) if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(idx + c.len_utf8());
                    }
                }
                _ => {}
            }
        }
        Err(ParseError::UnterminatedSubstitution(start))
    }
}
