//! Structured view of a shell command line.

use crate::error::ParseError;
use crate::parser::{self, ControlOperator, RedirectOperator, Token, Word};

/// A redirection attached to a simple command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub op: RedirectOperator,
    pub fd: Option<u32>,
    pub target: Word,
}

/// One program invocation: optional `NAME=value` prefixes, the program,
/// its arguments and any redirections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleCommand {
    /// All words in order, leading assignments included.
    pub words: Vec<Word>,

    /// Number of leading `NAME=value` words.
    pub assignment_count: usize,

    pub redirections: Vec<Redirection>,
}

impl SimpleCommand {
    /// The word naming the program, after any assignments.
    pub fn program(&self) -> Option<&Word> {
        self.words.get(self.assignment_count)
    }

    /// The program's base name (without directory).
    pub fn program_basename(&self) -> Option<&str> {
        self.program().map(|w| {
            w.text
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(w.text.as_str())
        })
    }

    /// Arguments after the program word.
    pub fn args(&self) -> &[Word] {
        let start = (self.assignment_count + 1).min(self.words.len());
        &self.words[start..]
    }

    /// Text of every word, assignments included.
    pub fn argv(&self) -> Vec<String> {
        self.words.iter().map(|w| w.text.clone()).collect()
    }

    pub fn has_assignments(&self) -> bool {
        self.assignment_count > 0
    }

    fn is_empty(&self) -> bool {
        self.words.is_empty() && self.redirections.is_empty()
    }
}

/// A parsed command line.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    /// Raw command string.
    pub raw: String,

    /// Simple commands in order of appearance.
    pub commands: Vec<SimpleCommand>,

    /// Control operators between the simple commands.
    pub operators: Vec<ControlOperator>,

    /// Whether the command involves piping.
    pub has_pipe: bool,

    /// Whether the command has `(`/`)` grouping.
    pub has_groups: bool,
}

impl ParsedCommand {
    /// Parse a command from a raw shell string.
    pub fn from_shell_string(cmd: &str) -> Result<Self, ParseError> {
        let tokens = parser::split(cmd)?;
        Self::from_tokens(cmd, tokens)
    }

    /// Group already split tokens into simple commands.
    pub fn from_tokens(raw: &str, tokens: Vec<Token>) -> Result<Self, ParseError> {
        let mut commands = Vec::new();
        let mut operators = Vec::new();
        let mut current = SimpleCommand::default();
        let mut has_groups = false;
        let mut group_depth = 0usize;
        let mut prev = Prev::Start;
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            match token {
                Token::Word(word) => {
                    if current.words.len() == current.assignment_count && word.is_assignment() {
                        current.assignment_count += 1;
                    }
                    current.words.push(word);
                    prev = Prev::Word;
                }
                Token::Redirect { op, fd } => match tokens.next() {
                    Some(Token::Word(target)) => {
                        current.redirections.push(Redirection { op, fd, target });
                        prev = Prev::Word;
                    }
                    _ => return Err(ParseError::MissingRedirectTarget(op.as_str().to_string())),
                },
                Token::Control(op) => {
                    if matches!(prev, Prev::Start | Prev::Operator(_) | Prev::GroupOpen) {
                        return Err(ParseError::DanglingOperator(op.as_str().to_string()));
                    }
                    if !current.is_empty() {
                        commands.push(std::mem::take(&mut current));
                    }
                    operators.push(op);
                    prev = Prev::Operator(op);
                }
                Token::Group('(') => {
                    has_groups = true;
                    group_depth += 1;
                    if !current.is_empty() {
                        commands.push(std::mem::take(&mut current));
                    }
                    prev = Prev::GroupOpen;
                }
                Token::Group(_) => {
                    has_groups = true;
                    if group_depth == 0 || prev == Prev::GroupOpen || prev.is_binary_operator() {
                        return Err(ParseError::DanglingOperator(")".to_string()));
                    }
                    group_depth -= 1;
                    if !current.is_empty() {
                        commands.push(std::mem::take(&mut current));
                    }
                    prev = Prev::GroupClose;
                }
            }
        }

        if group_depth > 0 {
            return Err(ParseError::DanglingOperator("(".to_string()));
        }
        if let Prev::Operator(op) = prev {
            if prev.is_binary_operator() {
                return Err(ParseError::DanglingOperator(op.as_str().to_string()));
            }
        }
        if !current.is_empty() {
            commands.push(current);
        }
        if commands.is_empty() {
            return Err(ParseError::Empty);
        }

        let has_pipe = operators.contains(&ControlOperator::Pipe);
        Ok(Self {
            raw: raw.to_string(),
            commands,
            operators,
            has_pipe,
            has_groups,
        })
    }

    /// The first word of the command line (`argv[0]`).
    pub fn program_name(&self) -> &str {
        self.commands
            .first()
            .and_then(|c| c.words.first())
            .map(|w| w.text.as_str())
            .unwrap_or("")
    }

    /// Whether this is exactly one program invocation with no shell syntax
    /// around it.
    pub fn is_single_invocation(&self) -> bool {
        self.commands.len() == 1
            && self.operators.is_empty()
            && !self.has_groups
            && !self.has_redirections()
    }

    /// Whether the command has shell operators.
    pub fn has_shell_operators(&self) -> bool {
        !self.operators.is_empty() || self.has_groups
    }

    pub fn has_redirections(&self) -> bool {
        self.commands.iter().any(|c| !c.redirections.is_empty())
    }

    pub fn has_assignments(&self) -> bool {
        self.commands.iter().any(SimpleCommand::has_assignments)
    }

    /// Whether any word, redirection target included, is subject to
    /// parameter, tilde, glob or brace expansion.
    pub fn has_expansions(&self) -> bool {
        self.all_words().any(|w| w.has_expansion || w.has_glob)
    }

    /// Whether any word runs a nested command.
    pub fn has_substitution(&self) -> bool {
        self.all_words().any(|w| w.has_substitution)
    }

    fn all_words(&self) -> impl Iterator<Item = &Word> {
        self.commands.iter().flat_map(|c| {
            c.words
                .iter()
                .chain(c.redirections.iter().map(|r| &r.target))
        })
    }

    /// Words of the first simple command, used to build a safe rewrite.
    pub fn leading_argv(&self) -> Vec<String> {
        self.commands.first().map(SimpleCommand::argv).unwrap_or_default()
    }
}

/// What the grouping pass saw last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Word,
    Operator(ControlOperator),
    GroupOpen,
    GroupClose,
}

impl Prev {
    /// `;` and `&` may end a command line, the others need a right side.
    fn is_binary_operator(self) -> bool {
        matches!(
            self,
            Prev::Operator(ControlOperator::Pipe | ControlOperator::And | ControlOperator::Or)
        )
    }
}
