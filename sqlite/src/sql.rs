//! SQL fragment builder with flat chunk storage.

use std::borrow::Cow;
use std::fmt::Write;

use smallvec::SmallVec;

use crate::values::SQLiteValue;

#[cfg(feature = "profiling")]
use drizzle_graphql_core::gql_profile_scope;

/// SQL keywords and punctuation.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    SELECT,
    FROM,
    WHERE,
    AND,
    OR,
    NOT,
    AS,
    IN,
    IS,
    NULL,
    EXISTS,
    LIKE,
    ORDER,
    BY,
    ASC,
    DESC,
    LIMIT,
    OFFSET,
    INSERT,
    INTO,
    VALUES,
    DEFAULT,
    UPDATE,
    SET,
    DELETE,
    RETURNING,
    LPAREN,
    RPAREN,
    COMMA,
    DOT,
    EQ,
    NE,
    LT,
    GT,
    LE,
    GE,
}

impl Token {
    pub const fn as_str(self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::AND => "AND",
            Token::OR => "OR",
            Token::NOT => "NOT",
            Token::AS => "AS",
            Token::IN => "IN",
            Token::IS => "IS",
            Token::NULL => "NULL",
            Token::EXISTS => "EXISTS",
            Token::LIKE => "LIKE",
            Token::ORDER => "ORDER",
            Token::BY => "BY",
            Token::ASC => "ASC",
            Token::DESC => "DESC",
            Token::LIMIT => "LIMIT",
            Token::OFFSET => "OFFSET",
            Token::INSERT => "INSERT",
            Token::INTO => "INTO",
            Token::VALUES => "VALUES",
            Token::DEFAULT => "DEFAULT",
            Token::UPDATE => "UPDATE",
            Token::SET => "SET",
            Token::DELETE => "DELETE",
            Token::RETURNING => "RETURNING",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::COMMA => ",",
            Token::DOT => ".",
            Token::EQ => "=",
            Token::NE => "<>",
            Token::LT => "<",
            Token::GT => ">",
            Token::LE => "<=",
            Token::GE => ">=",
        }
    }

    #[inline]
    pub const fn is_operator(self) -> bool {
        matches!(
            self,
            Token::EQ | Token::NE | Token::LT | Token::GT | Token::LE | Token::GE
        )
    }
}

/// A part of an SQL statement.
#[derive(Clone, Debug, PartialEq)]
pub enum SQLChunk<'a> {
    /// Renders as: keyword or punctuation
    Token(Token),
    /// Renders as: "name"
    Ident(Cow<'a, str>),
    /// Renders as: text, unquoted
    Raw(Cow<'a, str>),
    /// Unsigned integer literal, for `LIMIT` and `OFFSET`
    Number(u64),
    /// Renders as: ?
    Param(SQLiteValue<'a>),
}

impl<'a> SQLChunk<'a> {
    fn write(&self, buf: &mut String) {
        match self {
            SQLChunk::Token(token) => buf.push_str(token.as_str()),
            SQLChunk::Ident(name) => {
                buf.push('"');
                buf.push_str(&name.replace('"', "\"\""));
                buf.push('"');
            }
            SQLChunk::Raw(text) => buf.push_str(text),
            SQLChunk::Number(n) => {
                let _ = write!(buf, "{n}");
            }
            SQLChunk::Param(_) => buf.push('?'),
        }
    }

    #[inline]
    const fn is_word_like(&self) -> bool {
        match self {
            SQLChunk::Token(t) => !matches!(
                t,
                Token::LPAREN | Token::RPAREN | Token::COMMA | Token::DOT
            ) && !t.is_operator(),
            SQLChunk::Ident(_) | SQLChunk::Raw(_) | SQLChunk::Number(_) | SQLChunk::Param(_) => {
                true
            }
        }
    }
}

impl From<Token> for SQLChunk<'_> {
    fn from(value: Token) -> Self {
        SQLChunk::Token(value)
    }
}

/// SQL fragment builder.
///
/// Uses `SmallVec<[SQLChunk; 8]>` for inline storage of typical fragments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SQL<'a> {
    pub chunks: SmallVec<[SQLChunk<'a>; 8]>,
}

impl<'a> SQL<'a> {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            chunks: SmallVec::new_const(),
        }
    }

    #[inline]
    pub fn token(t: Token) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Token(t)],
        }
    }

    /// Quoted identifier
    #[inline]
    pub fn ident(name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Ident(name.into())],
        }
    }

    /// `"alias"."column"`
    pub fn qualified(alias: impl Into<Cow<'a, str>>, column: impl Into<Cow<'a, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![
                SQLChunk::Ident(alias.into()),
                SQLChunk::Token(Token::DOT),
                SQLChunk::Ident(column.into()),
            ],
        }
    }

    #[inline]
    pub fn raw(text: impl Into<Cow<'a, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Raw(text.into())],
        }
    }

    #[inline]
    pub fn number(value: u64) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Number(value)],
        }
    }

    #[inline]
    pub fn param(value: impl Into<SQLiteValue<'a>>) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Param(value.into())],
        }
    }

    /// `NAME(args)`
    pub fn func(name: &'static str, args: SQL<'a>) -> Self {
        SQL::raw(name)
            .push(Token::LPAREN)
            .append(args)
            .push(Token::RPAREN)
    }

    #[inline]
    pub fn append(mut self, other: SQL<'a>) -> Self {
        self.append_mut(other);
        self
    }

    pub fn append_mut(&mut self, other: SQL<'a>) {
        #[cfg(feature = "profiling")]
        gql_profile_scope!("sql_render", "append");
        if self.chunks.is_empty() {
            self.chunks = other.chunks;
            return;
        }
        self.chunks.extend(other.chunks);
    }

    #[inline]
    pub fn push(mut self, chunk: impl Into<SQLChunk<'a>>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    #[inline]
    pub fn push_mut(&mut self, chunk: impl Into<SQLChunk<'a>>) {
        self.chunks.push(chunk.into());
    }

    /// Joins fragments with a separator token.
    pub fn join<I>(sqls: I, separator: Token) -> SQL<'a>
    where
        I: IntoIterator<Item = SQL<'a>>,
    {
        let mut iter = sqls.into_iter();
        let Some(mut result) = iter.next() else {
            return SQL::empty();
        };
        for item in iter {
            result.chunks.push(SQLChunk::Token(separator));
            result.chunks.extend(item.chunks);
        }
        result
    }

    /// Wrap in parentheses: (self)
    #[inline]
    pub fn parens(self) -> Self {
        SQL::token(Token::LPAREN).append(self).push(Token::RPAREN)
    }

    /// self AS "name"
    #[inline]
    pub fn alias(self, name: impl Into<Cow<'a, str>>) -> Self {
        self.push(Token::AS).push(SQLChunk::Ident(name.into()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The SQL text with `?` placeholders.
    pub fn sql(&self) -> String {
        self.build().0
    }

    /// Renders the SQL text and collects the parameters in placeholder order.
    pub fn build(&self) -> (String, SmallVec<[&SQLiteValue<'a>; 8]>) {
        #[cfg(feature = "profiling")]
        gql_profile_scope!("sql_render", "build");
        let mut buf = String::with_capacity(self.chunks.len().saturating_mul(8).max(128));
        let mut params = SmallVec::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            chunk.write(&mut buf);
            if let SQLChunk::Param(value) = chunk {
                params.push(value);
            }
            if let Some(next) = self.chunks.get(i + 1)
                && needs_space(chunk, next)
            {
                buf.push(' ');
            }
        }
        (buf, params)
    }

    /// Parameter values in placeholder order.
    pub fn params(&self) -> impl Iterator<Item = &SQLiteValue<'a>> {
        self.chunks.iter().filter_map(|chunk| match chunk {
            SQLChunk::Param(value) => Some(value),
            _ => None,
        })
    }
}

fn needs_space(current: &SQLChunk<'_>, next: &SQLChunk<'_>) -> bool {
    match (current, next) {
        (_, SQLChunk::Token(Token::RPAREN | Token::COMMA | Token::DOT)) => false,
        (SQLChunk::Token(Token::LPAREN | Token::DOT), _) => false,
        (SQLChunk::Token(Token::COMMA), _) => true,
        (SQLChunk::Token(Token::RPAREN), next) => next.is_word_like(),
        // function calls: count(...), json_object(...)
        (SQLChunk::Raw(_), SQLChunk::Token(Token::LPAREN)) => false,
        (current, SQLChunk::Token(Token::LPAREN)) => current.is_word_like(),
        (SQLChunk::Token(t), _) if t.is_operator() => true,
        (_, SQLChunk::Token(t)) if t.is_operator() => true,
        _ => current.is_word_like() && next.is_word_like(),
    }
}

impl From<Token> for SQL<'_> {
    fn from(value: Token) -> Self {
        SQL::token(value)
    }
}

impl<'a> FromIterator<SQLChunk<'a>> for SQL<'a> {
    fn from_iter<I: IntoIterator<Item = SQLChunk<'a>>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Display for SQL<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql())
    }
}
