//! Groovy query-source parser
//!
//! Query methods live in `.groovy` files made of import statements and
//! `def` functions:
//!
//! ```groovy
//! import org.apache.tinkerpop.gremlin.process.traversal.Order;
//!
//! // friends of a user, newest first
//! def friends(id, limit) {
//!     g.V(id).out('follows').order().by('joined', Order.desc).limit(limit)
//! }
//! ```
//!
//! Function bodies are brace-balanced, with braces inside string literals
//! and comments ignored. Any other top-level statement is skipped one line
//! at a time.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_till1, take_until, take_while, take_while1},
    character::complete::{anychar, char, line_ending, multispace0, multispace1, not_line_ending, space0},
    combinator::{map, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroovyImport {
    /// Imported name, e.g. `java.util.UUID` or `a.b.C.*`.
    pub path: String,
    pub is_static: bool,
    /// Normalised statement, e.g. `import java.util.UUID;`.
    pub statement: String,
}

impl GroovyImport {
    pub fn new(path: impl Into<String>, is_static: bool) -> Self {
        let path = path.into();
        let statement = if is_static {
            format!("import static {};", path)
        } else {
            format!("import {};", path)
        };
        GroovyImport {
            path,
            is_static,
            statement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFunction {
    pub name: String,
    /// Declared argument names, in order.
    pub args: Vec<String>,
    /// Text between the outer braces, trimmed.
    pub body: String,
    /// The full definition as written.
    pub definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub imports: Vec<GroovyImport>,
    pub functions: Vec<SourceFunction>,
}

impl SourceFile {
    pub fn function(&self, name: &str) -> Option<&SourceFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct SourceSyntaxError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole query-source file.
pub fn parse_source(text: &str) -> Result<SourceFile, SourceSyntaxError> {
    let mut file = SourceFile::default();
    let mut input = text;

    loop {
        input = skip_trivia(input);
        if input.is_empty() {
            return Ok(file);
        }

        if let Ok((rest, import)) = import_statement(input) {
            file.imports.push(import);
            input = rest;
            continue;
        }

        if let Ok((after_header, (name, args))) = function_header(input) {
            let body_start = skip_space(after_header);
            if body_start.starts_with('{') {
                let (rest, braced) = block(body_start).map_err(|_| SourceSyntaxError {
                    line: line_of(text, body_start),
                    message: format!("unterminated body of function '{}'", name),
                })?;
                let consumed = input.len() - rest.len();
                file.functions.push(SourceFunction {
                    name: name.to_string(),
                    args: args.into_iter().map(str::to_string).collect(),
                    body: braced[1..braced.len() - 1].trim().to_string(),
                    definition: input[..consumed].to_string(),
                });
                input = rest;
                continue;
            }
        }

        input = skip_line(input);
    }
}

// 1-based line of the position where `rest` starts inside `text`.
fn line_of(text: &str, rest: &str) -> usize {
    let offset = text.len() - rest.len();
    text[..offset].matches('\n').count() + 1
}

fn skip_trivia(input: &str) -> &str {
    match trivia(input) {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

fn skip_space(input: &str) -> &str {
    match multispace0::<&str, nom::error::Error<&str>>(input) {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

fn skip_line(input: &str) -> &str {
    match rest_of_line(input) {
        Ok((rest, _)) => rest,
        Err(_) => "",
    }
}

fn rest_of_line(input: &str) -> IResult<&str, &str> {
    recognize(pair(not_line_ending, opt(line_ending))).parse(input)
}

fn trivia(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, comment)))).parse(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    alt((line_comment, block_comment)).parse(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), not_line_ending)).parse(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))
    .parse(input)
}

fn qualified_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        identifier,
        many0(pair(char('.'), alt((identifier, tag("*"))))),
    ))
    .parse(input)
}

fn import_statement(input: &str) -> IResult<&str, GroovyImport> {
    map(
        terminated(
            (
                preceded(
                    pair(tag("import"), multispace1),
                    opt(terminated(tag("static"), multispace1)),
                ),
                qualified_name,
            ),
            opt(preceded(space0, char(';'))),
        ),
        |(is_static, path)| GroovyImport::new(path, is_static.is_some()),
    )
    .parse(input)
}

fn function_header(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    (
        preceded(pair(tag("def"), multispace1), identifier),
        preceded(multispace0, parameter_list),
    )
        .parse(input)
}

fn parameter_list(input: &str) -> IResult<&str, Vec<&str>> {
    map(
        delimited(
            char('('),
            separated_list0(char(','), recognize(many0(parameter_item))),
            char(')'),
        ),
        |raw: Vec<&str>| raw.into_iter().filter_map(parameter_name).collect(),
    )
    .parse(input)
}

// One piece of a parameter declaration; commas and closing parens only end
// the parameter outside brackets and literals.
fn parameter_item(input: &str) -> IResult<&str, &str> {
    alt((
        comment,
        string_literal,
        block,
        bracketed,
        parenthesized,
        take_till1(|c: char| matches!(c, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '"' | '/')),
        tag("/"),
    ))
    .parse(input)
}

fn bracketed(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('['), many0(nested_item), char(']'))).parse(input)
}

fn parenthesized(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('('), many0(nested_item), char(')'))).parse(input)
}

fn nested_item(input: &str) -> IResult<&str, &str> {
    alt((
        comment,
        string_literal,
        block,
        bracketed,
        parenthesized,
        take_till1(|c: char| matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '"' | '/')),
        tag("/"),
    ))
    .parse(input)
}

// `Type name = default` -> `name`
fn parameter_name(raw: &str) -> Option<&str> {
    let declaration = raw.split('=').next().unwrap_or(raw).trim();
    declaration.split_whitespace().last()
}

/// A brace-balanced block, braces included.
fn block(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('{'), many0(block_item), char('}'))).parse(input)
}

fn block_item(input: &str) -> IResult<&str, &str> {
    alt((comment, string_literal, block, plain_code, tag("/"))).parse(input)
}

fn plain_code(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| matches!(c, '{' | '}' | '\'' | '"' | '/')).parse(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        triple_quoted_single,
        triple_quoted_double,
        quoted_single,
        quoted_double,
    ))
    .parse(input)
}

fn triple_quoted_single(input: &str) -> IResult<&str, &str> {
    recognize((tag("'''"), take_until("'''"), tag("'''"))).parse(input)
}

fn triple_quoted_double(input: &str) -> IResult<&str, &str> {
    recognize((tag("\"\"\""), take_until("\"\"\""), tag("\"\"\""))).parse(input)
}

fn quoted_single(input: &str) -> IResult<&str, &str> {
    recognize((
        char('\''),
        many0(alt((escaped_char, is_not("\\'")))),
        char('\''),
    ))
    .parse(input)
}

fn quoted_double(input: &str) -> IResult<&str, &str> {
    recognize((
        char('"'),
        many0(alt((escaped_char, is_not("\\\"")))),
        char('"'),
    ))
    .parse(input)
}

fn escaped_char(input: &str) -> IResult<&str, &str> {
    recognize(preceded(char('\\'), anychar)).parse(input)
}
