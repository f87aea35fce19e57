//! Decomposes one already-framed line into `(prefix, command, params)`
//! (spec §4.B). This layer does no further parameter tokenization — each
//! command handler in `dispatcher.rs` splits its own params tail.

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::opt,
    sequence::preceded,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub prefix: String,
    pub command: String,
    pub params: String,
}

fn is_not_space(c: char) -> bool {
    c != ' '
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(is_not_space)(input)
}

fn prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), token).parse(input)
}

/// Parses a non-empty line into its prefix/command/params parts. Never
/// fails: a line with only a command token yields empty params, and a line
/// that is just a prefix with no command yields an empty command (the
/// dispatcher then reports 421 for the empty command token).
pub fn parse_message(line: &str) -> ParsedMessage {
    let (rest, maybe_prefix) = opt(prefix).parse(line).unwrap_or((line, None));
    let rest = rest.strip_prefix(' ').unwrap_or(rest);

    let (rest, command) = token(rest).unwrap_or((rest, ""));
    let params = rest.strip_prefix(' ').unwrap_or(rest);

    ParsedMessage {
        prefix: maybe_prefix.unwrap_or("").to_string(),
        command: command.to_string(),
        params: params.to_string(),
    }
}

/// Splits a params tail into at most `max` whitespace-delimited tokens,
/// where the last token absorbs everything after a leading `:` verbatim
/// (the classic IRC trailing-parameter convention), or after the
/// whitespace budget is exhausted.
pub fn split_params(params: &str, max: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = params;
    while tokens.len() + 1 < max {
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.is_empty() {
            return tokens;
        }
        if let Some(tail) = trimmed.strip_prefix(':') {
            tokens.push(tail.to_string());
            return tokens;
        }
        match trimmed.find(' ') {
            Some(i) => {
                tokens.push(trimmed[..i].to_string());
                rest = &trimmed[i..];
            }
            None => {
                tokens.push(trimmed.to_string());
                return tokens;
            }
        }
    }
    let trimmed = rest.trim_start_matches(' ');
    if !trimmed.is_empty() {
        tokens.push(trimmed.strip_prefix(':').unwrap_or(trimmed).to_string());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_message() {
        let m = parse_message(":alice!alice@host PRIVMSG #room :hello there");
        assert_eq!(m.prefix, "alice!alice@host");
        assert_eq!(m.command, "PRIVMSG");
        assert_eq!(m.params, "#room :hello there");
    }

    #[test]
    fn parses_unprefixed_message() {
        let m = parse_message("NICK alice");
        assert_eq!(m.prefix, "");
        assert_eq!(m.command, "NICK");
        assert_eq!(m.params, "alice");
    }

    #[test]
    fn parses_command_with_no_params() {
        let m = parse_message("QUIT");
        assert_eq!(m.command, "QUIT");
        assert_eq!(m.params, "");
    }

    #[test]
    fn split_params_honors_trailing_colon() {
        let parts = split_params("alice 0 * :Alice A", 4);
        assert_eq!(parts, vec!["alice", "0", "*", "Alice A"]);
    }

    #[test]
    fn split_params_stops_at_max() {
        let parts = split_params("#room :hello world", 2);
        assert_eq!(parts, vec!["#room", "hello world"]);
    }
}
