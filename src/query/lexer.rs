use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while1};
use nom::character::complete::{char, digit1, u16 as parse_u16, u32 as parse_u32};
use nom::combinator::{cut, map_res, opt, recognize, value};
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};
use crate::core::error::{Error, Result};

/// Characters with a meaning of their own in query text
const RESERVED: &[char] = &['&', '|', '>', '~', '"', '(', ')', '=', '^', '?', '[', ']'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorToken {
    And,
    Or,
    AndNot,
    Preceding,
    Near { tolerance: Option<u32>, preceding: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryToken {
    Text(String),  // May contain wildcard characters
    FuzzyMatchStart {
        max_edit_distance: Option<u16>,
        max_sequential_edits: Option<u16>,
    },
    Operator(OperatorToken),
    FieldFilter(String),
    Quote,
    OpenBracket,
    CloseBracket,
    ScoreBoost(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    pub position: usize,  // Char offset in the query text
    pub token: QueryToken,
}

fn is_word_char(ch: char) -> bool {
    !ch.is_whitespace() && !RESERVED.contains(&ch)
}

fn operator(input: &str) -> IResult<&str, QueryToken> {
    alt((
        value(OperatorToken::AndNot, tag("&!")),
        value(OperatorToken::And, char('&')),
        value(OperatorToken::Or, char('|')),
        value(OperatorToken::Preceding, char('>')),
        (preceded(char('~'), opt(parse_u32)), opt(char('>')))
            .map(|(tolerance, preceding)| OperatorToken::Near { tolerance, preceding: preceding.is_some() }),
    ))
    .map(QueryToken::Operator)
    .parse(input)
}

/// `?`, `?n?`, `?n,m?` or `?,m?`
fn fuzzy_match_start(input: &str) -> IResult<&str, QueryToken> {
    let (input, _) = char('?').parse(input)?;
    if !input.starts_with(|c: char| c.is_ascii_digit() || c == ',') {
        let token = QueryToken::FuzzyMatchStart { max_edit_distance: None, max_sequential_edits: None };
        return Ok((input, token));
    }

    let (input, (max_edit_distance, max_sequential_edits)) = cut((
        opt(parse_u16),
        terminated(opt(preceded(char(','), opt(parse_u16))), char('?')),
    ))
    .parse(input)?;

    let token = QueryToken::FuzzyMatchStart {
        max_edit_distance,
        max_sequential_edits: max_sequential_edits.flatten(),
    };
    Ok((input, token))
}

fn score_boost(input: &str) -> IResult<&str, QueryToken> {
    preceded(
        char('^'),
        cut(map_res(recognize((digit1, opt((char('.'), digit1)))), |s: &str| s.parse::<f64>())),
    )
    .map(QueryToken::ScoreBoost)
    .parse(input)
}

/// `name=` or `[name with spaces]=`
fn field_filter(input: &str) -> IResult<&str, QueryToken> {
    alt((
        terminated(delimited(char('['), take_until("]"), char(']')), char('=')),
        terminated(take_while1(is_word_char), char('=')),
    ))
    .map(|name: &str| QueryToken::FieldFilter(name.trim().to_string()))
    .parse(input)
}

fn text(input: &str) -> IResult<&str, QueryToken> {
    take_while1(is_word_char)
        .map(|text: &str| QueryToken::Text(text.to_string()))
        .parse(input)
}

fn token(input: &str) -> IResult<&str, QueryToken> {
    alt((
        fuzzy_match_start,
        score_boost,
        operator,
        value(QueryToken::Quote, char('"')),
        value(QueryToken::OpenBracket, char('(')),
        value(QueryToken::CloseBracket, char(')')),
        field_filter,
        text,
    ))
    .parse(input)
}

/// Split query text into tokens, each tagged with where it started.
pub fn tokenize(query: &str) -> Result<Vec<PositionedToken>> {
    let mut tokens = Vec::new();
    let mut rest = query.trim_start();

    while !rest.is_empty() {
        let position = query[..query.len() - rest.len()].chars().count();
        match token(rest) {
            Ok((remaining, token)) => {
                tokens.push(PositionedToken { position, token });
                rest = remaining.trim_start();
            }
            Err(nom::Err::Failure(_)) if rest.starts_with('?') => {
                return Err(Error::query_parse(format!(
                    "Malformed fuzzy match parameters at position {}",
                    position
                )));
            }
            Err(nom::Err::Failure(_)) => {
                return Err(Error::query_parse(format!("Malformed score boost at position {}", position)));
            }
            Err(_) => {
                let unexpected = rest.chars().next().unwrap_or_default();
                return Err(Error::query_parse(format!(
                    "Unexpected character '{}' at position {}",
                    unexpected, position
                )));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn tokens(query: &str) -> Vec<QueryToken> {
        tokenize(query).unwrap().into_iter().map(|t| t.token).collect()
    }

    fn text(value: &str) -> QueryToken {
        QueryToken::Text(value.to_string())
    }

    #[test]
    fn test_words_and_operators() {
        assert_eq!(tokens("quick & fox | dog &! cat > bird"), vec![
            text("quick"),
            QueryToken::Operator(OperatorToken::And),
            text("fox"),
            QueryToken::Operator(OperatorToken::Or),
            text("dog"),
            QueryToken::Operator(OperatorToken::AndNot),
            text("cat"),
            QueryToken::Operator(OperatorToken::Preceding),
            text("bird"),
        ]);
    }

    #[test]
    fn test_near_operators() {
        assert_eq!(tokens("a ~3 b ~3> c ~ d ~> e"), vec![
            text("a"),
            QueryToken::Operator(OperatorToken::Near { tolerance: Some(3), preceding: false }),
            text("b"),
            QueryToken::Operator(OperatorToken::Near { tolerance: Some(3), preceding: true }),
            text("c"),
            QueryToken::Operator(OperatorToken::Near { tolerance: None, preceding: false }),
            text("d"),
            QueryToken::Operator(OperatorToken::Near { tolerance: None, preceding: true }),
            text("e"),
        ]);
    }

    #[test]
    fn test_fuzzy_parameter_forms() {
        let fuzzy = |e, s| QueryToken::FuzzyMatchStart { max_edit_distance: e, max_sequential_edits: s };
        assert_eq!(tokens("?word"), vec![fuzzy(None, None), text("word")]);
        assert_eq!(tokens("?2?word"), vec![fuzzy(Some(2), None), text("word")]);
        assert_eq!(tokens("?2,1?word"), vec![fuzzy(Some(2), Some(1)), text("word")]);
        assert_eq!(tokens("?,3?word"), vec![fuzzy(None, Some(3)), text("word")]);
    }

    #[test]
    fn test_malformed_fuzzy_parameters() {
        let err = tokenize("?2,x?word").unwrap_err();
        assert_eq!(err.kind, ErrorKind::QueryParse);
        assert!(err.context.contains("fuzzy"));
    }

    #[test]
    fn test_field_filters_phrases_and_boosts() {
        assert_eq!(tokens("title=\"big cat\"^2.5 [page title]=(te*t)"), vec![
            QueryToken::FieldFilter("title".to_string()),
            QueryToken::Quote,
            text("big"),
            text("cat"),
            QueryToken::Quote,
            QueryToken::ScoreBoost(2.5),
            QueryToken::FieldFilter("page title".to_string()),
            QueryToken::OpenBracket,
            text("te*t"),
            QueryToken::CloseBracket,
        ]);
    }

    #[test]
    fn test_positions_are_char_offsets() {
        let tokens = tokenize("café & bar").unwrap();
        assert_eq!(tokens[1].position, 5);
        assert_eq!(tokens[2].position, 7);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a = b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::QueryParse);
        assert_eq!(err.context, "Unexpected character '=' at position 2");

        assert_eq!(tokenize("word^x").unwrap_err().context, "Malformed score boost at position 4");
    }
}
