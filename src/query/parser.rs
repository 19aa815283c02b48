use log::debug;
use crate::core::config::{IndexConfig, JoinOperator};
use crate::core::error::{Error, Result};
use crate::query::ast::{BinaryOperator, QueryPart, WordQueryPart};
use crate::query::lexer::{self, OperatorToken, PositionedToken, QueryToken};
use crate::query::wildcard::{contains_wildcard, parse_fragments};

/// Turns query text into a [`QueryPart`] tree.
///
/// Operators are applied left to right with three precedence tiers
/// (`|` < `&`/`&!` < `>`/`~n`/`~n>`); terms with no operator between them are
/// joined with the configured default operator.
#[derive(Debug, Clone)]
pub struct QueryParser {
    pub default_join_operator: JoinOperator,
    pub near_default_tolerance: u32,
    pub fuzzy_max_edit_distance: u16,
    pub fuzzy_max_sequential_edits: u16,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(&IndexConfig::default())
    }
}

struct TokenCursor {
    tokens: Vec<PositionedToken>,
    index: usize,
}

impl TokenCursor {
    fn next(&mut self) -> Option<PositionedToken> {
        let token = self.tokens.get(self.index).cloned();
        self.index += 1;
        token
    }

    fn peek(&self) -> Option<&QueryToken> {
        self.tokens.get(self.index).map(|t| &t.token)
    }

    /// Position for "missing ..." errors: the next token, or the end
    fn position(&self, query_length: usize) -> usize {
        self.tokens.get(self.index).map_or(query_length, |t| t.position)
    }
}

impl QueryParser {
    pub fn new(config: &IndexConfig) -> Self {
        QueryParser {
            default_join_operator: config.default_join_operator,
            near_default_tolerance: config.near_default_tolerance,
            fuzzy_max_edit_distance: config.fuzzy_max_edit_distance,
            fuzzy_max_sequential_edits: config.fuzzy_max_sequential_edits,
        }
    }

    pub fn parse(&self, query: &str) -> Result<QueryPart> {
        let mut cursor = TokenCursor { tokens: lexer::tokenize(query)?, index: 0 };
        let part = self.parse_statement(&mut cursor, query.chars().count(), None)?;
        debug!("parsed query '{}' as '{}'", query, part);
        Ok(part)
    }

    fn join_operator(&self) -> BinaryOperator {
        match self.default_join_operator {
            JoinOperator::And => BinaryOperator::And,
            JoinOperator::Or => BinaryOperator::Or,
        }
    }

    fn binary_operator(&self, token: OperatorToken) -> BinaryOperator {
        match token {
            OperatorToken::And => BinaryOperator::And,
            OperatorToken::Or => BinaryOperator::Or,
            OperatorToken::AndNot => BinaryOperator::AndNot,
            OperatorToken::Preceding => BinaryOperator::Preceding,
            OperatorToken::Near { tolerance, preceding: false } => {
                BinaryOperator::Near(tolerance.unwrap_or(self.near_default_tolerance))
            }
            OperatorToken::Near { tolerance, preceding: true } => {
                BinaryOperator::PrecedingNear(tolerance.unwrap_or(self.near_default_tolerance))
            }
        }
    }

    /// Parse until the end of input, or the closing bracket when `opened_at`
    /// holds the position of an open bracket.
    fn parse_statement(&self, cursor: &mut TokenCursor, length: usize, opened_at: Option<usize>) -> Result<QueryPart> {
        let mut tree = QueryPart::Empty;
        let mut pending: Option<BinaryOperator> = None;

        loop {
            let Some(next) = cursor.peek() else {
                if let Some(position) = opened_at {
                    return Err(Error::query_parse(format!(
                        "Missing closing bracket for bracket at position {}",
                        position
                    )));
                }
                break;
            };

            match next {
                QueryToken::CloseBracket => {
                    let position = cursor.position(length);
                    cursor.next();
                    if opened_at.is_none() {
                        return Err(Error::query_parse(format!("Unexpected ')' at position {}", position)));
                    }
                    break;
                }
                QueryToken::Operator(token) => {
                    let operator = self.binary_operator(*token);
                    if tree.is_empty() || pending.is_some() {
                        return Err(Error::query_parse(format!(
                            "Unexpected operator '{}' at position {}",
                            operator,
                            cursor.position(length)
                        )));
                    }
                    cursor.next();
                    pending = Some(operator);
                }
                QueryToken::ScoreBoost(_) => {
                    return Err(Error::query_parse(format!(
                        "Unexpected score boost at position {}",
                        cursor.position(length)
                    )));
                }
                _ => {
                    let operand = self.parse_operand(cursor, length)?;
                    tree = match pending.take() {
                        Some(operator) => tree.combine(operator, operand),
                        None if tree.is_empty() => operand,
                        None => tree.combine(self.join_operator(), operand),
                    };
                }
            }
        }

        if let Some(operator) = pending {
            return Err(Error::query_parse(format!(
                "Missing right-hand side of operator '{}' at position {}",
                operator,
                cursor.position(length)
            )));
        }

        Ok(tree)
    }

    fn parse_operand(&self, cursor: &mut TokenCursor, length: usize) -> Result<QueryPart> {
        let Some(PositionedToken { position, token }) = cursor.next() else {
            return Err(Error::query_parse(format!("Unexpected end of query at position {}", length)));
        };

        let mut part = match token {
            QueryToken::Text(text) => QueryPart::Word(self.word(text)),
            QueryToken::FuzzyMatchStart { max_edit_distance, max_sequential_edits } => {
                let Some(QueryToken::Text(word)) = cursor.peek().cloned() else {
                    return Err(Error::query_parse(format!(
                        "Expected a word after the fuzzy match at position {}",
                        position
                    )));
                };
                cursor.next();
                QueryPart::Word(WordQueryPart::Fuzzy {
                    word,
                    max_edit_distance: max_edit_distance.unwrap_or(self.fuzzy_max_edit_distance),
                    max_sequential_edits: max_sequential_edits.unwrap_or(self.fuzzy_max_sequential_edits),
                    score_boost: None,
                })
            }
            QueryToken::FieldFilter(field_name) => {
                let statement = match cursor.peek() {
                    None | Some(QueryToken::Operator(_) | QueryToken::CloseBracket | QueryToken::ScoreBoost(_)) => {
                        return Err(Error::query_parse(format!(
                            "Expected a statement after field filter '{}' at position {}",
                            field_name, position
                        )));
                    }
                    Some(_) => self.parse_operand(cursor, length)?,
                };
                return Ok(QueryPart::field(field_name, statement));
            }
            QueryToken::Quote => self.parse_adjacent(cursor, position)?,
            QueryToken::OpenBracket => {
                let statement = self.parse_statement(cursor, length, Some(position))?;
                if statement.is_empty() {
                    return Err(Error::query_parse(format!(
                        "Empty bracketed expression at position {}",
                        position
                    )));
                }
                QueryPart::Bracketed(Box::new(statement))
            }
            QueryToken::Operator(_) | QueryToken::CloseBracket | QueryToken::ScoreBoost(_) => {
                return Err(Error::query_parse(format!("Unexpected token at position {}", position)));
            }
        };

        if let Some(QueryToken::ScoreBoost(boost)) = cursor.peek().cloned() {
            let boost_position = cursor.position(length);
            cursor.next();
            match &mut part {
                QueryPart::Word(word) => word.set_score_boost(boost),
                QueryPart::Adjacent { score_boost, .. } => *score_boost = Some(boost),
                _ => {
                    return Err(Error::query_parse(format!(
                        "Score boosts only apply to words and phrases (position {})",
                        boost_position
                    )));
                }
            }
        }

        Ok(part)
    }

    fn parse_adjacent(&self, cursor: &mut TokenCursor, opened_at: usize) -> Result<QueryPart> {
        let mut words = Vec::new();

        loop {
            match cursor.next() {
                Some(PositionedToken { token: QueryToken::Quote, .. }) => break,
                Some(PositionedToken { token: QueryToken::Text(text), .. }) => words.push(self.word(text)),
                Some(PositionedToken { position, .. }) => {
                    return Err(Error::query_parse(format!(
                        "Only words may appear in an adjacent expression (position {})",
                        position
                    )));
                }
                None => {
                    return Err(Error::query_parse(format!(
                        "Missing closing quote for quote at position {}",
                        opened_at
                    )));
                }
            }
        }

        if words.is_empty() {
            return Err(Error::query_parse(format!("Empty adjacent expression at position {}", opened_at)));
        }

        Ok(QueryPart::Adjacent { words, score_boost: None })
    }

    fn word(&self, text: String) -> WordQueryPart {
        if contains_wildcard(&text) {
            WordQueryPart::Wildcard { fragments: parse_fragments(&text), score_boost: None }
        } else {
            WordQueryPart::Exact { word: text, score_boost: None }
        }
    }
}
