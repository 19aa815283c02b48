use std::cmp::Ordering;
use std::fmt;
use crate::query::wildcard::WildcardFragment;

/// Binary operators, lowest precedence first: Or < And/AndNot < positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    AndNot,
    Preceding,
    Near(u32),           // Tolerance in tokens, either direction
    PrecedingNear(u32),  // Tolerance in tokens, left before right only
}

impl BinaryOperator {
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 0,
            BinaryOperator::And | BinaryOperator::AndNot => 1,
            BinaryOperator::Preceding | BinaryOperator::Near(_) | BinaryOperator::PrecedingNear(_) => 2,
        }
    }

    /// Whether `self`, following a `current` operator, takes that operator's
    /// right operand as its left one. Except is not associative, so it never
    /// nests at equal precedence.
    fn nests_under(self, current: BinaryOperator) -> bool {
        match self.precedence().cmp(&current.precedence()) {
            Ordering::Greater => true,
            Ordering::Equal => self != BinaryOperator::AndNot && current != BinaryOperator::AndNot,
            Ordering::Less => false,
        }
    }

    pub fn is_positional(&self) -> bool {
        self.precedence() == 2
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Or => write!(f, "|"),
            BinaryOperator::And => write!(f, "&"),
            BinaryOperator::AndNot => write!(f, "&!"),
            BinaryOperator::Preceding => write!(f, ">"),
            BinaryOperator::Near(tolerance) => write!(f, "~{}", tolerance),
            BinaryOperator::PrecedingNear(tolerance) => write!(f, "~{}>", tolerance),
        }
    }
}

/// A single query word. The word is raw query text; it is run through the
/// target field's tokenizer at execution time.
#[derive(Debug, Clone, PartialEq)]
pub enum WordQueryPart {
    Exact {
        word: String,
        score_boost: Option<f64>,
    },
    Fuzzy {
        word: String,
        max_edit_distance: u16,
        max_sequential_edits: u16,
        score_boost: Option<f64>,
    },
    Wildcard {
        fragments: Vec<WildcardFragment>,
        score_boost: Option<f64>,
    },
}

impl WordQueryPart {
    pub fn exact(word: impl Into<String>) -> Self {
        WordQueryPart::Exact { word: word.into(), score_boost: None }
    }

    pub fn score_boost(&self) -> Option<f64> {
        match self {
            WordQueryPart::Exact { score_boost, .. }
            | WordQueryPart::Fuzzy { score_boost, .. }
            | WordQueryPart::Wildcard { score_boost, .. } => *score_boost,
        }
    }

    pub fn set_score_boost(&mut self, boost: f64) {
        match self {
            WordQueryPart::Exact { score_boost, .. }
            | WordQueryPart::Fuzzy { score_boost, .. }
            | WordQueryPart::Wildcard { score_boost, .. } => *score_boost = Some(boost),
        }
    }
}

impl fmt::Display for WordQueryPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordQueryPart::Exact { word, .. } => write!(f, "{}", word)?,
            WordQueryPart::Fuzzy { word, max_edit_distance, max_sequential_edits, .. } => {
                write!(f, "?{},{}?{}", max_edit_distance, max_sequential_edits, word)?
            }
            WordQueryPart::Wildcard { fragments, .. } => {
                for fragment in fragments {
                    write!(f, "{}", fragment)?;
                }
            }
        }
        if let Some(boost) = self.score_boost() {
            write!(f, "^{}", boost)?;
        }
        Ok(())
    }
}

/// Parsed query operator tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPart {
    Word(WordQueryPart),
    /// Words that must occur consecutively, in order
    Adjacent {
        words: Vec<WordQueryPart>,
        score_boost: Option<f64>,
    },
    /// Restricts the statement to one field's index entries
    Field {
        field_name: String,
        statement: Box<QueryPart>,
    },
    /// Parenthesized statement; never split by operator precedence
    Bracketed(Box<QueryPart>),
    Binary {
        operator: BinaryOperator,
        left: Box<QueryPart>,
        right: Box<QueryPart>,
    },
    Empty,
}

impl QueryPart {
    pub fn word(word: impl Into<String>) -> Self {
        QueryPart::Word(WordQueryPart::exact(word))
    }

    pub fn binary(operator: BinaryOperator, left: QueryPart, right: QueryPart) -> Self {
        QueryPart::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn field(field_name: impl Into<String>, statement: QueryPart) -> Self {
        QueryPart::Field {
            field_name: field_name.into(),
            statement: Box::new(statement),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, QueryPart::Empty)
    }

    /// Attach `right` with `operator`. An operator binding more tightly than
    /// the rightmost operator of the tree becomes that operator's new right
    /// child, as does one of equal precedence unless either side is `&!`;
    /// otherwise it wraps the tree.
    pub fn combine(self, operator: BinaryOperator, right: QueryPart) -> QueryPart {
        match self {
            QueryPart::Empty => right,
            QueryPart::Binary { operator: current, left, right: current_right }
                if operator.nests_under(current) =>
            {
                QueryPart::Binary {
                    operator: current,
                    left,
                    right: Box::new(current_right.combine(operator, right)),
                }
            }
            tree => QueryPart::binary(operator, tree, right),
        }
    }
}

impl fmt::Display for QueryPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPart::Word(word) => write!(f, "{}", word),
            QueryPart::Adjacent { words, score_boost } => {
                let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
                write!(f, "\"{}\"", words.join(" "))?;
                if let Some(boost) = score_boost {
                    write!(f, "^{}", boost)?;
                }
                Ok(())
            }
            QueryPart::Field { field_name, statement } => {
                if field_name.chars().any(char::is_whitespace) {
                    write!(f, "[{}]={}", field_name, statement)
                } else {
                    write!(f, "{}={}", field_name, statement)
                }
            }
            QueryPart::Bracketed(statement) => write!(f, "({})", statement),
            QueryPart::Binary { operator, left, right } => write!(f, "{} {} {}", left, operator, right),
            QueryPart::Empty => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_rotates_tighter_operator_into_right_child() {
        let tree = QueryPart::word("a")
            .combine(BinaryOperator::Or, QueryPart::word("b"))
            .combine(BinaryOperator::And, QueryPart::word("c"));

        match tree {
            QueryPart::Binary { operator: BinaryOperator::Or, right, .. } => {
                assert!(matches!(*right, QueryPart::Binary { operator: BinaryOperator::And, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_combine_wraps_on_looser_operator() {
        let tree = QueryPart::word("a")
            .combine(BinaryOperator::Near(3), QueryPart::word("b"))
            .combine(BinaryOperator::And, QueryPart::word("c"));

        match tree {
            QueryPart::Binary { operator: BinaryOperator::And, left, .. } => {
                assert!(matches!(*left, QueryPart::Binary { operator: BinaryOperator::Near(3), .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_display_renders_query_syntax() {
        let tree = QueryPart::field("title", QueryPart::word("rust"))
            .combine(BinaryOperator::PrecedingNear(2), QueryPart::word("async"));
        assert_eq!(tree.to_string(), "title=rust ~2> async");

        let spaced = QueryPart::field("page title", QueryPart::Bracketed(Box::new(QueryPart::word("x"))));
        assert_eq!(spaced.to_string(), "[page title]=(x)");
    }
}
