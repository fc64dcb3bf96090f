//! Leading-keyword query classification.
//!
//! Query text is never parsed. A statement is classified by the first rule in
//! an ordered list whose pattern matches the start of the text.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AthenaError, Result};

/// The kind of statement, as far as result handling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Schema statements: ALTER, CREATE, DESCRIBE, DROP, MSCK, SHOW.
    Ddl,
    /// A plain SELECT with a tabular result.
    Select,
    /// `CREATE ... AS SELECT`.
    Ctas,
    /// Anything else. Handled like a non-SELECT.
    Unknown,
}

impl QueryKind {
    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ddl => write!(f, "DDL"),
            Self::Select => write!(f, "SELECT"),
            Self::Ctas => write!(f, "CTAS"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A pattern and the kind it assigns.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub kind: QueryKind,
    pub pattern: &'static str,
}

/// Schema statement keywords.
pub const DDL_RULE: ClassificationRule = ClassificationRule {
    kind: QueryKind::Ddl,
    pattern: r"(?i)^(ALTER|CREATE|DESCRIBE|DROP|MSCK|SHOW)",
};

/// A statement already shaped as `CREATE ... AS SELECT`.
pub const CTAS_RULE: ClassificationRule = ClassificationRule {
    kind: QueryKind::Ctas,
    pattern: r"(?is)^CREATE.+AS\s+SELECT",
};

/// A bare SELECT.
pub const SELECT_RULE: ClassificationRule = ClassificationRule {
    kind: QueryKind::Select,
    pattern: r"(?i)^SELECT",
};

/// Rule precedence, first match wins.
///
/// DDL comes before CTAS, so user-written CTAS text classifies as DDL and is
/// answered in API mode. `CTAS_RULE` is still consulted directly through
/// [`QueryClassifier::matches`] for rewritten text.
pub const DEFAULT_RULES: [ClassificationRule; 3] = [DDL_RULE, CTAS_RULE, SELECT_RULE];

/// Classifier holding compiled rules in precedence order.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    rules: Vec<(QueryKind, Regex)>,
}

impl QueryClassifier {
    /// Compiles the given rules, keeping their order.
    pub fn with_rules(rules: &[ClassificationRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(rule.pattern)
                    .map(|re| (rule.kind, re))
                    .map_err(|e| {
                        AthenaError::config(format!("Invalid pattern for {}: {e}", rule.kind))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Classifies query text. Leading whitespace is ignored.
    pub fn classify(&self, sql: &str) -> QueryKind {
        let sql = sql.trim_start();
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(sql))
            .map_or(QueryKind::Unknown, |(kind, _)| *kind)
    }

    /// Returns true if any rule for `kind` matches, regardless of precedence.
    pub fn matches(&self, kind: QueryKind, sql: &str) -> bool {
        let sql = sql.trim_start();
        self.rules
            .iter()
            .any(|(k, re)| *k == kind && re.is_match(sql))
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        default_classifier().clone()
    }
}

fn default_classifier() -> &'static QueryClassifier {
    static CLASSIFIER: OnceLock<QueryClassifier> = OnceLock::new();
    CLASSIFIER.get_or_init(|| {
        QueryClassifier::with_rules(&DEFAULT_RULES).expect("default classification rules compile")
    })
}

/// Classifies query text with the default rules.
pub fn classify_query(sql: &str) -> QueryKind {
    default_classifier().classify(sql)
}
