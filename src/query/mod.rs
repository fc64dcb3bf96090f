//! Query lifecycle: classification, mode resolution, CTAS rewriting, and
//! execution.

mod classify;
mod ctas;
pub mod executor;
mod mode;

pub use classify::{
    classify_query, ClassificationRule, QueryClassifier, QueryKind, CTAS_RULE, DDL_RULE,
    DEFAULT_RULES, SELECT_RULE,
};
pub use ctas::{
    temp_table_name, wrap_as_ctas, CtasCleanup, CtasRewrite, CTAS_FORMAT_OPTIONS,
    CTAS_TABLE_PREFIX,
};
pub use executor::{Interrupt, QueryExecutor, SubmitContext, STOP_REQUEST_TIMEOUT};
pub use mode::{resolve, QueryOptions, ResolvedQuery, ResultMode};
