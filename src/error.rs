use snafu::Snafu;

use crate::ir::attr::AttrKey;
use crate::ir::StmtId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A statement refers to a child that is not in the arena.
    #[snafu(display("malformed module: {parent:?} refers to missing statement #{child}"))]
    DanglingStmt { parent: Option<StmtId>, child: usize },

    /// A statement is (transitively) its own ancestor.
    #[snafu(display("malformed module: cycle through {stmt:?}"))]
    CyclicStmt { stmt: StmtId },

    /// A statement is reachable from two different parents or roots.
    #[snafu(display("malformed module: {stmt:?} is shared by more than one parent"))]
    SharedStmt { stmt: StmtId },

    /// The used-by table disagrees with the uses table.
    #[snafu(display(
        "malformed module: {stmt:?} is a child of {expected:?} but records parent {found:?}"
    ))]
    ParentMismatch {
        stmt: StmtId,
        expected: Option<StmtId>,
        found: Option<StmtId>,
    },

    #[snafu(display("attribute {key} holds a {found}, expected a {expected}"))]
    AttrTypeMismatch {
        key: AttrKey,
        expected: &'static str,
        found: &'static str,
    },

    #[snafu(display("attribute {key} is not set"))]
    MissingAttr { key: AttrKey },

    #[snafu(display("invalid rule configuration: {source}"))]
    InvalidConfig { source: serde_json::Error },

    #[snafu(display("rule configuration field {field} = {value} is outside [{min}, {max}]"))]
    ConfigOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Two registered rules claim the same attribute key.
    #[snafu(display("rules {existing} and {incoming} both write attribute {key}"))]
    OverlappingAttrKeys {
        key: AttrKey,
        existing: &'static str,
        incoming: &'static str,
    },
}
