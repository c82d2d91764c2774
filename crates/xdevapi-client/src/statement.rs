//! Ad-hoc statements.
//!
//! An [`AdHocStatement`] accumulates positional arguments until it runs for
//! the first time. From then on it is frozen: each binding call replaces the
//! whole argument list, so re-running with new values never sends stale ones.

use xdevapi_proto::{Literal, Namespace, StmtExecute};

use crate::client::Client;
use crate::connection::Connection;
use crate::error::Error;
use crate::result::SqlResult;

/// Whether binding appends to or replaces the argument list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindPhase {
    /// Never executed; bindings append.
    #[default]
    Fresh,
    /// Executed at least once; bindings replace.
    Frozen,
}

/// A statement sent as text with positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AdHocStatement {
    namespace: Namespace,
    text: String,
    args: Vec<Literal>,
    phase: BindPhase,
}

impl AdHocStatement {
    /// Create a SQL statement.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Sql,
            text: text.into(),
            args: Vec::new(),
            phase: BindPhase::Fresh,
        }
    }

    /// Use another namespace.
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Bind positional values.
    ///
    /// Before the first successful execution, calls accumulate. Once the
    /// statement is frozen, every call replaces the whole argument list, so
    /// `stmt.bind([1]).bind([2])` sends only `[2]`. Pass one complete set of
    /// arguments per call.
    pub fn bind<I, T>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Literal>,
    {
        if self.phase == BindPhase::Frozen {
            self.args.clear();
        }
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Statement text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Namespace.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Current arguments.
    pub fn args(&self) -> &[Literal] {
        &self.args
    }

    /// Current binding phase.
    pub fn phase(&self) -> BindPhase {
        self.phase
    }

    /// Check if the statement has run successfully at least once.
    pub fn is_frozen(&self) -> bool {
        self.phase == BindPhase::Frozen
    }

    /// The request this statement sends, with compact metadata.
    pub fn to_request(&self) -> StmtExecute {
        StmtExecute::new(self.text.as_str())
            .with_namespace(self.namespace)
            .with_args(&self.args)
            .with_compact_metadata(true)
    }

    /// Run the statement on `client`.
    pub async fn execute(&mut self, client: &Client) -> Result<SqlResult, Error> {
        client.execute(self).await
    }

    pub(crate) fn freeze(&mut self) {
        if self.phase == BindPhase::Fresh {
            tracing::debug!(args = self.args.len(), "statement frozen");
            self.phase = BindPhase::Frozen;
        }
    }
}

/// Build the request for `statement`, failing first if `connection` cannot
/// carry it.
pub fn build_ad_hoc_request(
    connection: &mut Connection,
    statement: &AdHocStatement,
) -> Result<StmtExecute, Error> {
    connection.check_usable()?;
    Ok(statement.to_request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdevapi_proto::{codec, ScalarValue, WireValue};

    #[test]
    fn test_bind_appends_while_fresh() {
        let mut stmt = AdHocStatement::new("SELECT ?, ?");
        stmt.bind(["a"]).bind(["b"]);
        assert_eq!(stmt.args(), &[Literal::from("a"), Literal::from("b")]);
        assert_eq!(stmt.phase(), BindPhase::Fresh);
    }

    #[test]
    fn test_bind_replaces_when_frozen() {
        let mut stmt = AdHocStatement::new("SELECT ?, ?");
        stmt.bind(["a"]).bind(["b"]);
        stmt.freeze();
        stmt.bind(["c"]);
        assert_eq!(stmt.args(), &[Literal::from("c")]);

        stmt.bind([1i64, 2]);
        assert_eq!(stmt.args(), &[Literal::Int(1), Literal::Int(2)]);
        assert!(stmt.is_frozen());

        // Chained calls on a frozen statement keep only the last set.
        stmt.bind([1i64]).bind([2i64]);
        assert_eq!(stmt.args(), &[Literal::Int(2)]);
    }

    #[test]
    fn test_freeze_is_irreversible() {
        let mut stmt = AdHocStatement::new("DO 1");
        stmt.freeze();
        stmt.freeze();
        assert_eq!(stmt.phase(), BindPhase::Frozen);
    }

    #[test]
    fn test_request_shape() {
        let mut stmt = AdHocStatement::new("list_objects").with_namespace(Namespace::Mysqlx);
        stmt.bind([Literal::object([("schema", "shop")])]);

        let request = stmt.to_request();
        assert_eq!(request.namespace, Namespace::Mysqlx);
        assert_eq!(request.stmt_str(), Some("list_objects"));
        assert!(request.compact_metadata);
        assert_eq!(request.args.len(), 1);
        assert_eq!(
            codec::decode(&request.args[0]).unwrap().get("schema"),
            Some(&Literal::from("shop"))
        );
    }

    #[test]
    fn test_large_unsigned_argument_is_exact() {
        let mut stmt = AdHocStatement::new("SELECT ?");
        stmt.bind([u64::MAX]);
        assert_eq!(
            stmt.to_request().args,
            vec![WireValue::Scalar(ScalarValue::UnsignedInt(u64::MAX))]
        );
    }
}
