//! Statement results.

use xdevapi_proto::notice::{state_param, Notice, SessionStateChanged, Warning};
use xdevapi_proto::{ColumnMetaData, Row, ScalarValue};

/// Outcome of one statement execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlResult {
    /// Columns of each result set, in order.
    pub columns: Vec<Vec<ColumnMetaData>>,
    /// Rows of each result set, in order.
    pub rows: Vec<Vec<Row>>,
    /// Rows changed by the statement.
    pub rows_affected: u64,
    /// `LAST_INSERT_ID()` reported by the server.
    pub last_insert_id: Option<u64>,
    /// Document ids generated by an insert.
    pub generated_ids: Vec<String>,
    /// Warnings raised while executing.
    pub warnings: Vec<Warning>,
}

impl SqlResult {
    /// Check if the statement produced a result set.
    pub fn has_data(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Rows of the first result set.
    pub fn first_rows(&self) -> &[Row] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Columns of the first result set.
    pub fn first_columns(&self) -> &[ColumnMetaData] {
        self.columns.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Open a new result set; following columns and rows belong to it.
    pub(crate) fn start_result_set(&mut self) {
        self.columns.push(Vec::new());
        self.rows.push(Vec::new());
    }

    pub(crate) fn push_column(&mut self, column: ColumnMetaData) {
        if self.columns.is_empty() {
            self.start_result_set();
        }
        if let Some(columns) = self.columns.last_mut() {
            columns.push(column);
        }
    }

    pub(crate) fn push_row(&mut self, row: Row) {
        if self.rows.is_empty() {
            self.start_result_set();
        }
        if let Some(rows) = self.rows.last_mut() {
            rows.push(row);
        }
    }

    pub(crate) fn apply_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Warning(warning) => self.warnings.push(warning),
            Notice::SessionStateChanged(change) => self.apply_state_change(change),
            _ => {}
        }
    }

    fn apply_state_change(&mut self, change: SessionStateChanged) {
        match change.param {
            state_param::ROWS_AFFECTED => self.rows_affected = change.as_u64().unwrap_or_default(),
            state_param::GENERATED_INSERT_ID => self.last_insert_id = change.as_u64(),
            state_param::GENERATED_DOCUMENT_IDS => {
                let ids = change.values.iter().filter_map(|v| match v {
                    ScalarValue::Octets { value, .. } | ScalarValue::String { value, .. } => {
                        std::str::from_utf8(value).ok().map(str::to_string)
                    }
                    _ => None,
                });
                self.generated_ids.extend(ids);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdevapi_proto::resultset::field_type;

    #[test]
    fn test_result_sets_are_kept_apart() {
        let mut result = SqlResult::default();
        result.start_result_set();
        result.push_column(ColumnMetaData::new(field_type::SINT));
        result.push_row(Row::new([vec![0x02u8]]));
        result.start_result_set();
        result.push_column(ColumnMetaData::new(field_type::BYTES));
        result.push_column(ColumnMetaData::new(field_type::BYTES));

        assert!(result.has_data());
        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.first_columns().len(), 1);
        assert_eq!(result.first_rows().len(), 1);
        assert!(result.rows[1].is_empty());
    }

    #[test]
    fn test_state_notices() {
        let mut result = SqlResult::default();
        result.apply_notice(Notice::SessionStateChanged(SessionStateChanged {
            param: state_param::ROWS_AFFECTED,
            values: vec![ScalarValue::UnsignedInt(2)],
        }));
        result.apply_notice(Notice::SessionStateChanged(SessionStateChanged {
            param: state_param::GENERATED_INSERT_ID,
            values: vec![ScalarValue::UnsignedInt(41)],
        }));
        result.apply_notice(Notice::SessionStateChanged(SessionStateChanged {
            param: state_param::GENERATED_DOCUMENT_IDS,
            values: vec![
                ScalarValue::octets(&b"00005f2a0000000000000001"[..]),
                ScalarValue::octets(&b"00005f2a0000000000000002"[..]),
            ],
        }));

        assert!(!result.has_data());
        assert_eq!(result.rows_affected, 2);
        assert_eq!(result.last_insert_id, Some(41));
        assert_eq!(result.generated_ids.len(), 2);
        assert_eq!(result.generated_ids[1], "00005f2a0000000000000002");
    }
}
