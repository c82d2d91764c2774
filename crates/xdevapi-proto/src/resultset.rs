//! Result set messages (`Mysqlx.Resultset`).
//!
//! Row fields are kept in their raw per-column encoding; interpreting them
//! needs the column type and belongs to the row mapping layer.

use bytes::Bytes;
use prost::Message;

use crate::mysqlx::resultset as pb;
use crate::Error;

/// `ColumnMetaData.type` values.
pub mod field_type {
    /// Signed integer.
    pub const SINT: u32 = 1;
    /// Unsigned integer.
    pub const UINT: u32 = 2;
    /// Double.
    pub const DOUBLE: u32 = 5;
    /// Float.
    pub const FLOAT: u32 = 6;
    /// Bytes or string.
    pub const BYTES: u32 = 7;
    /// Time.
    pub const TIME: u32 = 10;
    /// Date or datetime.
    pub const DATETIME: u32 = 12;
    /// Set.
    pub const SET: u32 = 15;
    /// Enum.
    pub const ENUM: u32 = 16;
    /// Bit field.
    pub const BIT: u32 = 17;
    /// Decimal.
    pub const DECIMAL: u32 = 18;
}

/// Description of one result column.
///
/// With compact metadata only `field_type` and the encoding details are sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMetaData {
    /// One of the [`field_type`] constants.
    pub field_type: u32,
    /// Column label.
    pub name: Option<String>,
    /// Column name in the table.
    pub original_name: Option<String>,
    /// Table label.
    pub table: Option<String>,
    /// Table name.
    pub original_table: Option<String>,
    /// Schema name.
    pub schema: Option<String>,
    /// Catalog name.
    pub catalog: Option<String>,
    /// Collation id for string columns.
    pub collation: Option<u64>,
    /// Digits after the decimal point.
    pub fractional_digits: Option<u32>,
    /// Display length.
    pub length: Option<u32>,
    /// Type-specific flags.
    pub flags: Option<u32>,
    /// Content type for byte columns.
    pub content_type: Option<u32>,
}

impl ColumnMetaData {
    /// Create compact metadata for a column of the given type.
    pub fn new(field_type: u32) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    /// Set the column label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Encode as a message body.
    pub fn to_bytes(&self) -> Bytes {
        let text = |value: &Option<String>| value.as_ref().map(|v| v.as_bytes().to_vec());
        let message = pb::ColumnMetaData {
            r#type: Some(self.field_type),
            name: text(&self.name),
            original_name: text(&self.original_name),
            table: text(&self.table),
            original_table: text(&self.original_table),
            schema: text(&self.schema),
            catalog: text(&self.catalog),
            collation: self.collation,
            fractional_digits: self.fractional_digits,
            length: self.length,
            flags: self.flags,
            content_type: self.content_type,
        };
        Bytes::from(message.encode_to_vec())
    }

    /// Decode a message body. Names that are not valid UTF-8 are converted lossily.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let message = pb::ColumnMetaData::decode(data)?;
        let text = |value: Option<Vec<u8>>| value.map(|v| String::from_utf8_lossy(&v).into_owned());
        Ok(Self {
            field_type: message.r#type.ok_or_else(|| Error::decode("missing column type"))?,
            name: text(message.name),
            original_name: text(message.original_name),
            table: text(message.table),
            original_table: text(message.original_table),
            schema: text(message.schema),
            catalog: text(message.catalog),
            collation: message.collation,
            fractional_digits: message.fractional_digits,
            length: message.length,
            flags: message.flags,
            content_type: message.content_type,
        })
    }
}

/// One row of raw field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Encoded field values, one per column.
    pub fields: Vec<Bytes>,
}

impl Row {
    /// Create a row from raw field values.
    pub fn new<I, B>(fields: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Encode as a message body.
    pub fn to_bytes(&self) -> Bytes {
        let message = pb::Row {
            field: self.fields.clone(),
        };
        Bytes::from(message.encode_to_vec())
    }

    /// Decode a message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let message = pb::Row::decode(data)?;
        Ok(Self { fields: message.field })
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw bytes of a field. An empty slice is SQL `NULL`.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.fields.get(index).map(|b| &b[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_metadata() {
        let message = pb::ColumnMetaData {
            r#type: Some(field_type::BYTES),
            name: Some(b"title".to_vec()),
            table: Some(b"books".to_vec()),
            collation: Some(255),
            length: Some(1024),
            ..Default::default()
        };

        let meta = ColumnMetaData::decode(&message.encode_to_vec()).unwrap();
        assert_eq!(meta.field_type, field_type::BYTES);
        assert_eq!(meta.name.as_deref(), Some("title"));
        assert_eq!(meta.table.as_deref(), Some("books"));
        assert_eq!(meta.collation, Some(255));
        assert_eq!(meta.length, Some(1024));
        assert_eq!(meta.schema, None);
    }

    #[test]
    fn test_compact_metadata_has_no_names() {
        // type = SINT
        let meta = ColumnMetaData::decode(&[0x08, 0x01]).unwrap();
        assert_eq!(meta.field_type, field_type::SINT);
        assert!(meta.name.is_none());
    }

    #[test]
    fn test_invalid_utf8_name_is_lossy() {
        let message = pb::ColumnMetaData {
            r#type: Some(field_type::BYTES),
            name: Some(vec![b'a', 0xff]),
            ..Default::default()
        };
        let meta = ColumnMetaData::decode(&message.encode_to_vec()).unwrap();
        assert_eq!(meta.name.as_deref(), Some("a\u{fffd}"));
    }

    #[test]
    fn test_full_metadata_survives_encoding() {
        let mut meta = ColumnMetaData::new(field_type::DECIMAL).with_name("price");
        meta.original_name = Some("unit_price".into());
        meta.schema = Some("shop".into());
        meta.fractional_digits = Some(2);
        meta.flags = Some(1);

        assert_eq!(ColumnMetaData::decode(&meta.to_bytes()).unwrap(), meta);
    }

    #[test]
    fn test_missing_type() {
        let err = ColumnMetaData::decode(&[]).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_row() {
        // Three `field` entries: [0x02], empty, "abc\0".
        let bytes = [0x0a, 0x01, 0x02, 0x0a, 0x00, 0x0a, 0x04, b'a', b'b', b'c', 0x00];

        let row = Row::decode(&bytes).unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(0), Some(&[0x02][..]));
        assert_eq!(row.get(1), Some(&[][..]));
        assert_eq!(row.get(2), Some(&b"abc\0"[..]));
        assert_eq!(row.get(3), None);
        assert_eq!(
            row,
            Row::new([
                Bytes::from_static(&[0x02]),
                Bytes::new(),
                Bytes::from_static(b"abc\0"),
            ])
        );
        assert_eq!(&row.to_bytes()[..], &bytes[..]);
    }
}
