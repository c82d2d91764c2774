//! Protobuf messages of the X Protocol.
//!
//! Tags follow the `mysqlx_*.proto` definitions. Every singular field is
//! declared `optional` so presence survives decoding; required fields are
//! checked when converting into the crate's own types. Enum fields are kept
//! as raw integers and mapped by the owning module.

/// `Mysqlx.Datatypes`.
pub mod datatypes {
    use bytes::Bytes;

    /// `Scalar.String`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ScalarString {
        #[prost(bytes = "bytes", optional, tag = "1")]
        pub value: Option<Bytes>,
        #[prost(uint64, optional, tag = "2")]
        pub collation: Option<u64>,
    }

    /// `Scalar.Octets`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ScalarOctets {
        #[prost(bytes = "bytes", optional, tag = "1")]
        pub value: Option<Bytes>,
        #[prost(uint32, optional, tag = "2")]
        pub content_type: Option<u32>,
    }

    /// `Scalar`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Scalar {
        #[prost(uint32, optional, tag = "1")]
        pub r#type: Option<u32>,
        #[prost(sint64, optional, tag = "2")]
        pub v_signed_int: Option<i64>,
        #[prost(uint64, optional, tag = "3")]
        pub v_unsigned_int: Option<u64>,
        #[prost(message, optional, tag = "5")]
        pub v_octets: Option<ScalarOctets>,
        #[prost(double, optional, tag = "6")]
        pub v_double: Option<f64>,
        #[prost(float, optional, tag = "7")]
        pub v_float: Option<f32>,
        #[prost(bool, optional, tag = "8")]
        pub v_bool: Option<bool>,
        #[prost(message, optional, tag = "9")]
        pub v_string: Option<ScalarString>,
    }

    /// `Object.ObjectField`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ObjectField {
        #[prost(string, optional, tag = "1")]
        pub key: Option<String>,
        #[prost(message, optional, tag = "2")]
        pub value: Option<Any>,
    }

    /// `Object`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Object {
        #[prost(message, repeated, tag = "1")]
        pub fld: Vec<ObjectField>,
    }

    /// `Array`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Array {
        #[prost(message, repeated, tag = "1")]
        pub value: Vec<Any>,
    }

    /// `Any`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Any {
        #[prost(uint32, optional, tag = "1")]
        pub r#type: Option<u32>,
        #[prost(message, optional, tag = "2")]
        pub scalar: Option<Scalar>,
        #[prost(message, optional, tag = "3")]
        pub obj: Option<Object>,
        #[prost(message, optional, tag = "4")]
        pub array: Option<Array>,
    }
}

/// `Mysqlx.Connection`.
pub mod connection {
    use super::datatypes::Any;

    /// `Capability`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Capability {
        #[prost(string, optional, tag = "1")]
        pub name: Option<String>,
        #[prost(message, optional, tag = "2")]
        pub value: Option<Any>,
    }

    /// `Capabilities`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Capabilities {
        #[prost(message, repeated, tag = "1")]
        pub capabilities: Vec<Capability>,
    }

    /// `CapabilitiesSet`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CapabilitiesSet {
        #[prost(message, optional, tag = "1")]
        pub capabilities: Option<Capabilities>,
    }
}

/// `Mysqlx.Session`.
pub mod session {
    use bytes::Bytes;

    /// `AuthenticateStart`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct AuthenticateStart {
        #[prost(string, optional, tag = "1")]
        pub mech_name: Option<String>,
        #[prost(bytes = "bytes", optional, tag = "2")]
        pub auth_data: Option<Bytes>,
        #[prost(bytes = "bytes", optional, tag = "3")]
        pub initial_response: Option<Bytes>,
    }

    /// `AuthenticateContinue` and `AuthenticateOk` share this shape.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct AuthData {
        #[prost(bytes = "bytes", optional, tag = "1")]
        pub auth_data: Option<Bytes>,
    }

    /// `Reset`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Reset {
        #[prost(bool, optional, tag = "1")]
        pub keep_open: Option<bool>,
    }
}

/// `Mysqlx.Sql`.
pub mod sql {
    use bytes::Bytes;

    use super::datatypes::Any;

    /// `StmtExecute`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct StmtExecute {
        #[prost(bytes = "bytes", optional, tag = "1")]
        pub stmt: Option<Bytes>,
        #[prost(message, repeated, tag = "2")]
        pub args: Vec<Any>,
        #[prost(string, optional, tag = "3")]
        pub namespace: Option<String>,
        #[prost(bool, optional, tag = "4")]
        pub compact_metadata: Option<bool>,
    }
}

/// `Mysqlx.Prepare`.
pub mod prepare {
    use bytes::Bytes;

    use super::datatypes::Any;
    use super::sql::StmtExecute;

    /// `Prepare.OneOfMessage`. CRUD bodies stay encoded.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct OneOfMessage {
        #[prost(uint32, optional, tag = "1")]
        pub r#type: Option<u32>,
        #[prost(bytes = "bytes", optional, tag = "2")]
        pub find: Option<Bytes>,
        #[prost(bytes = "bytes", optional, tag = "3")]
        pub insert: Option<Bytes>,
        #[prost(bytes = "bytes", optional, tag = "4")]
        pub update: Option<Bytes>,
        #[prost(bytes = "bytes", optional, tag = "5")]
        pub delete: Option<Bytes>,
        #[prost(message, optional, tag = "6")]
        pub stmt_execute: Option<StmtExecute>,
    }

    /// `Prepare`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Prepare {
        #[prost(uint32, optional, tag = "1")]
        pub stmt_id: Option<u32>,
        #[prost(message, optional, tag = "2")]
        pub stmt: Option<OneOfMessage>,
    }

    /// `Execute`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Execute {
        #[prost(uint32, optional, tag = "1")]
        pub stmt_id: Option<u32>,
        #[prost(message, repeated, tag = "2")]
        pub args: Vec<Any>,
        #[prost(bool, optional, tag = "3")]
        pub compact_metadata: Option<bool>,
    }

    /// `Deallocate`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Deallocate {
        #[prost(uint32, optional, tag = "1")]
        pub stmt_id: Option<u32>,
    }
}

/// `Mysqlx.Notice`.
pub mod notice {
    use bytes::Bytes;

    use super::datatypes::Scalar;

    /// `Frame`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Frame {
        #[prost(uint32, optional, tag = "1")]
        pub r#type: Option<u32>,
        #[prost(uint32, optional, tag = "2")]
        pub scope: Option<u32>,
        #[prost(bytes = "bytes", optional, tag = "3")]
        pub payload: Option<Bytes>,
    }

    /// `Warning`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Warning {
        #[prost(uint32, optional, tag = "1")]
        pub level: Option<u32>,
        #[prost(uint32, optional, tag = "2")]
        pub code: Option<u32>,
        #[prost(string, optional, tag = "3")]
        pub msg: Option<String>,
    }

    /// `SessionVariableChanged`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SessionVariableChanged {
        #[prost(string, optional, tag = "1")]
        pub param: Option<String>,
        #[prost(message, optional, tag = "2")]
        pub value: Option<Scalar>,
    }

    /// `SessionStateChanged`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SessionStateChanged {
        #[prost(uint32, optional, tag = "1")]
        pub param: Option<u32>,
        #[prost(message, repeated, tag = "2")]
        pub value: Vec<Scalar>,
    }
}

/// `Mysqlx.Resultset`.
pub mod resultset {
    use bytes::Bytes;

    /// `ColumnMetaData`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ColumnMetaData {
        #[prost(uint32, optional, tag = "1")]
        pub r#type: Option<u32>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub name: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "3")]
        pub original_name: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "4")]
        pub table: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "5")]
        pub original_table: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "6")]
        pub schema: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "7")]
        pub catalog: Option<Vec<u8>>,
        #[prost(uint64, optional, tag = "8")]
        pub collation: Option<u64>,
        #[prost(uint32, optional, tag = "9")]
        pub fractional_digits: Option<u32>,
        #[prost(uint32, optional, tag = "10")]
        pub length: Option<u32>,
        #[prost(uint32, optional, tag = "11")]
        pub flags: Option<u32>,
        #[prost(uint32, optional, tag = "12")]
        pub content_type: Option<u32>,
    }

    /// `Row`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Row {
        #[prost(bytes = "bytes", repeated, tag = "1")]
        pub field: Vec<Bytes>,
    }
}

/// `Mysqlx.Ok`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct OkMessage {
    #[prost(string, optional, tag = "1")]
    pub msg: Option<String>,
}

/// `Mysqlx.Error`. The message text is read as bytes and converted lossily.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ErrorMessage {
    #[prost(uint32, optional, tag = "1")]
    pub severity: Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub code: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub msg: Option<Vec<u8>>,
    #[prost(string, optional, tag = "4")]
    pub sql_state: Option<String>,
}
