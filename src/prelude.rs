pub use crate::{
    AuxValue, FieldType, Format, Header, Method, Primitive, Record, RecordBuilder, Result,
    Slow5File, Slow5Writer,
};
