/// Custom Result type for slow5 operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the slow5 library, encompassing all possible error cases
/// that can occur while reading, writing, or indexing signal files.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to file header processing
    HeaderError(#[from] HeaderError),
    /// Errors raised while decoding a record or header line
    ParseError(#[from] ParseError),
    /// Errors related to auxiliary field access and layout
    AuxError(#[from] AuxError),
    /// Errors related to the compression layer
    PressError(#[from] PressError),
    /// Errors related to the record index
    IndexError(#[from] IndexError),
    /// Errors that occur during read operations
    ReadError(#[from] ReadError),
    /// Errors that occur during write operations
    WriteError(#[from] WriteError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
    /// UTF-8 encoding/decoding errors
    Utf8Error(#[from] std::str::Utf8Error),
    /// Generic errors that can occur in any part of the system
    AnyhowError(#[from] anyhow::Error),
}
impl Error {
    /// Checks if the error marks normal end of data rather than a failure.
    ///
    /// Sequential readers return [`ReadError::EndOfFile`] on every call past
    /// the last record, so loops can terminate on this check alone.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::ReadError(ReadError::EndOfFile))
    }
}

/// Errors specific to processing and validating slow5 file headers
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic bytes at the start of a binary file do not match `BLOW5`
    #[error("Invalid magic bytes: {0:?}")]
    InvalidMagicBytes([u8; 6]),

    /// The file version in the header is not supported by this library
    #[error("Unsupported file version: {0}.{1}.{2}")]
    UnsupportedVersion(u8, u8, u8),

    /// The compression-method tag in the binary preamble is unknown
    #[error("Unknown compression method tag: {0}")]
    UnknownMethodTag(u8),

    /// The embedded text header disagrees with the binary preamble
    ///
    /// # Arguments
    /// * First `u32` - Read-group count from the preamble
    /// * Second `u32` - Read-group count from the text header block
    #[error("Read-group count mismatch: preamble says {0}, header block says {1}")]
    ReadGroupCountMismatch(u32, u32),

    /// A header must describe at least one read group
    #[error("A header requires at least one read group")]
    NoReadGroups,

    /// The requested attribute is not declared in the header
    #[error("Attribute not found in header: {0}")]
    AttributeNotFound(String),

    /// The requested read group is outside the header's range
    ///
    /// # Arguments
    /// * First `u32` - The requested read group
    /// * Second `u32` - The number of read groups in the header
    #[error("Read group {0} out of range (file has {1} read groups)")]
    ReadGroupOutOfRange(u32, u32),

    /// The attribute already exists; adding it again is rejected distinctly
    /// from a failed lookup
    #[error("Attribute already exists in header: {0}")]
    DuplicateAttribute(String),

    /// The auxiliary field already exists in the header schema
    #[error("Auxiliary field already declared in header: {0}")]
    DuplicateAuxField(String),
}

/// Errors raised while decoding malformed header lines or record data
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// A fixed header line is missing or its key is wrong
    ///
    /// # Arguments
    /// * `&'static str` - The expected line key (e.g. `#file_version`)
    #[error("Missing or malformed header line: expected {0}")]
    MissingHeaderLine(&'static str),

    /// An attribute line carries the wrong number of values
    #[error("Attribute line '{attr}' has {got} values, expected {expected} (one per read group)")]
    AttributeArityMismatch {
        attr: String,
        expected: u32,
        got: u32,
    },

    /// The format name in the header is not `slow5` or `blow5`
    #[error("Unknown file format name: {0}")]
    UnknownFormatName(String),

    /// A record row has the wrong number of columns
    #[error("Record has {got} columns, expected {expected}")]
    ColumnCountMismatch { expected: usize, got: usize },

    /// A primary field failed numeric conversion
    #[error("Invalid value for field '{field}': {value}")]
    InvalidNumericField { field: &'static str, value: String },

    /// The raw-signal sub-list length disagrees with `len_raw_signal`
    #[error("Raw signal has {got} samples but len_raw_signal is {expected}")]
    SignalLengthMismatch { expected: u64, got: u64 },

    /// An auxiliary column failed conversion to its declared type
    #[error("Invalid value for auxiliary field '{field}': {value}")]
    InvalidAuxValue { field: String, value: String },

    /// A type name in the column-type header line is not in the type table
    #[error("Unknown auxiliary type name: {0}")]
    UnknownTypeName(String),

    /// The column-type and column-name header lines disagree in arity
    #[error("Column header arity mismatch: {types} types for {names} names")]
    ColumnHeaderMismatch { types: usize, names: usize },

    /// A binary record body declared more bytes than its fields consume
    ///
    /// # Arguments
    /// * `usize` - The number of undecoded trailing bytes
    #[error("Record body has {0} trailing bytes beyond its declared fields")]
    TrailingBytes(usize),

    /// A binary record body ended before all declared fields were decoded
    #[error("Record body truncated while decoding field '{0}'")]
    TruncatedBody(String),
}

/// Errors related to auxiliary field access and layout
#[derive(thiserror::Error, Debug)]
pub enum AuxError {
    /// The record carries no field of that name
    #[error("Auxiliary field not found: {0}")]
    FieldNotFound(String),

    /// A typed accessor was called on a field of a different declared type
    ///
    /// Type-mismatched access is an error, never a truncating cast.
    #[error("Auxiliary field '{field}' is {declared}, not {requested}")]
    TypeMismatch {
        field: String,
        declared: &'static str,
        requested: &'static str,
    },
}

/// Errors related to the compression layer
#[derive(thiserror::Error, Debug)]
pub enum PressError {
    /// A compressed frame could not be inflated to completion
    #[error("Failed to decompress frame: {0}")]
    BadFrame(String),

    /// A frame left undecoded input after the member trailer
    ///
    /// # Arguments
    /// * `usize` - The number of unconsumed bytes
    #[error("Compressed frame has {0} unconsumed bytes after the gzip member")]
    FrameOverrun(usize),
}

/// Errors related to the record index
///
/// These errors occur when looking up records by identifier or when the
/// sidecar index file disagrees with the data file.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The requested identifier is not present in the index
    #[error("Read identifier not found in index: {0}")]
    ReadNotFound(String),

    /// The identifier is already present; duplicates are rejected, not merged
    #[error("Duplicate read identifier: {0}")]
    DuplicateRead(String),

    /// The operation needs an index but the handle cannot build one
    ///
    /// Returned instead of silently scanning a half-written file mid-call.
    #[error("No index is available for this handle")]
    Unavailable,
}

/// Errors that can occur while reading slow5 data
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// End of data reached; returned on every call past the last record
    #[error("End of file reached")]
    EndOfFile,

    /// The file ended mid-record without the end-of-file marker
    ///
    /// # Arguments
    /// * `u64` - The byte position where the truncation was detected
    #[error("File truncated at byte position {0}")]
    Truncated(u64),

    /// The path's extension is not `.slow5` or `.blow5` and no explicit
    /// format was given
    #[error("Unrecognized extension in path: {0}")]
    UnknownExtension(String),

    /// The explicit format disagrees with the file's extension
    #[error("Requested {requested} format but path {path} implies {implied}")]
    FormatMismatch {
        requested: &'static str,
        implied: &'static str,
        path: String,
    },
}

/// Errors that can occur while writing slow5 data
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The writer was configured with an unsupported combination
    ///
    /// # Arguments
    /// * `&'static str` - Description of the rejected configuration
    #[error("Invalid writer configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// The record omits a field the header schema declares
    ///
    /// Every header-declared auxiliary field must resolve to a value
    /// (possibly an empty array) on every record.
    #[error("Record is missing header-declared auxiliary field: {0}")]
    MissingAuxField(String),

    /// The record carries an auxiliary field the header does not declare
    #[error("Record carries undeclared auxiliary field: {0}")]
    UndeclaredAuxField(String),

    /// The record's auxiliary value type disagrees with the header schema
    #[error("Auxiliary field '{field}' is declared {declared} but record carries {got}")]
    AuxTypeMismatch {
        field: String,
        declared: &'static str,
        got: &'static str,
    },
}
