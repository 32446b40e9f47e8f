//! # Header Subsystem
//!
//! One header per file: format name, semantic version, read-group count, an
//! open attribute map duplicated per read group, and the auxiliary-field
//! schema shared by every record in the file.
//!
//! The header body is always text, even in binary files. A binary file
//! prefixes it with a fixed 64-byte preamble (magic, version, compression
//! method, read-group count, zero padding) and stores the text block behind a
//! u32 length prefix, gzip-compressed as one member when the file's method is
//! not [`Method::None`]. The length prefix counts the on-disk bytes that
//! follow it.

use std::collections::HashMap;
use std::io::{BufRead, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::aux::FieldType;
use crate::error::{HeaderError, ParseError, Result};
use crate::format::Format;
use crate::press::{Method, Press};

/// Magic bytes opening every binary file.
pub const MAGIC: [u8; 6] = *b"BLOW5\x01";
/// Fixed size of the binary preamble.
pub const PREAMBLE_SIZE: usize = 64;
/// File version written by this library.
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Column separator for all text-encoded lines.
pub(crate) const SEP: char = '\t';

/// Types of the eight primary columns, in column order.
pub(crate) const PRIMARY_TYPES: [&str; 8] = [
    "char*", "uint32_t", "float", "double", "double", "double", "uint64_t", "int16_t*",
];
/// Names of the eight primary columns, in column order.
pub(crate) const PRIMARY_COLUMNS: [&str; 8] = [
    "read_id",
    "read_group",
    "digitisation",
    "offset",
    "range",
    "sampling_rate",
    "len_raw_signal",
    "raw_signal",
];

/// A slow5 file header.
///
/// Attribute keys form one set shared by all read groups while values differ
/// per group: adding an attribute adds an unset slot to every group, and
/// adding a read group adds an unset slot for every existing attribute, so
/// the two operations commute.
#[derive(Debug, Clone)]
pub struct Header {
    format: Format,
    version: (u8, u8, u8),
    num_read_groups: u32,
    /// Attribute names in insertion order (stable serialization order)
    attr_names: Vec<String>,
    /// Attribute name -> slot in `attr_names` / `values`
    attr_index: HashMap<String, usize>,
    /// Per-attribute, per-read-group values; `None` marks an unset slot
    values: Vec<Vec<Option<String>>>,
    /// Auxiliary field names in declaration order
    aux_names: Vec<String>,
    aux_index: HashMap<String, usize>,
    aux_types: Vec<FieldType>,
}
impl Header {
    /// Creates an empty header for a writer.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::NoReadGroups`] when `num_read_groups` is zero.
    pub fn new(num_read_groups: u32) -> Result<Self> {
        if num_read_groups == 0 {
            return Err(HeaderError::NoReadGroups.into());
        }
        Ok(Self {
            format: Format::Ascii,
            version: VERSION,
            num_read_groups,
            attr_names: Vec::new(),
            attr_index: HashMap::new(),
            values: Vec::new(),
            aux_names: Vec::new(),
            aux_index: HashMap::new(),
            aux_types: Vec::new(),
        })
    }

    /// The container format this header was parsed from or will serialize as.
    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    pub(crate) fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    /// The semantic version triple.
    #[must_use]
    pub fn version(&self) -> (u8, u8, u8) {
        self.version
    }

    /// The version as a `major.minor.patch` string.
    #[must_use]
    pub fn version_string(&self) -> String {
        let (major, minor, patch) = self.version;
        format!("{major}.{minor}.{patch}")
    }

    #[must_use]
    pub fn num_read_groups(&self) -> u32 {
        self.num_read_groups
    }

    /// Attribute names in insertion order.
    #[must_use]
    pub fn attr_names(&self) -> &[String] {
        &self.attr_names
    }

    /// Looks up an attribute value for one read group.
    ///
    /// Returns `Ok(None)` for a declared-but-unset slot. Lookup failure is an
    /// error, never an empty value: an undeclared attribute yields
    /// [`HeaderError::AttributeNotFound`] and an out-of-range read group
    /// yields [`HeaderError::ReadGroupOutOfRange`].
    pub fn attr(&self, name: &str, read_group: u32) -> Result<Option<&str>> {
        let slot = self
            .attr_index
            .get(name)
            .ok_or_else(|| HeaderError::AttributeNotFound(name.to_string()))?;
        if read_group >= self.num_read_groups {
            return Err(
                HeaderError::ReadGroupOutOfRange(read_group, self.num_read_groups).into(),
            );
        }
        Ok(self.values[*slot][read_group as usize].as_deref())
    }

    /// Sets an attribute value for one read group.
    ///
    /// Never changes the attribute set; setting an undeclared attribute is an
    /// error (declare it first with [`Header::add_attr`]).
    pub fn set_attr(&mut self, name: &str, value: &str, read_group: u32) -> Result<()> {
        let slot = self
            .attr_index
            .get(name)
            .ok_or_else(|| HeaderError::AttributeNotFound(name.to_string()))?;
        if read_group >= self.num_read_groups {
            return Err(
                HeaderError::ReadGroupOutOfRange(read_group, self.num_read_groups).into(),
            );
        }
        self.values[*slot][read_group as usize] = Some(value.to_string());
        Ok(())
    }

    /// Declares a new attribute, unset for every read group.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::DuplicateAttribute`] if the name exists,
    /// distinct from the not-found error so callers can tell the two apart.
    pub fn add_attr(&mut self, name: &str) -> Result<()> {
        if self.attr_index.contains_key(name) {
            return Err(HeaderError::DuplicateAttribute(name.to_string()).into());
        }
        self.attr_index
            .insert(name.to_string(), self.attr_names.len());
        self.attr_names.push(name.to_string());
        self.values
            .push(vec![None; self.num_read_groups as usize]);
        Ok(())
    }

    /// Adds a read group, extending every attribute with an unset slot.
    ///
    /// Returns the new group's index.
    pub fn add_read_group(&mut self) -> u32 {
        for row in &mut self.values {
            row.push(None);
        }
        let group = self.num_read_groups;
        self.num_read_groups += 1;
        group
    }

    /// Auxiliary field names in declaration order.
    #[must_use]
    pub fn aux_names(&self) -> &[String] {
        &self.aux_names
    }

    /// Auxiliary field types, parallel to [`Header::aux_names`].
    #[must_use]
    pub fn aux_types(&self) -> &[FieldType] {
        &self.aux_types
    }

    /// The declared type of one auxiliary field.
    pub fn aux_type(&self, name: &str) -> Result<FieldType> {
        self.aux_index
            .get(name)
            .map(|slot| self.aux_types[*slot])
            .ok_or_else(|| HeaderError::AttributeNotFound(name.to_string()).into())
    }

    /// Declares an auxiliary field shared by every record of the file.
    pub fn add_aux_field(&mut self, name: &str, field_type: FieldType) -> Result<()> {
        if self.aux_index.contains_key(name) {
            return Err(HeaderError::DuplicateAuxField(name.to_string()).into());
        }
        self.aux_index
            .insert(name.to_string(), self.aux_names.len());
        self.aux_names.push(name.to_string());
        self.aux_types.push(field_type);
        Ok(())
    }

    /// Serializes the text encoding of the whole header, column lines
    /// included.
    #[must_use]
    pub fn to_text(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let _ = writeln!(out, "#file_format{SEP}{}", self.format.name());
        let _ = writeln!(out, "#file_version{SEP}{}", self.version_string());
        let _ = writeln!(out, "#num_read_groups{SEP}{}", self.num_read_groups);
        for (slot, name) in self.attr_names.iter().enumerate() {
            let _ = write!(out, "@{name}");
            for value in &self.values[slot] {
                let _ = write!(out, "{SEP}{}", value.as_deref().unwrap_or(""));
            }
            out.push(b'\n');
        }
        // column-type line, then column-name line
        out.push(b'#');
        let _ = write!(out, "{}", PRIMARY_TYPES.join("\t"));
        for ty in &self.aux_types {
            let _ = write!(out, "{SEP}{ty}");
        }
        out.push(b'\n');
        out.push(b'#');
        let _ = write!(out, "{}", PRIMARY_COLUMNS.join("\t"));
        for name in &self.aux_names {
            let _ = write!(out, "{SEP}{name}");
        }
        out.push(b'\n');
        out
    }

    /// Parses the text header from a buffered reader, leaving the reader
    /// positioned at the first record row.
    pub fn from_text_reader<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut line = String::new();

        let format_name = read_kv_line(reader, &mut line, "#file_format")?;
        let format = Format::from_name(&format_name)
            .ok_or(ParseError::UnknownFormatName(format_name))?;

        let version_str = read_kv_line(reader, &mut line, "#file_version")?;
        let version = parse_version(&version_str)?;
        if version.0 != VERSION.0 || version.1 != VERSION.1 {
            return Err(
                HeaderError::UnsupportedVersion(version.0, version.1, version.2).into(),
            );
        }

        let groups_str = read_kv_line(reader, &mut line, "#num_read_groups")?;
        let num_read_groups: u32 = groups_str.parse().map_err(|_| {
            ParseError::InvalidNumericField {
                field: "num_read_groups",
                value: groups_str.clone(),
            }
        })?;
        if num_read_groups == 0 {
            return Err(HeaderError::NoReadGroups.into());
        }

        let mut header = Self::new(num_read_groups)?;
        header.format = format;
        header.version = version;

        // attribute lines until the column-type line is reached
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(ParseError::MissingHeaderLine("#<column types>").into());
            }
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if let Some(rest) = trimmed.strip_prefix('@') {
                header.parse_attr_line(rest)?;
            } else if let Some(rest) = trimmed.strip_prefix('#') {
                let types = parse_type_line(rest)?;
                header.parse_column_line(reader, &mut line, &types)?;
                return Ok(header);
            } else {
                return Err(ParseError::MissingHeaderLine("@<attribute> or #<column types>").into());
            }
        }
    }

    fn parse_attr_line(&mut self, rest: &str) -> Result<()> {
        let mut tokens = rest.split(SEP);
        let name = tokens
            .next()
            .ok_or(ParseError::MissingHeaderLine("@<attribute>"))?;
        let values: Vec<&str> = tokens.collect();
        if values.len() != self.num_read_groups as usize {
            return Err(ParseError::AttributeArityMismatch {
                attr: name.to_string(),
                expected: self.num_read_groups,
                got: values.len() as u32,
            }
            .into());
        }
        self.add_attr(name)?;
        for (group, value) in values.iter().enumerate() {
            self.set_attr(name, value, group as u32)?;
        }
        Ok(())
    }

    fn parse_column_line<R: BufRead>(
        &mut self,
        reader: &mut R,
        line: &mut String,
        types: &[FieldType],
    ) -> Result<()> {
        line.clear();
        if reader.read_line(line)? == 0 {
            return Err(ParseError::MissingHeaderLine("#read_id...").into());
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        let rest = trimmed
            .strip_prefix('#')
            .ok_or(ParseError::MissingHeaderLine("#read_id..."))?;
        let names: Vec<&str> = rest.split(SEP).collect();
        if names.len() < PRIMARY_COLUMNS.len() || names[..PRIMARY_COLUMNS.len()] != PRIMARY_COLUMNS
        {
            return Err(ParseError::MissingHeaderLine("#read_id...").into());
        }
        let aux_names = &names[PRIMARY_COLUMNS.len()..];
        if aux_names.len() != types.len() {
            return Err(ParseError::ColumnHeaderMismatch {
                types: types.len(),
                names: aux_names.len(),
            }
            .into());
        }
        for (name, ty) in aux_names.iter().zip(types) {
            self.add_aux_field(name, *ty)?;
        }
        Ok(())
    }

    /// Serializes the binary preamble plus the length-prefixed header block.
    ///
    /// The block is one gzip member when `press` carries [`Method::Gzip`];
    /// the u32 prefix counts the block's on-disk bytes either way.
    pub fn write_binary<W: Write>(&self, writer: &mut W, press: &mut Press) -> Result<()> {
        let mut preamble = [0u8; PREAMBLE_SIZE];
        preamble[..6].copy_from_slice(&MAGIC);
        preamble[6] = self.version.0;
        preamble[7] = self.version.1;
        preamble[8] = self.version.2;
        preamble[9] = press.method().tag();
        LittleEndian::write_u32(&mut preamble[10..14], self.num_read_groups);
        writer.write_all(&preamble)?;

        let block = press.compress_now(&self.to_text())?;
        let mut prefix = [0u8; 4];
        LittleEndian::write_u32(&mut prefix, block.len() as u32);
        writer.write_all(&prefix)?;
        writer.write_all(&block)?;
        Ok(())
    }

    /// Parses the binary preamble and header block, returning the header and
    /// the file's compression method.
    pub fn from_binary_reader<R: Read>(reader: &mut R) -> Result<(Self, Method)> {
        let mut preamble = [0u8; PREAMBLE_SIZE];
        reader.read_exact(&mut preamble)?;
        if preamble[..6] != MAGIC {
            let mut magic = [0u8; 6];
            magic.copy_from_slice(&preamble[..6]);
            return Err(HeaderError::InvalidMagicBytes(magic).into());
        }
        let version = (preamble[6], preamble[7], preamble[8]);
        if version.0 != VERSION.0 || version.1 != VERSION.1 {
            return Err(
                HeaderError::UnsupportedVersion(version.0, version.1, version.2).into(),
            );
        }
        let method = Method::from_tag(preamble[9])?;
        let num_read_groups = LittleEndian::read_u32(&preamble[10..14]);

        let block_len = reader.read_u32::<LittleEndian>()? as usize;
        let mut block = vec![0u8; block_len];
        reader.read_exact(&mut block)?;
        let text = Press::decompress_one_shot(method, &block)?;

        let header = Self::from_text_reader(&mut text.as_slice())?;
        if header.num_read_groups != num_read_groups {
            return Err(
                HeaderError::ReadGroupCountMismatch(num_read_groups, header.num_read_groups)
                    .into(),
            );
        }
        Ok((header, method))
    }
}

fn read_kv_line<R: BufRead>(
    reader: &mut R,
    line: &mut String,
    key: &'static str,
) -> Result<String> {
    line.clear();
    if reader.read_line(line)? == 0 {
        return Err(ParseError::MissingHeaderLine(key).into());
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    let (head, value) = trimmed
        .split_once(SEP)
        .ok_or(ParseError::MissingHeaderLine(key))?;
    if head != key {
        return Err(ParseError::MissingHeaderLine(key).into());
    }
    Ok(value.to_string())
}

fn parse_version(s: &str) -> Result<(u8, u8, u8)> {
    let bad = || ParseError::InvalidNumericField {
        field: "file_version",
        value: s.to_string(),
    };
    let mut parts = s.split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let patch = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    if parts.next().is_some() {
        return Err(bad().into());
    }
    Ok((major, minor, patch))
}

fn parse_type_line(rest: &str) -> Result<Vec<FieldType>> {
    let tokens: Vec<&str> = rest.split(SEP).collect();
    if tokens.len() < PRIMARY_TYPES.len() || tokens[..PRIMARY_TYPES.len()] != PRIMARY_TYPES {
        return Err(ParseError::MissingHeaderLine("#<column types>").into());
    }
    tokens[PRIMARY_TYPES.len()..]
        .iter()
        .map(|token| Ok(FieldType::parse(token)?))
        .collect()
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::aux::Primitive;
    use crate::error::Error;

    fn two_group_header() -> Header {
        let mut header = Header::new(2).unwrap();
        header.add_attr("asic_id").unwrap();
        header.set_attr("asic_id", "3574887596", 0).unwrap();
        header.set_attr("asic_id", "420170566", 1).unwrap();
        header
    }

    #[test]
    fn test_attr_lookup() {
        let header = two_group_header();
        assert_eq!(header.attr("asic_id", 1).unwrap(), Some("420170566"));
        assert!(matches!(
            header.attr("asic_id", 5),
            Err(Error::HeaderError(HeaderError::ReadGroupOutOfRange(5, 2)))
        ));
        assert!(matches!(
            header.attr("flow_cell_id", 0),
            Err(Error::HeaderError(HeaderError::AttributeNotFound(_)))
        ));
    }

    #[test]
    fn test_duplicate_attr_distinct_from_missing() {
        let mut header = two_group_header();
        assert!(matches!(
            header.add_attr("asic_id"),
            Err(Error::HeaderError(HeaderError::DuplicateAttribute(_)))
        ));
    }

    #[test]
    fn test_schema_symmetry_either_order() {
        // add_read_group then add_attr
        let mut a = Header::new(1).unwrap();
        a.add_read_group();
        a.add_attr("run_id").unwrap();
        // add_attr then add_read_group
        let mut b = Header::new(1).unwrap();
        b.add_attr("run_id").unwrap();
        b.add_read_group();

        for header in [&a, &b] {
            assert_eq!(header.num_read_groups(), 2);
            assert_eq!(header.attr("run_id", 0).unwrap(), None);
            assert_eq!(header.attr("run_id", 1).unwrap(), None);
        }
    }

    #[test]
    fn test_text_round_trip() {
        let mut header = two_group_header();
        header
            .add_aux_field("median_before", FieldType::Scalar(Primitive::Double))
            .unwrap();
        header
            .add_aux_field("channel_number", FieldType::Array(Primitive::Char))
            .unwrap();
        let text = header.to_text();
        let parsed = Header::from_text_reader(&mut text.as_slice()).unwrap();
        assert_eq!(parsed.num_read_groups(), 2);
        assert_eq!(parsed.attr("asic_id", 0).unwrap(), Some("3574887596"));
        assert_eq!(parsed.aux_names(), header.aux_names());
        assert_eq!(parsed.aux_types(), header.aux_types());
        assert_eq!(parsed.version(), VERSION);
    }

    #[test]
    fn test_parse_scenario_block() {
        let text = b"#file_format\tslow5\n\
                     #file_version\t0.1.0\n\
                     #num_read_groups\t2\n\
                     @asic_id\t3574887596\t420170566\n\
                     #char*\tuint32_t\tfloat\tdouble\tdouble\tdouble\tuint64_t\tint16_t*\n\
                     #read_id\tread_group\tdigitisation\toffset\trange\tsampling_rate\tlen_raw_signal\traw_signal\n";
        let header = Header::from_text_reader(&mut text.as_slice()).unwrap();
        assert_eq!(header.attr("asic_id", 1).unwrap(), Some("420170566"));
        assert!(header.attr("asic_id", 5).is_err());
    }

    #[test]
    fn test_attr_arity_mismatch() {
        let text = b"#file_format\tslow5\n\
                     #file_version\t0.1.0\n\
                     #num_read_groups\t2\n\
                     @asic_id\t3574887596\n\
                     #char*\tuint32_t\tfloat\tdouble\tdouble\tdouble\tuint64_t\tint16_t*\n\
                     #read_id\tread_group\tdigitisation\toffset\trange\tsampling_rate\tlen_raw_signal\traw_signal\n";
        let err = Header::from_text_reader(&mut text.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            Error::ParseError(ParseError::AttributeArityMismatch { .. })
        ));
    }

    #[test]
    fn test_binary_round_trip() {
        for method in [Method::None, Method::Gzip] {
            let mut header = two_group_header();
            header.set_format(Format::Binary);
            header
                .add_aux_field("read_number", FieldType::Scalar(Primitive::Int32))
                .unwrap();

            let mut out = Vec::new();
            let mut press = Press::new(method);
            header.write_binary(&mut out, &mut press).unwrap();

            // length prefix counts exactly the on-disk bytes that follow it
            let block_len = LittleEndian::read_u32(&out[PREAMBLE_SIZE..PREAMBLE_SIZE + 4]);
            assert_eq!(out.len(), PREAMBLE_SIZE + 4 + block_len as usize);

            let (parsed, parsed_method) =
                Header::from_binary_reader(&mut out.as_slice()).unwrap();
            assert_eq!(parsed_method, method);
            assert_eq!(parsed.num_read_groups(), 2);
            assert_eq!(parsed.attr("asic_id", 1).unwrap(), Some("420170566"));
            assert_eq!(parsed.aux_names(), header.aux_names());
        }
    }

    #[test]
    fn test_binary_bad_magic() {
        let mut out = Vec::new();
        let mut press = Press::new(Method::None);
        let mut header = two_group_header();
        header.set_format(Format::Binary);
        header.write_binary(&mut out, &mut press).unwrap();
        out[0] = b'X';
        let err = Header::from_binary_reader(&mut out.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            Error::HeaderError(HeaderError::InvalidMagicBytes(_))
        ));
    }

    #[test]
    fn test_no_read_groups_rejected() {
        assert!(matches!(
            Header::new(0),
            Err(Error::HeaderError(HeaderError::NoReadGroups))
        ));
    }
}
