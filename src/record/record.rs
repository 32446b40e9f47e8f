use std::collections::HashMap;

use crate::aux::AuxValue;
use crate::error::{AuxError, Result, WriteError};
use crate::header::Header;

/// One signal-acquisition event.
///
/// Primary fields are fixed and ordered; the auxiliary map is open but every
/// name used must be declared in the file header with a fixed type. A record
/// is constructed fresh per read or write call and owned solely by the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) read_id: String,
    pub(crate) read_group: u32,
    pub(crate) digitisation: f32,
    pub(crate) offset: f64,
    pub(crate) range: f64,
    pub(crate) sampling_rate: f64,
    pub(crate) raw_signal: Vec<i16>,
    pub(crate) aux: HashMap<String, AuxValue>,
}
impl Record {
    /// Starts building a record with the given identifier.
    #[must_use]
    pub fn builder(read_id: &str) -> RecordBuilder {
        RecordBuilder::new(read_id)
    }

    #[must_use]
    pub fn read_id(&self) -> &str {
        &self.read_id
    }

    #[must_use]
    pub fn read_group(&self) -> u32 {
        self.read_group
    }

    #[must_use]
    pub fn digitisation(&self) -> f32 {
        self.digitisation
    }

    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[must_use]
    pub fn range(&self) -> f64 {
        self.range
    }

    #[must_use]
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Number of samples in the raw signal.
    #[must_use]
    pub fn len_raw_signal(&self) -> u64 {
        self.raw_signal.len() as u64
    }

    #[must_use]
    pub fn raw_signal(&self) -> &[i16] {
        &self.raw_signal
    }

    /// Converts the raw samples to picoamps using the record's calibration
    /// constants: `pA = (raw + offset) * range / digitisation`.
    pub fn signal_pa(&self) -> impl Iterator<Item = f64> + '_ {
        let scale = self.range / f64::from(self.digitisation);
        self.raw_signal
            .iter()
            .map(move |&raw| (f64::from(raw) + self.offset) * scale)
    }

    /// Attaches an auxiliary value. The name must be declared in the file
    /// header before the record is encoded.
    pub fn set_aux(&mut self, name: &str, value: AuxValue) {
        self.aux.insert(name.to_string(), value);
    }

    /// Looks up an auxiliary value by name.
    ///
    /// A missing field is a lookup error, never a zero or empty value.
    pub fn aux(&self, name: &str) -> Result<&AuxValue> {
        self.aux
            .get(name)
            .ok_or_else(|| AuxError::FieldNotFound(name.to_string()).into())
    }

    fn typed_aux<'a, T>(
        &'a self,
        name: &str,
        requested: &'static str,
        get: impl Fn(&'a AuxValue) -> Option<T>,
    ) -> Result<T> {
        let value = self.aux(name)?;
        get(value).ok_or_else(|| {
            AuxError::TypeMismatch {
                field: name.to_string(),
                declared: value.field_type().name(),
                requested,
            }
            .into()
        })
    }

    pub fn aux_i8(&self, name: &str) -> Result<i8> {
        self.typed_aux(name, "int8_t", AuxValue::as_i8)
    }

    pub fn aux_i16(&self, name: &str) -> Result<i16> {
        self.typed_aux(name, "int16_t", AuxValue::as_i16)
    }

    pub fn aux_i32(&self, name: &str) -> Result<i32> {
        self.typed_aux(name, "int32_t", AuxValue::as_i32)
    }

    pub fn aux_i64(&self, name: &str) -> Result<i64> {
        self.typed_aux(name, "int64_t", AuxValue::as_i64)
    }

    pub fn aux_u8(&self, name: &str) -> Result<u8> {
        self.typed_aux(name, "uint8_t", AuxValue::as_u8)
    }

    pub fn aux_u16(&self, name: &str) -> Result<u16> {
        self.typed_aux(name, "uint16_t", AuxValue::as_u16)
    }

    pub fn aux_u32(&self, name: &str) -> Result<u32> {
        self.typed_aux(name, "uint32_t", AuxValue::as_u32)
    }

    pub fn aux_u64(&self, name: &str) -> Result<u64> {
        self.typed_aux(name, "uint64_t", AuxValue::as_u64)
    }

    pub fn aux_f32(&self, name: &str) -> Result<f32> {
        self.typed_aux(name, "float", AuxValue::as_f32)
    }

    pub fn aux_f64(&self, name: &str) -> Result<f64> {
        self.typed_aux(name, "double", AuxValue::as_f64)
    }

    pub fn aux_char(&self, name: &str) -> Result<u8> {
        self.typed_aux(name, "char", AuxValue::as_char)
    }

    pub fn aux_str(&self, name: &str) -> Result<&str> {
        self.typed_aux(name, "char*", AuxValue::as_str)
    }

    /// Resolves this record's auxiliary values in the header's declared
    /// order, enforcing the schema: every declared field present with its
    /// declared type, and no undeclared stragglers.
    pub(crate) fn aux_in_schema_order<'a>(&'a self, header: &Header) -> Result<Vec<&'a AuxValue>> {
        let mut ordered = Vec::with_capacity(header.aux_names().len());
        for (name, ty) in header.aux_names().iter().zip(header.aux_types()) {
            let value = self
                .aux
                .get(name)
                .ok_or_else(|| WriteError::MissingAuxField(name.clone()))?;
            if value.field_type() != *ty {
                return Err(WriteError::AuxTypeMismatch {
                    field: name.clone(),
                    declared: ty.name(),
                    got: value.field_type().name(),
                }
                .into());
            }
            ordered.push(value);
        }
        if self.aux.len() != ordered.len() {
            let undeclared = self
                .aux
                .keys()
                .find(|name| !header.aux_names().contains(name))
                .cloned()
                .unwrap_or_default();
            return Err(WriteError::UndeclaredAuxField(undeclared).into());
        }
        Ok(ordered)
    }
}

/// Builder for [`Record`].
#[derive(Debug, Default, Clone)]
pub struct RecordBuilder {
    read_id: String,
    read_group: u32,
    digitisation: f32,
    offset: f64,
    range: f64,
    sampling_rate: f64,
    raw_signal: Vec<i16>,
    aux: HashMap<String, AuxValue>,
}
impl RecordBuilder {
    #[must_use]
    pub fn new(read_id: &str) -> Self {
        Self {
            read_id: read_id.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn read_group(mut self, read_group: u32) -> Self {
        self.read_group = read_group;
        self
    }

    #[must_use]
    pub fn digitisation(mut self, digitisation: f32) -> Self {
        self.digitisation = digitisation;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn sampling_rate(mut self, sampling_rate: f64) -> Self {
        self.sampling_rate = sampling_rate;
        self
    }

    #[must_use]
    pub fn raw_signal(mut self, raw_signal: Vec<i16>) -> Self {
        self.raw_signal = raw_signal;
        self
    }

    #[must_use]
    pub fn aux(mut self, name: &str, value: AuxValue) -> Self {
        self.aux.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn build(self) -> Record {
        Record {
            read_id: self.read_id,
            read_group: self.read_group,
            digitisation: self.digitisation,
            offset: self.offset,
            range: self.range,
            sampling_rate: self.sampling_rate,
            raw_signal: self.raw_signal,
            aux: self.aux,
        }
    }
}
