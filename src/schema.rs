use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::AssetError;
use crate::wire::{WireReader, WireType, decode_zigzag32, decode_zigzag64};

/// Declared type of a record field. Scalar names map to the protobuf
/// scalar set; any other name refers to another registered record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Bool,
    Enum,
    Fixed32,
    Sfixed32,
    Float,
    Fixed64,
    Sfixed64,
    Double,
    String,
    Bytes,
    Message(String),
}

impl FieldType {
    pub fn parse(name: &str) -> FieldType {
        match name {
            "int32" => FieldType::Int32,
            "int64" => FieldType::Int64,
            "uint32" => FieldType::Uint32,
            "uint64" => FieldType::Uint64,
            "sint32" => FieldType::Sint32,
            "sint64" => FieldType::Sint64,
            "bool" => FieldType::Bool,
            "enum" => FieldType::Enum,
            "fixed32" => FieldType::Fixed32,
            "sfixed32" => FieldType::Sfixed32,
            "float" => FieldType::Float,
            "fixed64" => FieldType::Fixed64,
            "sfixed64" => FieldType::Sfixed64,
            "double" => FieldType::Double,
            "string" => FieldType::String,
            "bytes" => FieldType::Bytes,
            other => FieldType::Message(other.to_string()),
        }
    }

    /// Numeric scalars may arrive packed inside one length-delimited field.
    fn packable(&self) -> bool {
        !matches!(
            self,
            FieldType::String | FieldType::Bytes | FieldType::Message(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub kind: FieldType,
    pub repeated: bool,
}

/// An ordered field list under a registered type name.
#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: String,
    fields: Vec<FieldDescriptor>,
    by_number: HashMap<u32, usize>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        let by_number = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.number, index))
            .collect();
        Self {
            name: name.into(),
            fields,
            by_number,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number).map(|index| &self.fields[*index])
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Double(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Record(Record),
    List(Vec<Value>),
}

/// A decoded record, preserving declared field order.
pub type Record = IndexMap<String, Value>;

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Uint(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Uint(value) => serde_json::Value::from(*value),
            Value::Double(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(value) => serde_json::Value::from(*value),
            Value::Str(text) => serde_json::Value::from(text.as_str()),
            Value::Bytes(bytes) => {
                serde_json::Value::from(String::from_utf8_lossy(bytes).into_owned())
            }
            Value::Record(record) => record_to_json(record),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

pub fn record_to_json(record: &Record) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = record
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    serde_json::Value::Object(map)
}

/// Registry of record types, keyed by name. Populated once per decode
/// session from the bootstrap schema plus every synthesized sheet type,
/// then only read.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: HashMap<String, RecordType>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, record_type: RecordType) {
        self.types.insert(record_type.name.clone(), record_type);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn decode(&self, type_name: &str, buf: &[u8]) -> Result<Record, AssetError> {
        let record_type = self
            .types
            .get(type_name)
            .ok_or_else(|| AssetError::UnknownRecordType(type_name.to_string()))?;

        let mut record = Record::new();
        let mut reader = WireReader::new(buf);
        while !reader.at_end() {
            let (number, wire_type) = reader.read_tag()?;
            let Some(field) = record_type.field_by_number(number) else {
                reader.skip(wire_type)?;
                continue;
            };

            if field.repeated {
                let slot = record
                    .entry(field.name.clone())
                    .or_insert_with(|| Value::List(Vec::new()));
                let Value::List(items) = slot else {
                    unreachable!("repeated field slot is always a list");
                };
                if wire_type == WireType::LengthDelimited && field.kind.packable() {
                    let payload = reader.read_bytes()?;
                    let mut packed = WireReader::new(payload);
                    while !packed.at_end() {
                        items.push(self.read_packed_scalar(&field.kind, &mut packed)?);
                    }
                } else {
                    items.push(self.read_value(&field.kind, wire_type, &mut reader)?);
                }
            } else {
                let value = self.read_value(&field.kind, wire_type, &mut reader)?;
                record.insert(field.name.clone(), value);
            }
        }
        Ok(record)
    }

    fn read_value(
        &self,
        kind: &FieldType,
        wire_type: WireType,
        reader: &mut WireReader<'_>,
    ) -> Result<Value, AssetError> {
        match kind {
            FieldType::String => {
                expect_wire(kind, wire_type, WireType::LengthDelimited)?;
                let bytes = reader.read_bytes()?;
                Ok(Value::Str(String::from_utf8_lossy(bytes).into_owned()))
            }
            FieldType::Bytes => {
                expect_wire(kind, wire_type, WireType::LengthDelimited)?;
                Ok(Value::Bytes(reader.read_bytes()?.to_vec()))
            }
            FieldType::Message(name) => {
                expect_wire(kind, wire_type, WireType::LengthDelimited)?;
                let bytes = reader.read_bytes()?;
                Ok(Value::Record(self.decode(name, bytes)?))
            }
            scalar => {
                let expected = scalar_wire_type(scalar);
                expect_wire(scalar, wire_type, expected)?;
                self.read_packed_scalar(scalar, reader)
            }
        }
    }

    /// Reads one scalar assuming the reader is positioned on its raw
    /// encoding, as inside a packed payload.
    fn read_packed_scalar(
        &self,
        kind: &FieldType,
        reader: &mut WireReader<'_>,
    ) -> Result<Value, AssetError> {
        match kind {
            FieldType::Int32 | FieldType::Int64 => Ok(Value::Int(reader.read_varint()? as i64)),
            FieldType::Uint32 | FieldType::Uint64 => Ok(Value::Uint(reader.read_varint()?)),
            FieldType::Sint32 => Ok(Value::Int(i64::from(decode_zigzag32(
                reader.read_varint()?,
            )))),
            FieldType::Sint64 => Ok(Value::Int(decode_zigzag64(reader.read_varint()?))),
            FieldType::Bool => Ok(Value::Bool(reader.read_varint()? != 0)),
            FieldType::Enum => Ok(Value::Int(reader.read_varint()? as i64)),
            FieldType::Fixed32 => Ok(Value::Uint(u64::from(reader.read_fixed32()?))),
            FieldType::Sfixed32 => Ok(Value::Int(i64::from(reader.read_fixed32()? as i32))),
            FieldType::Float => Ok(Value::Double(f64::from(f32::from_bits(
                reader.read_fixed32()?,
            )))),
            FieldType::Fixed64 => Ok(Value::Uint(reader.read_fixed64()?)),
            FieldType::Sfixed64 => Ok(Value::Int(reader.read_fixed64()? as i64)),
            FieldType::Double => Ok(Value::Double(f64::from_bits(reader.read_fixed64()?))),
            FieldType::String | FieldType::Bytes | FieldType::Message(_) => Err(
                AssetError::WireFormat("length-delimited type inside packed payload".to_string()),
            ),
        }
    }
}

fn scalar_wire_type(kind: &FieldType) -> WireType {
    match kind {
        FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => WireType::Fixed32,
        FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => WireType::Fixed64,
        _ => WireType::Varint,
    }
}

fn expect_wire(
    kind: &FieldType,
    actual: WireType,
    expected: WireType,
) -> Result<(), AssetError> {
    if actual == expected {
        Ok(())
    } else {
        Err(AssetError::WireFormat(format!(
            "wire type {actual:?} does not match field type {kind:?}"
        )))
    }
}
