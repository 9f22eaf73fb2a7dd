use indexmap::IndexMap;

use crate::error::AssetError;
use crate::schema::{FieldDescriptor, FieldType, Record, RecordType, SchemaRegistry, Value};

/// Every decoded data table, keyed by its synthesized `{table}_{sheet}`
/// name. Immutable once produced.
pub type Metadata = IndexMap<String, Vec<Record>>;

const CONFIG_TABLES: &str = "ConfigTables";

fn descriptor(name: &str, number: u32, kind: FieldType, repeated: bool) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        number,
        kind,
        repeated,
    }
}

/// The compiled bootstrap schema: the container message whose `schemas`
/// entries describe every sheet's field list and whose `datas` entries
/// carry the per-sheet row blobs.
pub fn bootstrap_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register(RecordType::new(
        "Field",
        vec![
            descriptor("field_name", 1, FieldType::String, false),
            descriptor("pb_index", 2, FieldType::Int32, false),
            descriptor("pb_type", 3, FieldType::String, false),
            descriptor("array_length", 4, FieldType::Int32, false),
        ],
    ));
    registry.register(RecordType::new(
        "Sheet",
        vec![
            descriptor("name", 1, FieldType::String, false),
            descriptor("fields", 2, FieldType::Message("Field".to_string()), true),
        ],
    ));
    registry.register(RecordType::new(
        "Schema",
        vec![
            descriptor("name", 1, FieldType::String, false),
            descriptor("sheets", 2, FieldType::Message("Sheet".to_string()), true),
        ],
    ));
    registry.register(RecordType::new(
        "Data",
        vec![
            descriptor("table", 1, FieldType::String, false),
            descriptor("sheet", 2, FieldType::String, false),
            descriptor("data", 3, FieldType::Bytes, true),
        ],
    ));
    registry.register(RecordType::new(
        CONFIG_TABLES,
        vec![
            descriptor("schemas", 1, FieldType::Message("Schema".to_string()), true),
            descriptor("datas", 2, FieldType::Message("Data".to_string()), true),
        ],
    ));
    registry
}

pub fn str_field<'a>(record: &'a Record, name: &str) -> &'a str {
    record.get(name).and_then(Value::as_str).unwrap_or("")
}

pub fn int_field(record: &Record, name: &str) -> Option<i64> {
    record.get(name).and_then(Value::as_i64)
}

pub fn record_list<'a>(record: &'a Record, name: &str) -> impl Iterator<Item = &'a Record> {
    record
        .get(name)
        .and_then(Value::as_list)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_record)
}

/// Decodes the metadata container. Registers a record type for every
/// `(table, sheet)` pair before touching any data entry, since entries may
/// reference sheets in arbitrary order, then decodes every row blob against
/// its synthesized type. Any failure here is fatal for the run.
pub fn decode_metadata(blob: &[u8]) -> Result<Metadata, AssetError> {
    tracing::info!("decoding game metadata");
    let mut registry = bootstrap_registry();
    let tables = registry.decode(CONFIG_TABLES, blob)?;

    for schema in record_list(&tables, "schemas") {
        let table = str_field(schema, "name");
        for sheet in record_list(schema, "sheets") {
            let type_name = format!("{table}_{}", str_field(sheet, "name"));
            let mut fields = Vec::new();
            for field in record_list(sheet, "fields") {
                let name = str_field(field, "field_name");
                let number = int_field(field, "pb_index").unwrap_or(0);
                if name.is_empty() || number <= 0 || number > i64::from(u32::MAX) {
                    return Err(AssetError::MalformedDescriptor {
                        sheet: type_name,
                        message: format!("field {name:?} with index {number}"),
                    });
                }
                fields.push(FieldDescriptor {
                    name: name.to_string(),
                    number: number as u32,
                    kind: FieldType::parse(str_field(field, "pb_type")),
                    repeated: int_field(field, "array_length").unwrap_or(0) > 0,
                });
            }
            registry.register(RecordType::new(type_name, fields));
        }
    }

    // Registration is complete; the registry is only read from here on.
    let registry = registry;
    let mut metadata = Metadata::new();
    for data in record_list(&tables, "datas") {
        let type_name = format!(
            "{}_{}",
            str_field(data, "table"),
            str_field(data, "sheet")
        );
        if !registry.contains(&type_name) {
            return Err(AssetError::UnknownRecordType(type_name));
        }
        let rows = data
            .get("data")
            .and_then(Value::as_list)
            .unwrap_or(&[])
            .iter()
            .filter_map(Value::as_bytes)
            .map(|row| {
                registry
                    .decode(&type_name, row)
                    .map_err(|err| AssetError::TableDecode {
                        table: type_name.clone(),
                        message: err.to_string(),
                    })
            })
            .collect::<Result<Vec<Record>, AssetError>>()?;
        metadata.insert(type_name, rows);
    }
    Ok(metadata)
}

pub fn metadata_to_json(metadata: &Metadata) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = metadata
        .iter()
        .map(|(name, rows)| {
            let rows = rows.iter().map(crate::schema::record_to_json).collect();
            (name.clone(), serde_json::Value::Array(rows))
        })
        .collect();
    serde_json::Value::Object(map)
}
