#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use majsoul_asset_manager::catalog::Catalog;
use majsoul_asset_manager::endpoint::{GameServer, GameVersion, RemoteClient};
use majsoul_asset_manager::error::AssetError;
use majsoul_asset_manager::version::Version;

// --- protobuf wire encoding, enough to author metadata containers ---

pub fn push_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

pub fn push_len_delimited(buf: &mut Vec<u8>, number: u32, payload: &[u8]) {
    push_varint(buf, (u64::from(number) << 3) | 2);
    push_varint(buf, payload.len() as u64);
    buf.extend_from_slice(payload);
}

pub fn push_str(buf: &mut Vec<u8>, number: u32, text: &str) {
    push_len_delimited(buf, number, text.as_bytes());
}

pub fn push_int(buf: &mut Vec<u8>, number: u32, value: u64) {
    push_varint(buf, u64::from(number) << 3);
    push_varint(buf, value);
}

pub fn field_blob(name: &str, index: u64, pb_type: &str, array_length: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    push_str(&mut buf, 1, name);
    push_int(&mut buf, 2, index);
    push_str(&mut buf, 3, pb_type);
    push_int(&mut buf, 4, array_length);
    buf
}

pub fn sheet_blob(name: &str, fields: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    push_str(&mut buf, 1, name);
    for field in fields {
        push_len_delimited(&mut buf, 2, field);
    }
    buf
}

pub fn schema_blob(name: &str, sheets: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    push_str(&mut buf, 1, name);
    for sheet in sheets {
        push_len_delimited(&mut buf, 2, sheet);
    }
    buf
}

pub fn data_blob(table: &str, sheet: &str, rows: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    push_str(&mut buf, 1, table);
    push_str(&mut buf, 2, sheet);
    for row in rows {
        push_len_delimited(&mut buf, 3, row);
    }
    buf
}

pub fn container_blob(schemas: &[Vec<u8>], datas: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for schema in schemas {
        push_len_delimited(&mut buf, 1, schema);
    }
    for data in datas {
        push_len_delimited(&mut buf, 2, data);
    }
    buf
}

/// A metadata container holding one title, `title/5.png` named Champion.
pub fn champion_title_container() -> Vec<u8> {
    let sheet = sheet_blob(
        "title",
        &[
            field_blob("icon", 1, "string", 0),
            field_blob("icon_item", 2, "string", 0),
            field_blob("name_en", 3, "string", 0),
            field_blob("name_jp", 4, "string", 0),
        ],
    );
    let schema = schema_blob("item_definition", &[sheet]);

    let mut row = Vec::new();
    push_str(&mut row, 1, "title/5.png");
    push_str(&mut row, 2, "title/5.png");
    push_str(&mut row, 3, "Champion");
    push_str(&mut row, 4, "王者");
    let data = data_blob("item_definition", "title", &[row]);

    container_blob(&[schema], &[data])
}

// --- transport mock, writing real files under create-new semantics ---

#[derive(Default)]
pub struct MockRemote {
    pub version: String,
    pub catalog: Catalog,
    pub blob: Vec<u8>,
    pub sizes: HashMap<String, i64>,
    pub bodies: HashMap<String, Vec<u8>>,
    pub transfers: Mutex<Vec<String>>,
    pub blob_fetches: Mutex<usize>,
}

impl MockRemote {
    pub fn with_catalog(version: &str, catalog: Catalog) -> Self {
        Self {
            version: version.to_string(),
            catalog,
            ..Self::default()
        }
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }
}

impl RemoteClient for MockRemote {
    fn fetch_version(&self, _server: GameServer) -> Result<GameVersion, AssetError> {
        let version: Version = self.version.parse()?;
        Ok(GameVersion {
            force_version: version.clone(),
            version,
            code: String::new(),
        })
    }

    fn fetch_catalog(
        &self,
        _server: GameServer,
        _version: &Version,
    ) -> Result<Catalog, AssetError> {
        Ok(self.catalog.clone())
    }

    fn fetch_blob(
        &self,
        _resource: &majsoul_asset_manager::catalog::Resource,
    ) -> Result<Vec<u8>, AssetError> {
        *self.blob_fetches.lock().unwrap() += 1;
        Ok(self.blob.clone())
    }

    fn remote_size(&self, url: &str) -> i64 {
        self.sizes.get(url).copied().unwrap_or(-1)
    }

    fn download_to_file(&self, url: &str, destination: &Path) -> Result<(), AssetError> {
        self.transfers.lock().unwrap().push(url.to_string());
        let body = self
            .bodies
            .get(url)
            .cloned()
            .unwrap_or_else(|| b"data".to_vec());
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .map_err(|err| match err.kind() {
                io::ErrorKind::AlreadyExists => {
                    AssetError::DestinationConflict(destination.display().to_string())
                }
                _ => AssetError::Filesystem(err.to_string()),
            })?;
        io::Write::write_all(&mut file, &body)
            .map_err(|err| AssetError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
