use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::catalog::{Catalog, Language, Resource};
use crate::error::AssetError;
use crate::version::Version;
use crate::xor::{XorReader, is_encrypted};

/// Download endpoints per game server. EN and KR share the yo-star host,
/// both Chinese territories share the mainland host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameServer {
    En,
    Kr,
    Cn,
    Jp,
}

pub const DEFAULT_GAME_SERVER: GameServer = GameServer::En;

impl GameServer {
    pub fn base_url(self) -> &'static str {
        match self {
            GameServer::En | GameServer::Kr => "https://mahjongsoul.game.yo-star.com",
            GameServer::Cn => "https://game.maj-soul.com/1",
            GameServer::Jp => "https://game.mahjongsoul.com",
        }
    }
}

pub fn server_for_language(language: Language) -> GameServer {
    match language {
        Language::En => GameServer::En,
        Language::Kr => GameServer::Kr,
        Language::Jp => GameServer::Jp,
        Language::Chs | Language::ChsT => GameServer::Cn,
    }
}

pub fn version_url(server: GameServer) -> String {
    format!("{}/version.json?randv={}", server.base_url(), cache_buster())
}

pub fn resversion_url(server: GameServer, version: &Version) -> String {
    format!("{}/resversion{version}.json", server.base_url())
}

pub fn resource_url_on(server: GameServer, resource: &Resource) -> String {
    format!(
        "{}/v{}/{}",
        server.base_url(),
        resource.version,
        resource.remote_path
    )
}

pub fn resource_url(resource: &Resource) -> String {
    resource_url_on(server_for_language(resource.language), resource)
}

/// 16-digit cache-busting token for the version endpoint, which sits
/// behind an aggressive CDN.
fn cache_buster() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    format!("{:016}", nanos % 10_000_000_000_000_000)
}

#[derive(Debug, Clone)]
pub struct GameVersion {
    pub version: Version,
    pub force_version: Version,
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct VersionDocument {
    version: String,
    force_version: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct ResversionDocument {
    res: indexmap::IndexMap<String, ResversionEntry>,
}

#[derive(Debug, Deserialize)]
struct ResversionEntry {
    prefix: String,
}

pub fn parse_game_version(document: serde_json::Value) -> Result<GameVersion, AssetError> {
    let document: VersionDocument = serde_json::from_value(document)
        .map_err(|err| AssetError::CatalogParse(err.to_string()))?;
    Ok(GameVersion {
        version: document.version.parse()?,
        force_version: document.force_version.parse()?,
        code: document.code,
    })
}

/// Parses a resversion document into a catalog sorted by the fixed
/// language priority, so later conflict outcomes are deterministic.
pub fn parse_catalog(document: serde_json::Value) -> Result<Catalog, AssetError> {
    let document: ResversionDocument = serde_json::from_value(document)
        .map_err(|err| AssetError::CatalogParse(err.to_string()))?;
    let mut catalog = document
        .res
        .into_iter()
        .map(|(path, entry)| {
            Ok(Resource {
                language: Language::of_path(&path),
                version: entry.prefix.parse()?,
                remote_path: path,
            })
        })
        .collect::<Result<Catalog, AssetError>>()?;
    catalog.sort_by_key(|resource| resource.language);
    Ok(catalog)
}

/// Remote access seam for the whole pipeline; everything the core needs
/// from the network and nothing more.
pub trait RemoteClient: Send + Sync {
    fn fetch_version(&self, server: GameServer) -> Result<GameVersion, AssetError>;

    fn fetch_catalog(&self, server: GameServer, version: &Version) -> Result<Catalog, AssetError>;

    /// Fetches one resource wholesale, pinned to the default server.
    fn fetch_blob(&self, resource: &Resource) -> Result<Vec<u8>, AssetError>;

    /// Size of the remote resource, or -1 when it cannot be determined.
    fn remote_size(&self, url: &str) -> i64;

    /// Streams the body at `url` into a freshly created file. Fails if the
    /// destination already exists; the filesystem is the final arbiter
    /// against racing jobs.
    fn download_to_file(&self, url: &str, destination: &Path) -> Result<(), AssetError>;
}

pub struct HttpRemoteClient {
    client: Client,
}

impl HttpRemoteClient {
    pub fn new() -> Result<Self, AssetError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/104.0.0.0 Safari/537.36",
            ),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| AssetError::CatalogHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, AssetError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        Err(AssetError::CatalogStatus { status, message })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<reqwest::blocking::Response, AssetError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(AssetError::CatalogHttp(err.to_string()));
                }
            }
        }
    }
}

impl RemoteClient for HttpRemoteClient {
    fn fetch_version(&self, server: GameServer) -> Result<GameVersion, AssetError> {
        tracing::info!("fetching game version");
        let url = version_url(server);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let document = response
            .json()
            .map_err(|err| AssetError::CatalogParse(err.to_string()))?;
        parse_game_version(document)
    }

    fn fetch_catalog(&self, server: GameServer, version: &Version) -> Result<Catalog, AssetError> {
        tracing::info!(%version, "fetching resource catalog");
        let url = resversion_url(server, version);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let document = response
            .json()
            .map_err(|err| AssetError::CatalogParse(err.to_string()))?;
        parse_catalog(document)
    }

    fn fetch_blob(&self, resource: &Resource) -> Result<Vec<u8>, AssetError> {
        let url = resource_url_on(DEFAULT_GAME_SERVER, resource);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| AssetError::CatalogHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn remote_size(&self, url: &str) -> i64 {
        let Ok(response) = self.client.head(url).send() else {
            return -1;
        };
        if !response.status().is_success() {
            return -1;
        }

        // the CDN image pipeline rewrites bodies; its header carries the
        // original size that on-disk files will have
        if let Some(size) = response
            .headers()
            .get("cf-polished")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_cf_polished(value).get("origSize").cloned())
            .and_then(|value| value.parse::<i64>().ok())
        {
            return size;
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(-1)
    }

    fn download_to_file(&self, url: &str, destination: &Path) -> Result<(), AssetError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| AssetError::DownloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AssetError::DownloadHttp(format!(
                "status {} for {url}",
                response.status().as_u16()
            )));
        }

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

        let copied = if is_encrypted(url) {
            io::copy(&mut XorReader::new(response), &mut file)
        } else {
            let mut response = response;
            io::copy(&mut response, &mut file)
        };

        if let Err(err) = copied {
            // a partial body must never stand in for the destination
            drop(file);
            let _ = fs::remove_file(destination);
            return Err(AssetError::DownloadHttp(err.to_string()));
        }
        Ok(())
    }
}

fn parse_cf_polished(header: &str) -> std::collections::HashMap<String, String> {
    header
        .split(',')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
