use camino::{Utf8Path, Utf8PathBuf};

use crate::catalog::{find_metadata_resource, find_schema_resource, resources_newer_than};
use crate::endpoint::{DEFAULT_GAME_SERVER, RemoteClient};
use crate::error::AssetError;
use crate::job::{ConflictPolicy, JobResult, build_jobs, process_jobs};
use crate::mapping::{MappingTable, build_mappings};
use crate::metadata::{decode_metadata, metadata_to_json};
use crate::output::{ProgressSink, write_json_dump};
use crate::version::Version;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output: Utf8PathBuf,
    pub max_version: Option<Version>,
    pub min_version: Option<Version>,
    pub jobs: usize,
    pub conflict_policy: ConflictPolicy,
    pub dry_run: bool,
    pub remap: bool,
    pub dump_metadata: bool,
    pub dump_mappings: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: Utf8PathBuf::from("./assets"),
            max_version: None,
            min_version: None,
            jobs: 1,
            conflict_policy: ConflictPolicy::FileSuffix,
            dry_run: false,
            remap: true,
            dump_metadata: false,
            dump_mappings: false,
        }
    }
}

pub struct App<C: RemoteClient> {
    client: C,
}

impl<C: RemoteClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Runs the whole pipeline: catalog fetch, metadata decode, mapping
    /// build, job construction, then the download pool. Returns one result
    /// per processed resource in catalog order.
    pub fn run(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<JobResult>, AssetError> {
        let max_version = match &options.max_version {
            Some(version) => version.clone(),
            None => self.client.fetch_version(DEFAULT_GAME_SERVER)?.version,
        };

        let catalog = self
            .client
            .fetch_catalog(DEFAULT_GAME_SERVER, &max_version)?;
        // a catalog without the schema definition is an incompatible revision
        find_schema_resource(&catalog)?;

        let mappings = if options.remap {
            Some(self.build_mapping_table(&catalog, options)?)
        } else {
            None
        };

        let catalog = match &options.min_version {
            Some(floor) => resources_newer_than(catalog, floor),
            None => catalog,
        };

        let jobs = build_jobs(
            &catalog,
            &options.output,
            options.conflict_policy,
            mappings.as_ref(),
        );
        Ok(process_jobs(
            &self.client,
            &jobs,
            options.jobs,
            options.dry_run,
            sink,
        ))
    }

    fn build_mapping_table(
        &self,
        catalog: &[crate::catalog::Resource],
        options: &RunOptions,
    ) -> Result<MappingTable, AssetError> {
        tracing::info!("fetching game metadata");
        let blob_resource = find_metadata_resource(catalog)?;
        let blob = self.client.fetch_blob(blob_resource)?;
        let metadata = decode_metadata(&blob)?;

        if options.dump_metadata {
            let path = Utf8Path::new("metadata.json");
            tracing::info!("dumping metadata to {path}");
            write_json_dump(path, &metadata_to_json(&metadata))?;
        }

        let mappings = build_mappings(&metadata)?;

        if options.dump_mappings {
            let path = Utf8Path::new("mappings.json");
            tracing::info!("dumping mappings to {path}");
            let document = serde_json::to_value(&mappings)
                .map_err(|err| AssetError::Filesystem(err.to_string()))?;
            write_json_dump(path, &document)?;
        }

        Ok(mappings)
    }
}
