use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;

use crate::catalog::Resource;
use crate::endpoint::{RemoteClient, resource_url};
use crate::mapping::{MappingTable, base_of, dir_of, ext_of, join, map_path, stem_of};
use crate::output::ProgressSink;

/// How a job is renamed when its destination already holds a
/// different-sized file from another territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    /// `[language] ` prepended to the file name.
    FilePrefix,
    /// ` [language]` appended before the extension.
    FileSuffix,
    /// The file moves under a `language/` subdirectory.
    DirectoryPrefix,
    /// Leave the job unchanged; the collision check will drop it.
    Skip,
}

/// The unit of work: one catalog resource bound for one output path.
#[derive(Debug, Clone)]
pub struct Job {
    pub resource: Resource,
    pub output_root: Utf8PathBuf,
    pub output_path: String,
    pub conflict_policy: ConflictPolicy,
}

/// Terminal record of one job's outcome.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub success: bool,
    pub url: String,
    pub path: Utf8PathBuf,
}

pub fn build_jobs(
    catalog: &[Resource],
    output_root: &Utf8Path,
    conflict_policy: ConflictPolicy,
    mappings: Option<&MappingTable>,
) -> Vec<Job> {
    tracing::info!("building jobs for {} resources", catalog.len());
    catalog
        .iter()
        .map(|resource| {
            let output_path = match mappings {
                Some(table) => map_path(&resource.remote_path, table),
                None => resource.remote_path.clone(),
            };
            Job {
                resource: resource.clone(),
                output_root: output_root.to_owned(),
                output_path,
                conflict_policy,
            }
        })
        .collect()
}

/// Absolute on-disk destination of a job.
pub fn native_path(job: &Job) -> Utf8PathBuf {
    job.output_root.join(&job.output_path)
}

/// Rewrites a job's output path per its policy. A pure function of one
/// job; collisions between jobs surface only at execution time.
pub fn resolve_conflict(job: &Job) -> Job {
    match job.conflict_policy {
        ConflictPolicy::FilePrefix => with_file_prefix(job),
        ConflictPolicy::FileSuffix => with_file_suffix(job),
        ConflictPolicy::DirectoryPrefix => with_directory_prefix(job),
        ConflictPolicy::Skip => job.clone(),
    }
}

fn with_file_suffix(job: &Job) -> Job {
    let stem = stem_of(&job.output_path);
    let ext = ext_of(&job.output_path);
    let renamed = format!("{stem} [{}]{ext}", job.resource.language);
    Job {
        output_path: join(dir_of(&job.output_path), &renamed),
        ..job.clone()
    }
}

fn with_file_prefix(job: &Job) -> Job {
    let renamed = format!("[{}] {}", job.resource.language, base_of(&job.output_path));
    Job {
        output_path: join(dir_of(&job.output_path), &renamed),
        ..job.clone()
    }
}

fn with_directory_prefix(job: &Job) -> Job {
    Job {
        output_path: format!("{}/{}", job.resource.language, job.output_path),
        ..job.clone()
    }
}

/// Size of a local file, -1 when absent or not a file.
pub fn local_size(path: &Utf8Path) -> i64 {
    match fs::metadata(path.as_std_path()) {
        Ok(meta) if meta.is_file() => i64::try_from(meta.len()).unwrap_or(-1),
        _ => -1,
    }
}

/// A destination counts as already materialized when its size matches the
/// remote probe. Size equality is the documented heuristic; no checksums.
pub fn is_duplicate<C: RemoteClient + ?Sized>(client: &C, url: &str, path: &Utf8Path) -> bool {
    let local = local_size(path);
    if local < 0 {
        return false;
    }
    let remote = client.remote_size(url);
    remote > 0 && local > 0 && remote == local
}

pub fn process_job<C: RemoteClient + ?Sized>(client: &C, job: &Job) -> JobResult {
    let url = resource_url(&job.resource);
    let mut destination = native_path(job);

    if is_duplicate(client, &url, &destination) {
        return JobResult {
            success: true,
            url,
            path: destination,
        };
    }

    if destination.as_std_path().exists() {
        let renamed = resolve_conflict(job);
        destination = native_path(&renamed);
    }

    if destination.as_std_path().exists() {
        return JobResult {
            success: false,
            url,
            path: destination,
        };
    }

    if let Some(parent) = destination.parent()
        && fs::create_dir_all(parent.as_std_path()).is_err()
    {
        return JobResult {
            success: false,
            url,
            path: destination,
        };
    }

    let success = client.download_to_file(&url, destination.as_std_path()).is_ok();
    JobResult {
        success,
        url,
        path: destination,
    }
}

/// Reports where the job would land without touching network or disk.
pub fn dry_process_job(job: &Job) -> JobResult {
    JobResult {
        success: true,
        url: resource_url(&job.resource),
        path: native_path(job),
    }
}

/// Runs jobs on a bounded pool of worker threads. Results come back in
/// submission order regardless of completion order; a failed job is
/// reported once and never retried.
pub fn process_jobs<C: RemoteClient + ?Sized>(
    client: &C,
    jobs: &[Job],
    workers: usize,
    dry_run: bool,
    sink: &dyn ProgressSink,
) -> Vec<JobResult> {
    let workers = workers.clamp(1, jobs.len().max(1));
    let cursor = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<JobResult>>> = jobs.iter().map(|_| Mutex::new(None)).collect();

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(job) = jobs.get(index) else { break };
                    let result = if dry_run {
                        dry_process_job(job)
                    } else {
                        process_job(client, job)
                    };
                    report(sink, dry_run, &result);
                    *slots[index].lock().unwrap() = Some(result);
                }
            });
        }
    });

    slots
        .into_iter()
        .map(|slot| {
            slot.into_inner()
                .unwrap()
                .expect("every job slot is filled before the pool joins")
        })
        .collect()
}

fn report(sink: &dyn ProgressSink, dry_run: bool, result: &JobResult) {
    if dry_run {
        sink.event(&format!("'{}' '{}'", result.url, result.path));
    } else if !result.success {
        sink.event(&format!("failed '{}' '{}'", result.url, result.path));
    }
}
