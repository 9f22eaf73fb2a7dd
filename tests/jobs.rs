mod common;

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use common::MockRemote;
use majsoul_asset_manager::catalog::{Language, Resource};
use majsoul_asset_manager::endpoint::resource_url;
use majsoul_asset_manager::job::{
    ConflictPolicy, Job, dry_process_job, process_job, process_jobs,
};
use majsoul_asset_manager::output::NullSink;

fn resource(path: &str) -> Resource {
    Resource {
        language: Language::of_path(path),
        remote_path: path.to_string(),
        version: "1.2.3".parse().unwrap(),
    }
}

fn job(root: &Utf8Path, remote_path: &str, output_path: &str, policy: ConflictPolicy) -> Job {
    Job {
        resource: resource(remote_path),
        output_root: root.to_owned(),
        output_path: output_path.to_string(),
        conflict_policy: policy,
    }
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

#[test]
fn matching_size_counts_as_materialized() {
    let (_dir, root) = temp_root();
    let job = job(&root, "en/res/a.png", "res/a.png", ConflictPolicy::FileSuffix);

    fs::create_dir_all(root.join("res").as_std_path()).unwrap();
    fs::write(root.join("res/a.png").as_std_path(), b"data").unwrap();

    let mut client = MockRemote::default();
    client.sizes.insert(resource_url(&job.resource), 4);

    let result = process_job(&client, &job);
    assert!(result.success);
    assert_eq!(result.path, root.join("res/a.png"));
    assert_eq!(client.transfer_count(), 0);
}

#[test]
fn size_mismatch_applies_the_conflict_policy() {
    let (_dir, root) = temp_root();
    let job = job(&root, "en/res/a.png", "res/a.png", ConflictPolicy::FileSuffix);

    fs::create_dir_all(root.join("res").as_std_path()).unwrap();
    fs::write(root.join("res/a.png").as_std_path(), b"different-size").unwrap();

    let mut client = MockRemote::default();
    client.sizes.insert(resource_url(&job.resource), 4);

    let result = process_job(&client, &job);
    assert!(result.success);
    assert_eq!(result.path, root.join("res/a [en].png"));
    assert!(root.join("res/a [en].png").as_std_path().exists());
    assert_eq!(client.transfer_count(), 1);
    // the colliding original is left untouched
    assert_eq!(
        fs::read(root.join("res/a.png").as_std_path()).unwrap(),
        b"different-size"
    );
}

#[test]
fn unresolved_collision_fails_without_transfer() {
    let (_dir, root) = temp_root();
    let job = job(&root, "en/res/a.png", "res/a.png", ConflictPolicy::FileSuffix);

    fs::create_dir_all(root.join("res").as_std_path()).unwrap();
    fs::write(root.join("res/a.png").as_std_path(), b"one").unwrap();
    fs::write(root.join("res/a [en].png").as_std_path(), b"two").unwrap();

    let client = MockRemote::default();
    let result = process_job(&client, &job);
    assert!(!result.success);
    assert_eq!(client.transfer_count(), 0);
}

#[test]
fn skip_policy_never_renames() {
    let (_dir, root) = temp_root();
    let job = job(&root, "en/res/a.png", "res/a.png", ConflictPolicy::Skip);

    fs::create_dir_all(root.join("res").as_std_path()).unwrap();
    fs::write(root.join("res/a.png").as_std_path(), b"existing").unwrap();

    let client = MockRemote::default();
    let result = process_job(&client, &job);
    assert!(!result.success);
    assert_eq!(result.path, root.join("res/a.png"));
    assert_eq!(client.transfer_count(), 0);
}

#[test]
fn fresh_destination_streams_and_creates_parents() {
    let (_dir, root) = temp_root();
    let job = job(
        &root,
        "en/res/deep/a.png",
        "res/deep/a.png",
        ConflictPolicy::FileSuffix,
    );

    let mut client = MockRemote::default();
    client
        .bodies
        .insert(resource_url(&job.resource), b"payload".to_vec());

    let result = process_job(&client, &job);
    assert!(result.success);
    assert_eq!(
        fs::read(root.join("res/deep/a.png").as_std_path()).unwrap(),
        b"payload"
    );
}

#[test]
fn dry_run_reports_without_touching_anything() {
    let (_dir, root) = temp_root();
    let jobs: Vec<Job> = (0..3)
        .map(|index| {
            job(
                &root,
                &format!("en/res/{index}.png"),
                &format!("res/{index}.png"),
                ConflictPolicy::FileSuffix,
            )
        })
        .collect();

    let client = MockRemote::default();
    let results = process_jobs(&client, &jobs, 2, true, &NullSink);

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|result| result.success));
    assert_eq!(client.transfer_count(), 0);
    assert_eq!(fs::read_dir(root.as_std_path()).unwrap().count(), 0);
}

#[test]
fn dry_result_pairs_url_with_destination() {
    let (_dir, root) = temp_root();
    let job = job(&root, "jp/res/a.png", "res/a.png", ConflictPolicy::FileSuffix);

    let result = dry_process_job(&job);
    assert!(result.success);
    assert_eq!(
        result.url,
        "https://game.mahjongsoul.com/v1.2.3.w/jp/res/a.png"
    );
    assert_eq!(result.path, root.join("res/a.png"));
}

#[test]
fn pool_preserves_submission_order() {
    let (_dir, root) = temp_root();
    let jobs: Vec<Job> = (0..16)
        .map(|index| {
            job(
                &root,
                &format!("en/res/{index}.png"),
                &format!("res/{index}.png"),
                ConflictPolicy::FileSuffix,
            )
        })
        .collect();

    let client = MockRemote::default();
    let results = process_jobs(&client, &jobs, 4, false, &NullSink);

    assert_eq!(results.len(), jobs.len());
    for (index, result) in results.iter().enumerate() {
        assert!(result.success);
        assert_eq!(result.path, root.join(format!("res/{index}.png")));
    }
    assert_eq!(client.transfer_count(), jobs.len());
}
