//! Release pipeline tests against a scripted command runner

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use debrel_build::{PackageRequest, ReleasePipeline, RunContext, RunState};
use debrel_config::{Config, VersionFile};
use debrel_core::process::RecordingRunner;
use debrel_core::{CommandOutput, CommandRunner, Invocation};
use debrel_debian::{BuildKind, ChangelogMode};
use tempfile::TempDir;
use tokio::sync::Notify;

const INFO: &str = r#"<?xml version="1.0"?>
<info><entry kind="dir" path=".." revision="412"><url>svn://x</url></entry></info>"#;

const LOG: &str = r#"<?xml version="1.0"?>
<log>
<logentry revision="411"><author>mobyfab</author><date>2013-04-18T09:15:00.000000Z</date><msg>Older change</msg></logentry>
<logentry revision="412"><author>mobyfab</author><date>2013-04-20T18:02:11.000000Z</date><msg>Newest change</msg></logentry>
<logentry revision="410"><author>mobyfab</author><date>not a date</date><msg>Broken</msg></logentry>
</log>"#;

const TEMPLATE_CHANGELOG: &str = "qstlink2 (0.300~oneiric) oneiric; urgency=low\n\n  * Template\n -- Fabien Poussin <fabien.poussin@gmail.com>  Mon, 01 Apr 2013 00:00:00 +0000\n\n";

/// Delegates to a [`RecordingRunner`] and notes what the staging tree held
/// when the build ran
#[derive(Default)]
struct ProbeRunner {
    inner: RecordingRunner,
    staged_files: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for ProbeRunner {
    async fn run(&self, invocation: &Invocation) -> debrel_core::Result<CommandOutput> {
        if invocation.program == "debuild" {
            if let Some(cwd) = &invocation.cwd {
                let mut staged = self.staged_files.lock().unwrap();
                for name in ["version", "res/svn-info.xml", "src/main.cpp", "debian/control"] {
                    if cwd.join(name).exists() {
                        staged.push(name.to_string());
                    }
                }
            }
        }
        self.inner.run(invocation).await
    }
}

/// Never lets `debuild` finish, and signals once it has started
#[derive(Default)]
struct StalledBuildRunner {
    inner: RecordingRunner,
    build_started: Notify,
}

#[async_trait]
impl CommandRunner for StalledBuildRunner {
    async fn run(&self, invocation: &Invocation) -> debrel_core::Result<CommandOutput> {
        if invocation.program == "debuild" {
            self.build_started.notify_one();
            return std::future::pending().await;
        }
        self.inner.run(invocation).await
    }
}

struct Fixture {
    _temp_dir: TempDir,
    root: PathBuf,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();

        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.cpp"), "int main() {}\n").unwrap();
        fs::write(root.join("qstlink2.pro"), "TARGET = qstlink2\nVERSION = 1.0\n").unwrap();

        let debian = root.join("package/debian");
        fs::create_dir_all(debian.join("source")).unwrap();
        fs::write(debian.join("control"), "Source: qstlink2\nPackage: qstlink2\n").unwrap();
        fs::write(debian.join("rules"), "#!/usr/bin/make -f\n").unwrap();
        fs::write(debian.join("copyright"), "Copyright 2013\n").unwrap();
        fs::write(debian.join("changelog"), TEMPLATE_CHANGELOG).unwrap();
        fs::write(debian.join("source/format"), "3.0 (native)\n").unwrap();

        let config = Config {
            source_dir: root.clone(),
            packaging_dir: root.join("package"),
            work_dir: root.join("package"),
            releases: vec!["precise".to_string(), "quantal".to_string()],
            ..Config::default()
        };

        Self { _temp_dir: temp_dir, root, config }
    }

    fn package_dir_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.root.join("package"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn changelog(&self) -> String {
        fs::read_to_string(self.root.join("package/debian/changelog")).unwrap()
    }

    fn staging_dir(&self, version: &str) -> PathBuf {
        self.root.join("package").join(format!("qstlink2-{version}"))
    }
}

fn request(release: &str, kind: BuildKind) -> PackageRequest {
    PackageRequest { release: release.to_string(), kind, ..Default::default() }
}

fn svn_responses(runner: &RecordingRunner) {
    runner.respond("svn", CommandOutput::ok(INFO));
    runner.respond("svn", CommandOutput::ok(LOG));
}

#[tokio::test]
async fn test_unknown_release_rejected_before_any_mutation() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    let before = fixture.package_dir_entries();

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let mut context = RunContext::new();
    let err = pipeline.run(&request("lucid", BuildKind::Binary), &mut context).await.unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("precise, quantal"));
    assert!(runner.calls().is_empty());
    assert_eq!(fixture.package_dir_entries(), before);
    assert_eq!(fixture.changelog(), TEMPLATE_CHANGELOG);
    assert_eq!(context.outcomes().len(), 1);
    assert!(!context.outcomes()[0].success);
}

#[tokio::test]
async fn test_binary_build_runs_every_step_and_cleans_up() {
    let fixture = Fixture::new();
    let runner = ProbeRunner::default();
    svn_responses(&runner.inner);

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let mut context = RunContext::new();
    let outcome = pipeline
        .run(&request("precise", BuildKind::Binary), &mut context)
        .await
        .unwrap();

    let root = fixture.root.display();
    assert_eq!(
        runner.inner.command_lines(),
        vec![
            format!("svn info {root} --xml"),
            format!("svn log {root} --limit 10 --xml"),
            "dh_make -n --single -e fabien.poussin@gmail.com -c gpl3".to_string(),
            "debuild -j4 -b -uc -us".to_string(),
        ]
    );
    assert_eq!(
        *runner.staged_files.lock().unwrap(),
        vec!["version", "res/svn-info.xml", "src/main.cpp", "debian/control"]
    );

    assert!(outcome.success);
    assert_eq!(outcome.version.as_deref(), Some("0.412~precise"));
    assert_eq!(outcome.changelog_stanzas, 2);
    assert_eq!(outcome.skipped_log_entries, 1);
    assert!(!outcome.uploaded);
    assert!(!fixture.staging_dir("0.412~precise").exists());
    assert_eq!(context.state(), RunState::Completed);

    let changelog = fixture.changelog();
    let headers: Vec<&str> = changelog.lines().filter(|l| l.starts_with("qstlink2 ")).collect();
    assert_eq!(
        headers,
        vec![
            "qstlink2 (0.412~precise) precise; urgency=medium",
            "qstlink2 (0.411~precise) precise; urgency=medium",
        ]
    );
    assert!(changelog.contains(" -- Fabien Poussin <fabien.poussin@gmail.com>  Sat, 20 Apr 2013 18:02:11 +0000\n"));
}

#[tokio::test]
async fn test_failed_build_still_removes_staging_directory() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    svn_responses(&runner);
    runner.respond("debuild", CommandOutput::failed(2, "dpkg-buildpackage: error"));

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let mut context = RunContext::new();
    let err = pipeline
        .run(&request("precise", BuildKind::Binary), &mut context)
        .await
        .unwrap_err();

    assert!(!err.is_validation());
    assert!(err.to_string().contains("debuild -j4 -b -uc -us"));
    assert!(!fixture.staging_dir("0.412~precise").exists());
    assert_eq!(fixture.package_dir_entries(), vec!["debian"]);
    assert!(context.outcomes()[0].error.is_some());
    assert_eq!(context.state(), RunState::Failed);
}

#[tokio::test]
async fn test_source_build_uploads_to_ppa() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    svn_responses(&runner);

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let mut request = request("quantal", BuildKind::Source);
    request.upload = true;
    let outcome = pipeline.run(&request, &mut RunContext::new()).await.unwrap();

    let calls = runner.calls();
    let dput = calls.last().unwrap();
    assert_eq!(dput.command_line(), "dput ppa:mobyfab/qstlink2 qstlink2_0.412~quantal_source.changes");
    assert_eq!(dput.cwd.as_deref(), Some(fixture.root.join("package").as_path()));
    assert!(runner.command_lines().contains(&"debuild -j4 -S -sa".to_string()));
    assert!(outcome.uploaded);
}

#[tokio::test]
async fn test_binary_build_never_uploads() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    svn_responses(&runner);

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let mut request = request("precise", BuildKind::Binary);
    request.upload = true;
    let outcome = pipeline.run(&request, &mut RunContext::new()).await.unwrap();

    assert!(runner.calls().iter().all(|c| c.program != "dput"));
    assert!(!outcome.uploaded);
}

#[tokio::test]
async fn test_revision_override_and_version_file() {
    let mut fixture = Fixture::new();
    fixture.config.svn_info_path = None;
    fixture.config.version_file =
        Some(VersionFile { path: PathBuf::from("qstlink2.pro"), key: "VERSION".to_string() });
    let runner = RecordingRunner::new();

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let request = PackageRequest {
        release: "quantal".to_string(),
        kind: BuildKind::Sbuild,
        revision: Some("77".to_string()),
        changelog: ChangelogMode::Skip,
        ..Default::default()
    };
    let outcome = pipeline.run(&request, &mut RunContext::new()).await.unwrap();

    assert_eq!(outcome.version.as_deref(), Some("1.0.77~quantal"));
    assert_eq!(
        runner.command_lines(),
        vec![
            "dh_make -n --single -e fabien.poussin@gmail.com -c gpl3",
            "debuild -j4 -S -us -uc",
            "sbuild -d quantal -j4 qstlink2_1.0.77~quantal.dsc",
        ]
    );
    assert_eq!(fixture.changelog(), TEMPLATE_CHANGELOG);
}

#[tokio::test]
async fn test_rewrite_mode_retargets_existing_changelog() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    runner.respond("svn", CommandOutput::ok(INFO));

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let request = PackageRequest {
        release: "precise".to_string(),
        changelog: ChangelogMode::Rewrite,
        ..Default::default()
    };
    pipeline.run(&request, &mut RunContext::new()).await.unwrap();

    assert!(fixture.changelog().starts_with("qstlink2 (0.412~precise) precise; urgency=medium\n\n  * Template\n"));
    assert!(runner.command_lines().iter().all(|c| !c.starts_with("svn log")));
}

#[tokio::test]
async fn test_missing_revision_aborts_before_staging() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    runner.respond("svn", CommandOutput::failed(1, "svn: E155007: not a working copy"));

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let err = pipeline
        .run(&request("precise", BuildKind::Binary), &mut RunContext::new())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(runner.calls().len(), 1);
    assert_eq!(fixture.package_dir_entries(), vec!["debian"]);
    assert_eq!(fixture.changelog(), TEMPLATE_CHANGELOG);
}

#[tokio::test]
async fn test_run_all_continues_after_a_failed_release() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    svn_responses(&runner);
    svn_responses(&runner);
    runner.respond("debuild", CommandOutput::failed(1, "build error"));
    runner.respond("debuild", CommandOutput::ok(""));

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let context = pipeline.run_all(&request("", BuildKind::Binary)).await.unwrap();

    assert_eq!(context.state(), RunState::Failed);
    assert_eq!(context.outcomes().len(), 2);
    assert_eq!(context.failed_releases(), vec!["precise"]);
    assert!(context.outcomes()[1].success);
    assert!(context.ensure_success().is_err());
    assert!(!fixture.staging_dir("0.412~precise").exists());
    assert!(!fixture.staging_dir("0.412~quantal").exists());
    assert!(fixture.changelog().starts_with("qstlink2 (0.412~quantal) quantal;"));
}

#[tokio::test]
async fn test_run_all_stops_on_missing_revision() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    runner.respond("svn", CommandOutput::failed(1, "svn: command not usable"));

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let err = pipeline.run_all(&request("", BuildKind::Binary)).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_changelog_path_is_in_templates() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    assert_eq!(pipeline.changelog_path(), Path::new(&fixture.root).join("package/debian/changelog"));
}

#[tokio::test]
async fn test_abandoned_build_removes_staging_directory() {
    let fixture = Fixture::new();
    let runner = StalledBuildRunner::default();
    svn_responses(&runner.inner);
    let staging = fixture.staging_dir("0.412~precise");

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let mut context = RunContext::new();
    let request = request("precise", BuildKind::Binary);
    let run = pipeline.run(&request, &mut context);

    tokio::select! {
        _ = run => panic!("build finished although debuild never returns"),
        _ = runner.build_started.notified() => {
            assert!(staging.join("version").exists());
        }
    }

    assert!(!staging.exists());
    assert_eq!(fixture.package_dir_entries(), vec!["debian"]);
}

#[tokio::test]
async fn test_stanza_count_matches_written_stanzas() {
    let fixture = Fixture::new();
    let runner = RecordingRunner::new();
    runner.respond("svn", CommandOutput::ok(INFO));
    let duplicated = LOG.replace(
        "</log>",
        r#"<logentry revision="412"><date>2013-04-20T18:02:11Z</date><msg>Same again</msg></logentry></log>"#,
    );
    runner.respond("svn", CommandOutput::ok(duplicated));

    let pipeline = ReleasePipeline::new(&fixture.config, &runner);
    let outcome = pipeline
        .run(&request("precise", BuildKind::Binary), &mut RunContext::new())
        .await
        .unwrap();

    assert_eq!(outcome.changelog_stanzas, 2);
    assert_eq!(fixture.changelog().matches("qstlink2 (0.412~precise)").count(), 1);
}
