//! Resource pipeline lifecycle tests
//!
//! Real child processes stand in for the downloader and the transcoder:
//! `sh -c <script>` with the fetcher/transcoder stdio policies.

#![cfg(unix)]

use cadence_pipeline::{
    CommandSpec, PipelineError, PipelineState, PipelineSupervisor, ResourcePipeline, Stage,
    StdioConfig, StdioPolicy,
};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::time::{sleep, timeout};

// ===== Test Helpers =====

const TIMEOUT: Duration = Duration::from_secs(10);

fn fetcher(script: &str) -> CommandSpec {
    CommandSpec::new("sh", StdioConfig::FETCHER).args(["-c", script, "fetcher"])
}

fn transcoder(script: &str) -> CommandSpec {
    CommandSpec::new("sh", StdioConfig::TRANSCODER).args(["-c", script, "transcoder"])
}

fn open(fetch: &str, transcode: &str) -> ResourcePipeline {
    ResourcePipeline::open_with("test://locator", &fetcher(fetch), &transcoder(transcode))
        .expect("pipeline should build")
}

// ===== Natural End =====

#[tokio::test]
async fn test_full_drain_reads_exact_bytes_then_clean_eof() {
    let mut pipeline = open("head -c 200000 /dev/zero", "exec cat");
    assert_eq!(pipeline.state(), PipelineState::Streaming);

    let mut audio = pipeline.take_output().unwrap();
    assert!(pipeline.take_output().is_none());

    let mut pcm = Vec::new();
    timeout(TIMEOUT, audio.read_to_end(&mut pcm))
        .await
        .expect("drain should terminate")
        .expect("clean end of stream");

    assert_eq!(pcm.len(), 200_000);
    assert_eq!(audio.bytes_read(), 200_000);
    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert!(pipeline.failure().is_none());
    assert!(pipeline.live_pids().is_empty());
}

#[tokio::test]
async fn test_output_passes_through_transcoder() {
    let mut pipeline = open("printf 'raw audio'", "exec tr a-z A-Z");
    let mut audio = pipeline.take_output().unwrap();

    let mut out = String::new();
    timeout(TIMEOUT, audio.read_to_string(&mut out))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(out, "RAW AUDIO");
}

#[tokio::test]
async fn test_transcoder_finishing_first_releases_fetcher() {
    let mut pipeline = open("exec sleep 30", "printf done");
    let handle = pipeline.handle();
    let mut audio = pipeline.take_output().unwrap();

    let mut out = Vec::new();
    timeout(TIMEOUT, audio.read_to_end(&mut out))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(out, b"done");
    assert_eq!(handle.state(), PipelineState::Completed);
    assert!(handle.failure().is_none());
    timeout(TIMEOUT, handle.released()).await.unwrap();
    assert!(handle.live_pids().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transcoder_reading_a_prefix_completes_despite_broken_pipe() {
    // The fetcher keeps writing after the transcoder is gone, so it usually
    // dies of SIGPIPE; which exit the monitor sees first varies per run.
    for run in 0..50 {
        let mut pipeline = open("exec cat /dev/zero", "exec head -c 10");
        let handle = pipeline.handle();
        let mut audio = pipeline.take_output().unwrap();

        let mut pcm = Vec::new();
        timeout(TIMEOUT, audio.read_to_end(&mut pcm))
            .await
            .unwrap()
            .unwrap_or_else(|err| panic!("run {run}: read failed: {err}"));
        assert_eq!(pcm, [0u8; 10], "run {run}");

        timeout(TIMEOUT, handle.released()).await.unwrap();
        assert_eq!(handle.failure(), None, "run {run}");
        assert_eq!(handle.state(), PipelineState::Completed, "run {run}");
        assert!(handle.exit(Stage::Transcoder).is_some_and(|exit| exit.success()));
        assert!(handle.live_pids().is_empty());
    }
}

// ===== Joint Failure =====

#[tokio::test]
async fn test_fetcher_failure_kills_transcoder() {
    let pipeline = open("printf partial; exit 3", "exec sleep 30");
    let handle = pipeline.handle();

    let state = timeout(TIMEOUT, handle.finished()).await.unwrap();
    assert_eq!(state, PipelineState::Failed);

    let failure = handle.failure().unwrap();
    assert_eq!(failure.stage, Stage::Fetcher);
    assert_eq!(failure.exit.code(), Some(3));

    timeout(TIMEOUT, handle.released())
        .await
        .expect("transcoder should be killed");
    assert!(handle.exit(Stage::Transcoder).is_some_and(|exit| !exit.success()));
    assert!(handle.live_pids().is_empty());
}

#[tokio::test]
async fn test_transcoder_failure_kills_fetcher() {
    let mut pipeline = open("exec sleep 30", "exit 5");
    let handle = pipeline.handle();
    let mut audio = pipeline.take_output().unwrap();

    let mut out = Vec::new();
    let err = timeout(TIMEOUT, audio.read_to_end(&mut out))
        .await
        .unwrap()
        .expect_err("failed pipeline must not end cleanly");

    let failure = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<cadence_pipeline::AbnormalExit>())
        .copied()
        .expect("error carries the abnormal exit");
    assert_eq!(failure.stage, Stage::Transcoder);
    assert_eq!(failure.exit.code(), Some(5));

    assert_eq!(handle.state(), PipelineState::Failed);
    timeout(TIMEOUT, handle.released())
        .await
        .expect("fetcher should be killed");
    assert!(handle.live_pids().is_empty());
}

#[tokio::test]
async fn test_failure_is_recorded_once() {
    let pipeline = open("exit 2", "exit 4");
    let handle = pipeline.handle();

    timeout(TIMEOUT, handle.released()).await.unwrap();
    let first = handle.failure().unwrap();

    // Give the monitor time to process the second exit as well
    sleep(Duration::from_millis(50)).await;
    assert_eq!(handle.failure(), Some(first));
    assert_eq!(handle.state(), PipelineState::Failed);
}

// ===== Stop / Close =====

#[tokio::test]
async fn test_close_is_idempotent() {
    let mut pipeline = open("exec cat /dev/zero", "exec cat");
    let handle = pipeline.handle();

    pipeline.close();
    pipeline.close();
    handle.stop();
    pipeline.close();

    assert_eq!(pipeline.state(), PipelineState::Stopped);
    timeout(TIMEOUT, handle.released()).await.unwrap();

    // Exits caused by the stop are not failures
    assert!(pipeline.failure().is_none());
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert!(pipeline.live_pids().is_empty());
}

#[tokio::test]
async fn test_close_after_failure_moves_to_stopped() {
    let mut pipeline = open("exit 1", "exec cat");
    let handle = pipeline.handle();
    assert_eq!(timeout(TIMEOUT, handle.finished()).await.unwrap(), PipelineState::Failed);

    pipeline.close();
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(pipeline.failure().map(|f| f.stage), Some(Stage::Fetcher));
}

#[tokio::test]
async fn test_stop_unblocks_pending_read() {
    let mut pipeline = open("exec sleep 30", "exec cat");
    let handle = pipeline.handle();
    let mut audio = pipeline.take_output().unwrap();

    let reader = tokio::spawn(async move {
        let mut out = Vec::new();
        audio.read_to_end(&mut out).await.map(|_| out.len())
    });

    sleep(Duration::from_millis(100)).await;
    assert!(!reader.is_finished(), "read should be waiting for output");

    handle.stop();
    let read = timeout(TIMEOUT, reader)
        .await
        .expect("stop must wake the reader")
        .unwrap()
        .expect("stop ends the stream without an error");
    assert_eq!(read, 0);

    timeout(TIMEOUT, handle.released()).await.unwrap();
    assert!(handle.live_pids().is_empty());
}

#[tokio::test]
async fn test_dropping_pipeline_kills_processes() {
    let pipeline = open("exec sleep 30", "exec sleep 30");
    let handle = pipeline.handle();
    assert_eq!(handle.live_pids().len(), 2);

    drop(pipeline);

    assert_eq!(handle.state(), PipelineState::Stopped);
    timeout(TIMEOUT, handle.released()).await.unwrap();
    assert!(handle.live_pids().is_empty());
}

// ===== Backpressure =====

#[tokio::test]
async fn test_unread_output_stalls_fetcher() {
    // 64 MiB would pass through unbounded buffering in well under a second
    let mut pipeline = open("exec head -c 67108864 /dev/zero", "exec cat");
    let handle = pipeline.handle();
    let mut audio = pipeline.take_output().unwrap();

    sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.live_pids().len(), 2, "fetcher must be blocked by the idle consumer");
    assert!(handle.exit(Stage::Fetcher).is_none());

    let mut chunk = vec![0u8; 4096];
    audio.read_exact(&mut chunk).await.unwrap();
    assert_eq!(handle.state(), PipelineState::Streaming);

    pipeline.close();
    timeout(TIMEOUT, handle.released()).await.unwrap();
}

// ===== Build Failures =====

#[tokio::test]
async fn test_missing_fetcher_never_spawns_transcoder() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("transcoder-started");
    let missing = CommandSpec::new("/nonexistent/cadence-fetcher", StdioConfig::FETCHER);
    let transcode = transcoder(&format!("touch '{}'; exec cat", marker.display()));

    let err = ResourcePipeline::open_with("test://locator", &missing, &transcode).unwrap_err();

    assert!(matches!(err, PipelineError::Spawn { stage: Stage::Fetcher, .. }));
    assert_eq!(err.stage(), Some(Stage::Fetcher));
    sleep(Duration::from_millis(100)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_missing_transcoder_is_attributed_to_transcoder() {
    let missing = CommandSpec::new("/nonexistent/cadence-transcoder", StdioConfig::TRANSCODER);

    let err = ResourcePipeline::open_with("test://locator", &fetcher("exec sleep 30"), &missing)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Spawn { stage: Stage::Transcoder, .. }));
}

#[tokio::test]
async fn test_unpiped_fetcher_output_is_a_build_error() {
    let stdio = StdioConfig::new(StdioPolicy::Ignore, StdioPolicy::Ignore, StdioPolicy::Inherit);
    let fetch = CommandSpec::new("sh", stdio).args(["-c", "exec sleep 30"]);

    let err = PipelineSupervisor::build(&fetch, &transcoder("exec cat")).unwrap_err();

    match err {
        PipelineError::Build { stage, reason } => {
            assert_eq!(stage, Stage::Fetcher);
            assert!(reason.contains("stdout"));
        }
        other => panic!("expected build error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unpiped_transcoder_input_is_a_build_error() {
    let stdio = StdioConfig::new(StdioPolicy::Ignore, StdioPolicy::Piped, StdioPolicy::Inherit);
    let transcode = CommandSpec::new("sh", stdio).args(["-c", "exec sleep 30"]);

    let err = PipelineSupervisor::build(&fetcher("exec sleep 30"), &transcode).unwrap_err();

    assert!(matches!(err, PipelineError::Build { stage: Stage::Transcoder, .. }));
}

#[tokio::test]
async fn test_supervisor_reports_link_and_pids() {
    let mut supervisor = PipelineSupervisor::build(&fetcher("exec sleep 30"), &transcoder("exec cat")).unwrap();

    assert!(supervisor.is_linked());
    assert!(supervisor.pid(Stage::Fetcher).is_some());
    assert!(supervisor.pid(Stage::Transcoder).is_some());
    assert_ne!(supervisor.pid(Stage::Fetcher), supervisor.pid(Stage::Transcoder));

    let handle = supervisor.handle();
    supervisor.stop();
    supervisor.stop();
    assert!(!supervisor.is_linked());
    assert_eq!(supervisor.state(), PipelineState::Stopped);
    timeout(TIMEOUT, handle.released()).await.unwrap();
}
