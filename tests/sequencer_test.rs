use playmacro::{
    CancelToken, MemorySink, RunContext, RunController, RunOutcome, Studio, StudioConfig,
    StudioState, run_script,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_script(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test(flavor = "multi_thread")]
async fn test_round_trip_ordering() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "seq.txt", "SEND A\n#WAIT 200\nSEND B\n");
    let sink = MemorySink::new();

    let started = std::time::Instant::now();
    let outcome = run_script(
        &script,
        &sink,
        &RunContext::default(),
        &CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(sink.sent(), vec!["SEND A", "SEND B"]);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hot_swap_keeps_sink_single_writer() {
    let dir = TempDir::new().unwrap();
    let looping = write_script(&dir, "loop.txt", "TICK\n#WAIT 50\n#LOOP\n");
    let replacement = write_script(&dir, "next.txt", "SWAPPED\n");

    let sink = Arc::new(MemorySink::new());
    let mut controller = RunController::new(sink.clone());

    controller
        .start_run(&looping, RunContext::default())
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    controller
        .start_run(&replacement, RunContext::default())
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.stop_active().await;

    let sent = sink.sent();
    let swap_at = sent
        .iter()
        .position(|l| l == "SWAPPED")
        .expect("replacement run should have sent");
    assert_eq!(swap_at, sent.len() - 1, "no output after the swap: {sent:?}");
    assert!(
        sent[..swap_at].iter().all(|l| l == "TICK"),
        "only the first run writes before the swap: {sent:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_loop_rereads_edited_source() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "edited.txt", "SEND A\n#WAIT 400\n#LOOP\n");
    let sink = Arc::new(MemorySink::new());

    let task = tokio::spawn({
        let script = script.clone();
        let sink = sink.clone();
        async move {
            run_script(
                &script,
                sink.as_ref(),
                &RunContext::default(),
                &CancelToken::new(),
            )
            .await
        }
    });

    // While the first pass sits in its wait, rewrite the file without the
    // loop; the next pass picks up the edit and the run completes.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(&script, "SEND B\n").unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("edited script should stop looping")
        .unwrap()
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(sink.sent(), vec!["SEND A", "SEND B"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_studio_stop_directive_drives_transition() {
    let media = TempDir::new().unwrap();
    let scripts = TempDir::new().unwrap();
    let onair = write_script(&scripts, "onair.txt", "#ADD\n#WAIT 100\n#STOP\n");
    let offair = write_script(&scripts, "offair.txt", "IDLE LOOK\n");

    let sink = Arc::new(MemorySink::new());
    let config = StudioConfig::new(media.path(), onair, offair).with_display_name("Jane");
    let (mut studio, mut stop_rx) = Studio::new(config, sink.clone());

    studio.start().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    studio.start_recording().await;
    assert_eq!(studio.state(), StudioState::Recording);

    // The script's #STOP surfaces as a request; the event loop (here, the
    // test) forwards it to the studio.
    let request = tokio::time::timeout(Duration::from_secs(2), stop_rx.recv())
        .await
        .expect("script should request a stop");
    assert!(request.is_some());
    studio.stop().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(studio.state(), StudioState::Idle);
    assert_eq!(studio.last_recording(), Some("circom0.mp4"));

    let sent = sink.sent();
    assert!(
        sent.contains(&"ADD 1 FILE circom0.mp4 -vcodec libx264 -preset ultrafast -crf 20".into()),
        "got: {sent:?}"
    );
    assert!(
        sent.contains(&"REMOVE 1 FILE circom0.mp4".into()),
        "got: {sent:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_studio_full_session() {
    let media = TempDir::new().unwrap();
    let scripts = TempDir::new().unwrap();
    // An existing clip on disk shifts the derived name.
    fs::write(media.path().join("circom0.mp4"), b"").unwrap();
    let onair = write_script(&scripts, "onair.txt", "#WAIT 60000\n");
    let offair = write_script(&scripts, "offair.txt", "\n");

    let sink = Arc::new(MemorySink::new());
    let (mut studio, _stop_rx) = Studio::new(
        StudioConfig::new(media.path(), onair, offair),
        sink.clone(),
    );

    assert_eq!(studio.play().await, None, "nothing recorded yet");

    studio.start_recording().await;
    studio.stop().await;
    assert_eq!(studio.last_recording(), Some("circom1.mp4"));

    let clip = studio.play().await.expect("recording available");
    assert!(clip.ends_with("circom1.mp4"));
    assert_eq!(studio.state(), StudioState::Playing);

    studio.playback_finished().await;
    assert_eq!(studio.state(), StudioState::Idle);
}
