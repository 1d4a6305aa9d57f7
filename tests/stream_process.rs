//! Comportamiento del stream de líneas sobre procesos reales: fusión de
//! stdout/stderr, falla diferida de salida y cancelación que cosecha al hijo.

use std::path::Path;

use gmxflow_rust::errors::ExecutionError;
use gmxflow_rust::exec::stream::run_streaming;
use gmxflow_rust::exec::EngineCommand;

/// Ejecuta `/bin/sh -c <script>` a través del stream.
async fn sh_stream(script: &str, workdir: &Path) -> gmxflow_rust::exec::EngineStream {
    let cmd = EngineCommand::new("-c").switch(script);
    run_streaming(Path::new("/bin/sh"), &cmd, workdir).await.unwrap()
}

#[tokio::test]
async fn test_lines_arrive_in_emission_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut stream = sh_stream("echo one; echo two; echo three", dir.path()).await;

    let mut lines = Vec::new();
    while let Some(line) = stream.next_line().await {
        lines.push(line);
    }
    stream.finish().await.unwrap();
    assert_eq!(lines, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_stderr_lines_are_merged() {
    let dir = tempfile::tempdir().unwrap();
    let mut stream = sh_stream("echo out; echo err >&2", dir.path()).await;

    let mut lines = Vec::new();
    while let Some(line) = stream.next_line().await {
        lines.push(line);
    }
    stream.finish().await.unwrap();
    lines.sort_unstable();
    assert_eq!(lines, vec!["err", "out"]);
}

#[tokio::test]
async fn test_exit_failure_is_deferred_past_the_last_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut stream = sh_stream("echo partial output; echo oops >&2; exit 3", dir.path()).await;

    // Todas las líneas llegan antes de cualquier señal de falla.
    let mut lines = Vec::new();
    while let Some(line) = stream.next_line().await {
        lines.push(line);
    }
    assert_eq!(lines.len(), 2);

    let err = stream.finish().await.unwrap_err();
    match err {
        ExecutionError::NonZeroExit { code, output } => {
            assert_eq!(code, 3);
            assert!(output.contains("oops"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_cancel_terminates_a_long_running_child() {
    let dir = tempfile::tempdir().unwrap();
    let mut stream = sh_stream("echo started; sleep 60; echo never", dir.path()).await;

    let first = stream.next_line().await.unwrap();
    assert_eq!(first, "started");

    // cancel mata y cosecha al hijo antes de devolver; sin esto el test
    // quedaría esperando al sleep.
    let err = stream.cancel("operator stop").await;
    assert!(matches!(err, ExecutionError::Cancelled(ref reason) if reason == "operator stop"));
}

#[tokio::test]
async fn test_spawn_failure_surfaces_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let cmd = EngineCommand::new("anything");
    let err = run_streaming(Path::new("/definitely/not/a/binary"), &cmd, dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Spawn(_)));
}
