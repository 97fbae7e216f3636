//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use audiobook_config::NetworkConfig;
    use audiobook_errors::{Error, NetworkError};
    use audiobook_events::{channel, AppEvent, DownloadEvent};
    use audiobook_net::*;
    use httpmock::prelude::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::{broadcast, mpsc, Notify};
    use url::Url;

    fn provider() -> HttpDownloadProvider {
        HttpDownloadProvider::new(&NetworkConfig::default()).unwrap()
    }

    fn body(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn recorder() -> (Arc<Mutex<Vec<u8>>>, impl Fn(u8) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |percent| sink.lock().unwrap().push(percent))
    }

    /// Serves one response that declares `declared` bytes, sends `sent`, then
    /// either stalls or hangs up
    async fn raw_server(declared: usize, sent: usize, hang_up: bool) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nContent-Type: audio/mpeg\r\n\r\n"
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&vec![7u8; sent]).await.unwrap();
            socket.flush().await.unwrap();
            if !hang_up {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        });
        Url::parse(&format!("http://{addr}/book/part1.mp3")).unwrap()
    }

    #[tokio::test]
    async fn test_download_writes_exact_content() {
        let server = MockServer::start_async().await;
        let content = body(100_000);
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/part1.mp3");
                then.status(200).body(&content);
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("nested/dir/part1.mp3");
        let request = DownloadRequest::new(Url::parse(&server.url("/part1.mp3")).unwrap(), &dest);

        let outcome = provider().download(request, CancellationToken::new()).await;

        mock.assert_async().await;
        assert!(matches!(outcome, DownloadOutcome::Succeeded { bytes: 100_000 }));
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_output_is_truncated_not_appended() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/short.bin");
                then.status(200).body("abc");
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("short.bin");
        std::fs::write(&dest, vec![1u8; 4096]).unwrap();

        let request = DownloadRequest::new(Url::parse(&server.url("/short.bin")).unwrap(), &dest);
        let outcome = provider().download(request, CancellationToken::new()).await;

        assert!(outcome.is_succeeded());
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_progress_is_throttled() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/large.mp3");
                then.status(200).body(body(1_000_000));
            })
            .await;

        let temp = tempdir().unwrap();
        let (seen, listener) = recorder();
        let request = DownloadRequest::new(
            Url::parse(&server.url("/large.mp3")).unwrap(),
            temp.path().join("large.mp3"),
        )
        .on_progress(listener);

        let outcome = provider().download(request, CancellationToken::new()).await;
        assert!(outcome.is_succeeded());

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);
        for pair in seen.windows(2) {
            assert!(pair[0] < pair[1], "progress went backwards: {seen:?}");
            if pair[1] != 100 {
                assert!(pair[1] - pair[0] > 5, "gap too small: {seen:?}");
            }
        }
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_abort_download() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/part2.mp3");
                then.status(200).body(body(50_000));
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("part2.mp3");
        let request = DownloadRequest::new(Url::parse(&server.url("/part2.mp3")).unwrap(), &dest)
            .on_progress(|_| panic!("listener bug"));

        let outcome = provider().download(request, CancellationToken::new()).await;

        assert!(outcome.is_succeeded());
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 50_000);
    }

    #[tokio::test]
    async fn test_http_error_carries_response_details() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone.mp3");
                then.status(404)
                    .header("content-type", "text/plain")
                    .body("no such part");
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("gone.mp3");
        let request = DownloadRequest::new(Url::parse(&server.url("/gone.mp3")).unwrap(), &dest);

        match provider().download(request, CancellationToken::new()).await {
            DownloadOutcome::Failed(Error::Network(NetworkError::HttpError {
                status,
                message,
                content_type,
                body,
            })) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
                assert_eq!(content_type.as_deref(), Some("text/plain"));
                assert_eq!(body.as_deref(), Some("no such part"));
            }
            other => panic!("expected HTTP failure, got {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_large_error_body_is_cut() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken.mp3");
                then.status(500).body("x".repeat(10_000));
            })
            .await;

        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(
            Url::parse(&server.url("/broken.mp3")).unwrap(),
            temp.path().join("broken.mp3"),
        );

        match provider().download(request, CancellationToken::new()).await {
            DownloadOutcome::Failed(Error::Network(NetworkError::HttpError {
                status, body, ..
            })) => {
                assert_eq!(status, 500);
                let body = body.unwrap();
                assert!(!body.is_empty());
                assert!(body.chars().count() <= 512);
            }
            other => panic!("expected HTTP failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_while_reading_stalled_error_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4096\r\n\r\nbusy";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(
            Url::parse(&format!("http://{addr}/busy.mp3")).unwrap(),
            temp.path().join("busy.mp3"),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            provider().download(request, cancel),
        )
        .await
        .expect("cancellation ends the error body read");
        assert!(outcome.is_cancelled());
    }

    #[tokio::test]
    async fn test_truncated_body_fails_and_removes_file() {
        let url = raw_server(1000, 400, true).await;
        let temp = tempdir().unwrap();
        let dest = temp.path().join("truncated.mp3");

        let outcome = provider()
            .download(DownloadRequest::new(url, &dest), CancellationToken::new())
            .await;

        assert!(matches!(outcome, DownloadOutcome::Failed(_)), "{outcome:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_unsupported_scheme_fails() {
        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(
            Url::parse("ftp://example.com/part1.mp3").unwrap(),
            temp.path().join("part1.mp3"),
        );

        let outcome = provider().download(request, CancellationToken::new()).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::Failed(Error::Network(NetworkError::UnsupportedProtocol { .. }))
        ));
    }

    #[tokio::test]
    async fn test_basic_credentials_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/secure.mp3")
                    .header("authorization", "Basic dXNlcjpwYXNz");
                then.status(200).body("ok");
            })
            .await;

        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(
            Url::parse(&server.url("/secure.mp3")).unwrap(),
            temp.path().join("secure.mp3"),
        )
        .with_credentials(Some(DownloadCredentials::basic("user", "pass")));

        let outcome = provider().download(request, CancellationToken::new()).await;

        mock.assert_async().await;
        assert!(outcome.is_succeeded());
    }

    #[tokio::test]
    async fn test_bearer_token_and_user_agent_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/token.mp3")
                    .header("authorization", "Bearer tok-123")
                    .header("user-agent", "audiobook-player/2.1");
                then.status(200).body("ok");
            })
            .await;

        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(
            Url::parse(&server.url("/token.mp3")).unwrap(),
            temp.path().join("token.mp3"),
        )
        .with_credentials(Some(DownloadCredentials::bearer("tok-123")))
        .with_user_agent("audiobook-player/2.1");

        let outcome = provider().download(request, CancellationToken::new()).await;

        mock.assert_async().await;
        assert!(outcome.is_succeeded());
    }

    #[tokio::test]
    async fn test_no_credentials_sends_no_authorization() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/open.mp3")
                    .header_missing("authorization");
                then.status(200).body("ok");
            })
            .await;

        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(
            Url::parse(&server.url("/open.mp3")).unwrap(),
            temp.path().join("open.mp3"),
        );

        let outcome = provider().download(request, CancellationToken::new()).await;

        mock.assert_async().await;
        assert!(outcome.is_succeeded());
    }

    #[tokio::test]
    async fn test_cancellation_mid_transfer_cleans_up() {
        let url = raw_server(1_000_000, 200_000, false).await;
        let temp = tempdir().unwrap();
        let dest = temp.path().join("cancelled.mp3");

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let (seen, record) = recorder();
        let request = DownloadRequest::new(url, &dest).on_progress(move |percent| {
            record(percent);
            let _ = progress_tx.send(percent);
        });

        let token = CancellationToken::new();
        let provider = provider();
        let download = {
            let token = token.clone();
            tokio::spawn(async move { provider.download(request, token).await })
        };

        tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(percent) = progress_rx.recv().await {
                if percent > 0 {
                    break;
                }
            }
        })
        .await
        .unwrap();
        token.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(10), download)
            .await
            .unwrap()
            .unwrap();

        assert!(outcome.is_cancelled());
        assert!(!dest.exists());
        assert!(!seen.lock().unwrap().contains(&100));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reports_only_zero() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("never.mp3");
        let (seen, listener) = recorder();
        let token = CancellationToken::new();
        token.cancel();

        let request =
            DownloadRequest::new(Url::parse("http://127.0.0.1:9/never.mp3").unwrap(), &dest)
                .on_progress(listener);
        let outcome = provider().download(request, token).await;

        assert!(outcome.is_cancelled());
        assert!(!dest.exists());
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_lifecycle_events_emitted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/events.mp3");
                then.status(200).body(body(20_000));
            })
            .await;

        let (tx, mut rx) = channel();
        let provider = provider().with_event_sender(tx);
        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(
            Url::parse(&server.url("/events.mp3")).unwrap(),
            temp.path().join("events.mp3"),
        );

        assert!(provider
            .download(request, CancellationToken::new())
            .await
            .is_succeeded());

        let mut saw_start = false;
        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Download(DownloadEvent::Started { total_size, .. }) => {
                    assert_eq!(total_size, Some(20_000));
                    saw_start = true;
                }
                AppEvent::Download(DownloadEvent::Completed { final_size, .. }) => {
                    assert_eq!(final_size, 20_000);
                    saw_complete = true;
                }
                _ => {}
            }
        }
        assert!(saw_start);
        assert!(saw_complete);
    }

    /// Writes a partial file, reports 40%, then waits to be released or
    /// cancelled
    struct ScriptedProvider {
        release: Arc<Notify>,
        fail: bool,
    }

    #[async_trait]
    impl DownloadProvider for ScriptedProvider {
        async fn download(
            &self,
            request: DownloadRequest,
            cancel: CancellationToken,
        ) -> DownloadOutcome {
            (request.on_progress)(0);
            tokio::fs::write(&request.output_path, b"partial").await.unwrap();
            (request.on_progress)(40);
            tokio::select! {
                () = cancel.cancelled() => DownloadOutcome::Cancelled,
                () = self.release.notified() => {
                    if self.fail {
                        DownloadOutcome::Failed(NetworkError::http(503, "Service Unavailable").into())
                    } else {
                        DownloadOutcome::Succeeded { bytes: 7 }
                    }
                }
            }
        }
    }

    fn scripted_task(path: &Path, fail: bool) -> (DownloadTask, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        let provider = Arc::new(ScriptedProvider {
            release: Arc::clone(&release),
            fail,
        });
        let request =
            DownloadRequest::new(Url::parse("https://cdn.example.com/p1.mp3").unwrap(), path);
        (DownloadTask::new("part-1", provider, request), release)
    }

    async fn next_status(rx: &mut broadcast::Receiver<DownloadStatus>) -> DownloadStatus {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("status arrives in time")
            .expect("status channel open")
    }

    #[tokio::test]
    async fn test_task_fetch_complete_and_delete() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("p1.mp3");
        let (task, release) = scripted_task(&path, false);
        let mut rx = task.subscribe();

        task.fetch().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 0 }));
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 40 }));

        // Fetching again only rebroadcasts
        task.fetch().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 40 }));

        release.notify_one();
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloaded));
        assert!(matches!(task.state(), DownloadStatus::Downloaded));

        task.fetch().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloaded));

        // Cancelling a finished download changes nothing
        task.cancel().await;
        assert!(matches!(task.state(), DownloadStatus::Downloaded));
        assert!(path.exists());

        task.delete().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Initial));
        assert!(matches!(task.state(), DownloadStatus::Initial));
        assert!(!path.exists());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_task_cancel_removes_partial_file_and_allows_refetch() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("p1.mp3");
        let (task, release) = scripted_task(&path, false);
        let mut rx = task.subscribe();

        task.cancel().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Initial));

        task.fetch().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 0 }));
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 40 }));
        assert!(path.exists());

        task.cancel().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Initial));
        assert!(matches!(task.state(), DownloadStatus::Initial));
        assert!(!path.exists());

        task.fetch().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 0 }));
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 40 }));
        release.notify_one();
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloaded));
    }

    #[tokio::test]
    async fn test_task_delete_while_downloading() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("p1.mp3");
        let (task, _release) = scripted_task(&path, false);
        let mut rx = task.subscribe();

        task.fetch().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 0 }));
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 40 }));

        task.delete().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Initial));
        assert!(!path.exists());

        task.delete().await;
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Initial));
    }

    #[tokio::test]
    async fn test_task_failure_returns_to_initial_with_failure_status() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("p1.mp3");
        let (task, release) = scripted_task(&path, true);
        let mut rx = task.subscribe();

        task.fetch().await;
        release.notify_one();

        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 0 }));
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Downloading { percent: 40 }));
        assert!(matches!(next_status(&mut rx).await, DownloadStatus::Initial));
        match next_status(&mut rx).await {
            DownloadStatus::DownloadFailed { error, message } => {
                assert!(matches!(
                    error,
                    Error::Network(NetworkError::HttpError { status: 503, .. })
                ));
                assert!(message.contains("503"));
            }
            other => panic!("expected failure status, got {other:?}"),
        }
        assert!(matches!(task.state(), DownloadStatus::Initial));
    }

    /// Fails its first download at once, then hangs until cancelled
    #[derive(Default)]
    struct FailOnceThenHang {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DownloadProvider for FailOnceThenHang {
        async fn download(
            &self,
            _request: DownloadRequest,
            cancel: CancellationToken,
        ) -> DownloadOutcome {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return DownloadOutcome::Failed(
                    NetworkError::http(503, "Service Unavailable").into(),
                );
            }
            cancel.cancelled().await;
            DownloadOutcome::Cancelled
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_status_matches_state_when_fetch_races_failure() {
        let temp = tempdir().unwrap();
        for round in 0..200 {
            let request = DownloadRequest::new(
                Url::parse("https://cdn.example.com/p1.mp3").unwrap(),
                temp.path().join(format!("p{round}.mp3")),
            );
            let task = DownloadTask::new("part-1", Arc::new(FailOnceThenHang::default()), request);
            let mut rx = task.subscribe();

            task.fetch().await;
            task.fetch().await;

            // The failure is always reported; everything else is already queued
            let mut last = next_status(&mut rx).await;
            while !matches!(last, DownloadStatus::DownloadFailed { .. }) {
                last = next_status(&mut rx).await;
            }
            while let Ok(status) = rx.try_recv() {
                last = status;
            }

            let consistent = match (&last, task.state()) {
                (
                    DownloadStatus::DownloadFailed { .. } | DownloadStatus::Initial,
                    DownloadStatus::Initial,
                ) => true,
                (
                    DownloadStatus::Downloading { percent: seen },
                    DownloadStatus::Downloading { percent },
                ) => *seen == percent,
                _ => false,
            };
            assert!(
                consistent,
                "round {round}: last status {last:?} but state is {:?}",
                task.state()
            );

            task.cancel().await;
        }
    }

    #[tokio::test]
    async fn test_task_over_http_reaches_downloaded() {
        let server = MockServer::start_async().await;
        let content = body(64_000);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/chapter.mp3");
                then.status(200).body(&content);
            })
            .await;

        let temp = tempdir().unwrap();
        let path = temp.path().join("chapter.mp3");
        let (seen, listener) = recorder();
        let request = DownloadRequest::new(Url::parse(&server.url("/chapter.mp3")).unwrap(), &path)
            .on_progress(listener);
        let task = DownloadTask::new("chapter", Arc::new(provider()), request);
        let mut rx = task.subscribe();

        task.fetch().await;
        let mut last_percent = 0;
        loop {
            match next_status(&mut rx).await {
                DownloadStatus::Downloading { percent } => {
                    assert!(percent >= last_percent);
                    last_percent = percent;
                }
                DownloadStatus::Downloaded => break,
                other => panic!("unexpected status {other:?}"),
            }
        }

        assert_eq!(tokio::fs::read(&path).await.unwrap(), content);
        assert_eq!(seen.lock().unwrap().last(), Some(&100));
    }
}
