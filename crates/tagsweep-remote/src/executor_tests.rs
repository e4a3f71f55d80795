    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::Instant;

    /// Fails the first `fail_times` calls with `error`, then succeeds.
    struct MockTransport {
        calls: AtomicU32,
        fail_times: u32,
        error: RemoteError,
        stall: Option<Duration>,
        sent_at: Mutex<Vec<Instant>>,
    }

    impl MockTransport {
        fn new(fail_times: u32, error: RemoteError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_times,
                error,
                stall: None,
                sent_at: Mutex::new(Vec::new()),
            }
        }

        fn stalling(stall: Duration) -> Self {
            Self {
                stall: Some(stall),
                ..Self::new(0, RemoteError::Cancelled)
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, _request: &RemoteRequest) -> Result<RemoteResponse, RemoteError> {
            self.sent_at.lock().unwrap().push(Instant::now());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if call < self.fail_times {
                return Err(self.error.clone());
            }
            Ok(RemoteResponse {
                data: json!({"bulkSceneUpdate": [{"id": "1"}]}),
                acknowledged_ids: vec!["1".to_string()],
            })
        }
    }

    fn request() -> RemoteRequest {
        RemoteRequest::new("BulkSceneUpdate", "mutation { x }", json!({}))
    }

    fn config(retry_attempts: u32) -> ExecutorConfig {
        ExecutorConfig {
            request_timeout_ms: 1_000,
            retry_attempts,
            base_delay_ms: 100,
            max_delay_ms: None,
        }
    }

    fn executor(transport: Arc<MockTransport>, retry_attempts: u32) -> RemoteExecutor {
        RemoteExecutor::new(transport, config(retry_attempts))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_attempt() {
        let transport = Arc::new(MockTransport::new(0, RemoteError::network("x")));
        let exec = executor(transport.clone(), 2);

        let response = exec.execute(&request(), &CancellationToken::new()).await.unwrap();
        assert_eq!(response.acknowledged_ids, vec!["1"]);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_recovers() {
        let transport = Arc::new(MockTransport::new(2, RemoteError::network("reset")));
        let exec = executor(transport.clone(), 2);

        let result = exec.execute(&request(), &CancellationToken::new()).await;
        assert!(result.is_ok());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_exhausted() {
        let transport = Arc::new(MockTransport::new(u32::MAX, RemoteError::network("reset")));
        let exec = executor(transport.clone(), 2);

        let err = exec.execute(&request(), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, RemoteError::network("reset"));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_semantic_not_retried() {
        let transport = Arc::new(MockTransport::new(
            u32::MAX,
            RemoteError::Semantic("unknown tag".to_string()),
        ));
        let exec = executor(transport.clone(), 2);

        let err = exec.execute(&request(), &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_semantic());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles() {
        let transport = Arc::new(MockTransport::new(3, RemoteError::network("reset")));
        let exec = executor(transport.clone(), 3);

        exec.execute(&request(), &CancellationToken::new()).await.unwrap();

        let times = transport.sent_at.lock().unwrap().clone();
        assert_eq!(times.len(), 4);
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps[0] >= Duration::from_millis(100));
        assert!(gaps[1] >= Duration::from_millis(200));
        assert!(gaps[2] >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_is_transient() {
        let transport = Arc::new(MockTransport::stalling(Duration::from_secs(5)));
        let exec = executor(transport.clone(), 1);

        let started = Instant::now();
        let err = exec.execute(&request(), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Transient(TransientError::Timeout(Duration::from_secs(1)))
        );
        assert_eq!(transport.calls(), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_request() {
        let transport = Arc::new(MockTransport::stalling(Duration::from_millis(500)));
        let exec = executor(transport.clone(), 2);
        let token = CancellationToken::new();

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = exec.execute(&request(), &token).await.unwrap_err();
        assert_eq!(err, RemoteError::Cancelled);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let transport = Arc::new(MockTransport::new(u32::MAX, RemoteError::network("reset")));
        let exec = RemoteExecutor::new(
            transport.clone(),
            ExecutorConfig {
                base_delay_ms: 10_000,
                ..config(2)
            },
        );
        let token = CancellationToken::new();

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = exec.execute(&request(), &token).await.unwrap_err();
        assert_eq!(err, RemoteError::Cancelled);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let transport = Arc::new(MockTransport::new(0, RemoteError::network("x")));
        let exec = executor(transport.clone(), 2);
        let token = CancellationToken::new();
        token.cancel();

        let err = exec.execute(&request(), &token).await.unwrap_err();
        assert_eq!(err, RemoteError::Cancelled);
        assert_eq!(transport.calls(), 0);
    }
