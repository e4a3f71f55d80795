    use super::*;
    use serde_json::json;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    fn request() -> RemoteRequest {
        RemoteRequest::new(
            "BulkSceneUpdate",
            "mutation BulkSceneUpdate($input: BulkSceneUpdateInput!) { bulkSceneUpdate(input: $input) { id } }",
            json!({"input": {"ids": ["1", "2"], "tag_ids": {"ids": ["7"], "mode": "ADD"}}}),
        )
    }

    #[test]
    fn test_transport_builder() {
        let transport = HttpTransport::new("http://localhost:9999/graphql").with_api_key("k");
        assert_eq!(transport.endpoint(), "http://localhost:9999/graphql");
        assert_eq!(transport.api_key.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_send_success() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/graphql"))
            .and(matchers::header("ApiKey", "secret"))
            .and(matchers::body_partial_json(json!({"operationName": "BulkSceneUpdate"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"bulkSceneUpdate": [{"id": "1"}, {"id": "2"}]}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport =
            HttpTransport::new(format!("{}/graphql", mock_server.uri())).with_api_key("secret");
        let response = transport.send(&request()).await.unwrap();
        assert_eq!(response.acknowledged_ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_send_graphql_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{"message": "invalid tag id"}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(mock_server.uri());
        let err = transport.send(&request()).await.unwrap_err();
        assert_eq!(err, RemoteError::Semantic("invalid tag id".to_string()));
    }

    #[tokio::test]
    async fn test_send_server_error_is_transient() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(mock_server.uri());
        let err = transport.send(&request()).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Transient(TransientError::Http {
                status: 503,
                message: "overloaded".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_send_without_api_key() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::header_exists("ApiKey"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"bulkSceneUpdate": []}
            })))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(mock_server.uri());
        let response = transport.send(&request()).await.unwrap();
        assert!(response.acknowledged_ids.is_empty());
    }

    #[tokio::test]
    async fn test_send_unreachable_is_network_error() {
        let transport = HttpTransport::new("http://127.0.0.1:1/graphql");
        let err = transport.send(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Transient(TransientError::Network(_))
        ));
    }
