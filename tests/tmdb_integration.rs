use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use debrid_resolver::media::{MediaKind, MetadataError, MetadataProvider};
use debrid_resolver::tmdb::TmdbClient;

fn client(server: &MockServer) -> TmdbClient {
    TmdbClient::with_base_url(reqwest::Client::new(), Some("test-key"), "es-ES", &server.uri())
        .unwrap()
}

#[tokio::test]
async fn test_find_movie_by_imdb_id() {
    let mock_server = MockServer::start().await;

    let response_body = r#"{
        "movie_results": [
            {
                "id": 603,
                "title": "The Matrix",
                "overview": "A computer hacker learns about the true nature of reality.",
                "release_date": "1999-03-30",
                "vote_average": 8.1
            }
        ],
        "tv_results": []
    }"#;

    Mock::given(method("GET"))
        .and(path("/3/find/tt0133093"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("external_source", "imdb_id"))
        .and(query_param("language", "es-ES"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_body))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);

    let results = client
        .find_by_imdb("tt0133093", MediaKind::Movie)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].display_title(), "The Matrix");
    assert_eq!(results[0].year(), Some(1999));

    let media = client
        .get_metadata("tt0133093.json", MediaKind::Movie)
        .await
        .unwrap();
    assert_eq!(media.id, "603");
    assert_eq!(media.kind, MediaKind::Movie);
    assert_eq!(media.season, None);
}

#[tokio::test]
async fn test_find_series_episode() {
    let mock_server = MockServer::start().await;

    let response_body = r#"{
        "movie_results": [],
        "tv_results": [
            {
                "id": 1396,
                "name": "Breaking Bad",
                "first_air_date": "2008-01-20"
            }
        ]
    }"#;

    Mock::given(method("GET"))
        .and(path("/3/find/tt0903747"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_body))
        .mount(&mock_server)
        .await;

    let media = client(&mock_server)
        .get_metadata("tt0903747:2:5", MediaKind::Series)
        .await
        .unwrap();

    assert_eq!(media.id, "1396");
    assert_eq!(media.season, Some(2));
    assert_eq!(media.episode, Some(5));
}

#[tokio::test]
async fn test_no_results_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/find/tt0000000"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"movie_results": [], "tv_results": []}"#),
        )
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .get_metadata("tt0000000", MediaKind::Movie)
        .await;
    assert!(matches!(err, Err(MetadataError::NotFound(_))));
}

#[tokio::test]
async fn test_http_error_is_request_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/find/tt0133093"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .find_by_imdb("tt0133093", MediaKind::Movie)
        .await;
    assert!(matches!(err, Err(MetadataError::RequestError(_))));
}

#[tokio::test]
async fn test_series_without_episode_is_rejected() {
    let mock_server = MockServer::start().await;

    let err = client(&mock_server)
        .get_metadata("tt0903747", MediaKind::Series)
        .await;
    assert!(matches!(err, Err(MetadataError::InvalidId(_))));
}
