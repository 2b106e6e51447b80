use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use seatkeeper_application::SubjectRepository;
use seatkeeper_core::AppError;
use seatkeeper_domain::Subject;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::HttpUserServiceDirectory;

struct ScriptedPage {
    status: StatusCode,
    body: String,
}

impl ScriptedPage {
    fn ok(subjects: &[Subject]) -> Self {
        let entries: Vec<Value> = subjects
            .iter()
            .map(|subject| {
                let status = if subject.enabled { "enabled" } else { "Disabled" };
                json!({ "id": subject.subject_id.as_str(), "status": status })
            })
            .collect();

        Self {
            status: StatusCode::OK,
            body: Value::Array(entries).to_string(),
        }
    }

    fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

struct ScriptedUserService {
    pages: Mutex<Vec<ScriptedPage>>,
    requests: Mutex<Vec<Value>>,
}

async fn find_users(
    State(service): State<Arc<ScriptedUserService>>,
    Json(body): Json<Value>,
) -> Response {
    service.requests.lock().await.push(body);

    let mut pages = service.pages.lock().await;
    if pages.is_empty() {
        return (StatusCode::OK, "[]").into_response();
    }

    let page = pages.remove(0);
    (page.status, page.body).into_response()
}

async fn start_user_service(pages: Vec<ScriptedPage>) -> (Arc<ScriptedUserService>, Url) {
    let service = Arc::new(ScriptedUserService {
        pages: Mutex::new(pages),
        requests: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route("/v2/findUsers", post(find_users))
        .with_state(service.clone());

    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(error) => panic!("failed to bind scripted user service: {error}"),
    };
    let address = match listener.local_addr() {
        Ok(address) => address,
        Err(error) => panic!("failed to read scripted user service address: {error}"),
    };

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let url = Url::parse(format!("http://{address}/v2/findUsers").as_str())
        .unwrap_or_else(|_| unreachable!());
    (service, url)
}

fn directory(url: Url, page_size: usize) -> HttpUserServiceDirectory {
    HttpUserServiceDirectory::new(reqwest::Client::new(), url).with_page_size(page_size)
}

fn expected_request(org_id: &str, first_result_index: usize, max_results: usize) -> Value {
    json!({
        "by": {
            "accountId": org_id,
            "withPaging": {
                "firstResultIndex": first_result_index,
                "maxResults": max_results,
                "sortBy": "principal",
                "ascending": true
            }
        },
        "include": { "allOf": ["status"] }
    })
}

fn members(ids: &[&str]) -> Vec<Subject> {
    ids.iter().map(|id| Subject::new(*id, true)).collect()
}

#[tokio::test]
async fn single_short_page_ends_stream() {
    let (service, url) = start_user_service(vec![ScriptedPage::ok(&members(&["1"]))]).await;

    let subjects = directory(url, 2)
        .get_by_org_id("123", &CancellationToken::new())
        .collect_all()
        .await;

    assert!(matches!(&subjects, Ok(subjects) if subjects == &members(&["1"])));
    assert_eq!(
        *service.requests.lock().await,
        vec![expected_request("123", 0, 2)]
    );
}

#[tokio::test]
async fn exact_page_size_fetches_one_more_empty_page() {
    let (service, url) = start_user_service(vec![
        ScriptedPage::ok(&members(&["1", "2"])),
        ScriptedPage::ok(&[]),
    ])
    .await;

    let subjects = directory(url, 2)
        .get_by_org_id("123", &CancellationToken::new())
        .collect_all()
        .await;

    assert!(matches!(&subjects, Ok(subjects) if subjects == &members(&["1", "2"])));
    assert_eq!(
        *service.requests.lock().await,
        vec![expected_request("123", 0, 2), expected_request("123", 2, 2)]
    );
}

#[tokio::test]
async fn short_second_page_ends_stream() {
    let (service, url) = start_user_service(vec![
        ScriptedPage::ok(&members(&["1", "2"])),
        ScriptedPage::ok(&members(&["3"])),
    ])
    .await;

    let subjects = directory(url, 2)
        .get_by_org_id("123", &CancellationToken::new())
        .collect_all()
        .await;

    assert!(matches!(&subjects, Ok(subjects) if subjects == &members(&["1", "2", "3"])));
    assert_eq!(service.requests.lock().await.len(), 2);
}

#[tokio::test]
async fn two_full_pages_are_followed_by_empty_page() {
    let (service, url) = start_user_service(vec![
        ScriptedPage::ok(&members(&["1", "2"])),
        ScriptedPage::ok(&members(&["3", "4"])),
        ScriptedPage::ok(&[]),
    ])
    .await;

    let subjects = directory(url, 2)
        .get_by_org_id("123", &CancellationToken::new())
        .collect_all()
        .await;

    assert!(matches!(&subjects, Ok(subjects) if subjects == &members(&["1", "2", "3", "4"])));
    assert_eq!(
        *service.requests.lock().await,
        vec![
            expected_request("123", 0, 2),
            expected_request("123", 2, 2),
            expected_request("123", 4, 2),
        ]
    );
}

#[tokio::test]
async fn status_is_compared_case_insensitively() {
    let (_service, url) = start_user_service(vec![ScriptedPage::raw(
        StatusCode::OK,
        r#"[{"id":"1","status":"ENABLED"},{"id":"2","status":"Disabled"}]"#,
    )])
    .await;

    let subjects = directory(url, 20)
        .get_by_org_id("123", &CancellationToken::new())
        .collect_all()
        .await;

    assert!(matches!(
        &subjects,
        Ok(subjects) if subjects == &vec![Subject::new("1", true), Subject::new("2", false)]
    ));
}

#[tokio::test]
async fn error_status_stops_after_first_error() {
    let (service, url) = start_user_service(vec![
        ScriptedPage::ok(&members(&["1", "2"])),
        ScriptedPage::raw(StatusCode::SERVICE_UNAVAILABLE, "busy"),
        ScriptedPage::ok(&members(&["3"])),
    ])
    .await;

    let mut stream = directory(url, 2).get_by_org_id("123", &CancellationToken::new());
    let mut received = Vec::new();
    let mut errors = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(subject) => received.push(subject),
            Err(error) => errors.push(error),
        }
    }

    assert_eq!(received, members(&["1", "2"]));
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], AppError::DirectoryUnavailable(_)));
    assert_eq!(service.requests.lock().await.len(), 2);
}

#[tokio::test]
async fn incomplete_entry_and_bad_body_are_errors() {
    let (_service, url) = start_user_service(vec![ScriptedPage::raw(
        StatusCode::OK,
        r#"[{"id":"1","status":"enabled"},{"id":"","status":"enabled"},{"id":"3","status":"enabled"}]"#,
    )])
    .await;

    let mut stream = directory(url, 20).get_by_org_id("123", &CancellationToken::new());
    assert!(matches!(stream.next().await, Some(Ok(subject)) if subject == Subject::new("1", true)));
    assert!(matches!(
        stream.next().await,
        Some(Err(AppError::DirectoryUnavailable(_)))
    ));
    assert!(stream.next().await.is_none());

    let (_service, url) =
        start_user_service(vec![ScriptedPage::raw(StatusCode::OK, "{\"not\":\"a list\"}")]).await;
    let result = directory(url, 20)
        .get_by_org_id("123", &CancellationToken::new())
        .collect_all()
        .await;
    assert!(matches!(result, Err(AppError::DirectoryUnavailable(_))));
}

#[tokio::test]
async fn zero_page_size_is_reported_without_requests() {
    let (service, url) = start_user_service(Vec::new()).await;

    let result = directory(url, 0)
        .get_by_org_id("123", &CancellationToken::new())
        .collect_all()
        .await;

    assert!(matches!(result, Err(AppError::DirectoryUnavailable(_))));
    assert!(service.requests.lock().await.is_empty());
}
