//! HttpBackend against a canned axum server on localhost.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use tokio::net::TcpListener;
use url::Url;

use taleforge::backend::http::{Endpoints, HttpBackend};
use taleforge::backend::{AskRequest, Backend, SummaryStatus};
use taleforge::story::JobId;

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    body: String,
}

/// One canned answer for every request, plus a log of what was asked.
#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: &'static str,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

async fn answer(
    State(canned): State<Canned>,
    method: Method,
    uri: Uri,
    body: String,
) -> impl IntoResponse {
    canned.recorded.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        body,
    });
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body,
    )
}

/// Serve `body` with `status` on a free local port.
async fn serve(status: u16, body: &'static str) -> (Url, Arc<Mutex<Vec<Recorded>>>) {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let state = Canned {
        status: StatusCode::from_u16(status).unwrap(),
        body,
        recorded: Arc::clone(&recorded),
    };
    let app = Router::new().fallback(answer).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (Url::parse(&format!("http://{addr}")).unwrap(), recorded)
}

fn backend(url: &Url) -> HttpBackend {
    HttpBackend::new(
        Endpoints {
            story: url.clone(),
            characters: url.clone(),
        },
        Duration::from_secs(5),
    )
}

fn last(recorded: &Arc<Mutex<Vec<Recorded>>>) -> Recorded {
    recorded.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn submit_story_posts_json_and_reads_job_id() {
    let (url, recorded) = serve(200, r#"{"storyId":"job-42"}"#).await;

    let job = backend(&url).submit_story("The Last Dragon").await.unwrap();
    assert_eq!(job, JobId::from("job-42"));

    let request = last(&recorded);
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/submitStory");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body, serde_json::json!({ "story": "The Last Dragon" }));
}

#[tokio::test]
async fn numeric_job_ids_are_accepted() {
    let (url, _) = serve(200, r#"{"storyId":17}"#).await;
    let job = backend(&url).submit_story("tale").await.unwrap();
    assert_eq!(job.as_str(), "17");
}

#[tokio::test]
async fn submit_error_status_fails() {
    let (url, _) = serve(500, r#"{"error":"boom"}"#).await;
    let err = backend(&url).submit_story("tale").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn summary_ready_on_200_with_summary() {
    let (url, recorded) = serve(200, r#"{"summary":"A dragon wakes."}"#).await;

    let status = backend(&url)
        .fetch_summary(&JobId::from("job-42"))
        .await
        .unwrap();
    assert_eq!(status, SummaryStatus::Ready("A dragon wakes.".to_string()));

    let request = last(&recorded);
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/getSummary/job-42");
}

#[tokio::test]
async fn summary_pending_on_other_status() {
    let (url, _) = serve(202, r#"{"status":"processing"}"#).await;
    let status = backend(&url).fetch_summary(&JobId::from("1")).await.unwrap();
    assert_eq!(status, SummaryStatus::Pending(202));

    let (url, _) = serve(404, "").await;
    let status = backend(&url).fetch_summary(&JobId::from("1")).await.unwrap();
    assert_eq!(status, SummaryStatus::Pending(404));
}

#[tokio::test]
async fn summary_pending_on_200_without_summary() {
    let (url, _) = serve(200, r#"{"status":"processing"}"#).await;
    let status = backend(&url).fetch_summary(&JobId::from("1")).await.unwrap();
    assert_eq!(status, SummaryStatus::Pending(200));
}

#[tokio::test]
async fn summary_undecodable_body_is_an_error() {
    let (url, _) = serve(200, "not json").await;
    assert!(backend(&url).fetch_summary(&JobId::from("1")).await.is_err());
}

#[tokio::test]
async fn character_names_posts_story() {
    let (url, recorded) = serve(200, r#"{"response":"Alice, Bob"}"#).await;

    let names = backend(&url).character_names("a story").await.unwrap();
    assert_eq!(names, "Alice, Bob");

    let request = last(&recorded);
    assert_eq!(request.path, "/charactername");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["story"], "a story");
}

#[tokio::test]
async fn ask_sends_camel_case_fields() {
    let (url, recorded) = serve(200, r#"{"response":"Greetings."}"#).await;

    let reply = backend(&url)
        .ask(&AskRequest {
            query: "Who are you?".to_string(),
            character_name: "Alice".to_string(),
            summarized_story: "a story".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(reply, "Greetings.");

    let request = last(&recorded);
    assert_eq!(request.path, "/ask");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "query": "Who are you?",
            "characterName": "Alice",
            "summarizedStory": "a story",
        })
    );
}

#[tokio::test]
async fn unreachable_backend_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let err = backend(&url).character_names("a story").await.unwrap_err();
    assert!(format!("{err:#}").contains("failed to reach"));
}
