//! Integration tests for the backend client using wiremock.

use std::sync::Arc;

use docchat_core::{
    ApiClient, ChatMessage, ChatRole, ChatSession, KnowledgeBase, NoHistory, PdfSession,
    SessionInfo, TurnOutcome, UserRole, APOLOGY,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NDJSON: &str = concat!(
    "{\"chunk\": \"Paris \"}\n",
    "{\"chunk\": \"is the capital.\"}\n",
    "{\"sources\": [{\"doc_id\": \"geo\", \"score\": 0.93, \"chunk\": \"Paris...\"}], \"complete\": true}\n",
);

fn authed(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri()).with_token(Some("tok".to_string()))
}

#[tokio::test]
async fn login_attaches_token_and_fetches_user() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_string_contains("username=ann%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "token_type": "bearer",
            "role": "admin"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "email": "ann@example.com",
            "role": "admin"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut api = ApiClient::new(&server.uri());
    let user = api.login("ann@example.com", "secret").await.expect("login should succeed");

    assert_eq!(api.token(), Some("tok"));
    assert_eq!(user.id, 7);
    assert_eq!(user.role, UserRole::Admin);
    assert!(user.is_admin());
}

#[tokio::test]
async fn login_failure_reports_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})))
        .mount(&server)
        .await;

    let mut api = ApiClient::new(&server.uri());
    let err = api.login("ann@example.com", "wrong").await.unwrap_err();

    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("Invalid credentials"));
    assert_eq!(api.token(), None);
}

#[tokio::test]
async fn register_admin_sends_admin_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register-admin"))
        .and(body_json(json!({
            "email": "root@example.com",
            "password": "pw",
            "admin_key": "k"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "email": "root@example.com",
            "role": "admin"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri());
    let user = api.register_admin("root@example.com", "pw", "k").await.unwrap();
    assert_eq!(user.role, UserRole::Admin);
}

#[tokio::test]
async fn documents_list_and_delete() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/documents"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d1", "title": "Handbook", "uploaded_by": "Admin", "created_at": "2024-05-01T10:00:00"},
            {"id": "d2", "title": null, "uploaded_by": "Admin", "created_at": "2024-05-02T10:00:00"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/admin/document/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "deleted", "doc_id": "d1"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = authed(&server);
    let docs = api.list_documents().await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].title.as_deref(), Some("Handbook"));
    assert_eq!(docs[1].title, None);

    api.delete_document("d1").await.unwrap();
}

#[tokio::test]
async fn upload_document_sends_multipart_pdf() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/ingest_pdf"))
        .and(body_string_contains("filename=\"manual.pdf\""))
        .and(body_string_contains("application/pdf"))
        .and(body_string_contains("Operations Manual"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "doc_id": "d9",
            "title": "Operations Manual"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("manual.pdf");
    std::fs::write(&file, b"%PDF-1.4 fake").unwrap();

    let api = authed(&server);
    let ingested = api.upload_document(&file, Some("Operations Manual")).await.unwrap();
    assert_eq!(ingested.doc_id, "d9");
}

#[tokio::test]
async fn non_streamed_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rag/query"))
        .and(body_json(json!({"query": "capital?", "top_k": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Paris",
            "sources": [{"doc_id": "geo", "score": 0.5, "chunk": "..."}]
        })))
        .mount(&server)
        .await;

    let response = authed(&server).query("capital?", 3).await.unwrap();
    assert_eq!(response.answer, "Paris");
    assert_eq!(response.sources.len(), 1);
}

#[tokio::test]
async fn authenticated_chat_turn_persists_both_messages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/conversations/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"role": "user", "content": "earlier"}, {"role": "assistant", "content": "reply"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rag/query_stream"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({"query": "Capital of France?", "top_k": 8})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(NDJSON, "application/x-ndjson"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/conversations/save"))
        .and(body_json(json!({"role": "user", "content": "Capital of France?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "saved"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/conversations/save"))
        .and(body_json(json!({"role": "assistant", "content": "Paris is the capital."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "saved"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = authed(&server);
    let backend = Arc::new(KnowledgeBase::new(api.clone(), 8));
    let mut session = ChatSession::restore(backend, Arc::new(api)).await;
    assert_eq!(session.transcript().len(), 2);

    let outcome = session.submit("Capital of France?", |_| {}).await;
    match outcome {
        TurnOutcome::Completed(report) => {
            assert_eq!(report.answer, "Paris is the capital.");
            assert_eq!(report.sources.unwrap()[0].doc_id.as_deref(), Some("geo"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(session.transcript().len(), 4);
    assert_eq!(
        session.transcript().last(),
        Some(&ChatMessage {
            role: ChatRole::Assistant,
            content: "Paris is the capital.".to_string()
        })
    );
}

#[tokio::test]
async fn server_error_becomes_apology() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rag/query_stream"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let api = authed(&server);
    let mut session = ChatSession::new(Arc::new(KnowledgeBase::new(api, 8)), Arc::new(NoHistory));

    let outcome = session.submit("anything", |_| {}).await;
    match outcome {
        TurnOutcome::Failed { error } => assert!(error.contains("500")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(session.transcript().last().unwrap().content, APOLOGY);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn clear_failure_keeps_local_transcript() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/conversations/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"role": "user", "content": "keep me"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/conversations/clear"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let api = authed(&server);
    let mut session = ChatSession::restore(Arc::new(KnowledgeBase::new(api.clone(), 8)), Arc::new(api)).await;

    assert!(session.new_conversation().await.is_err());
    assert_eq!(session.transcript().messages(), &[ChatMessage::user("keep me")]);
}

#[tokio::test]
async fn pdf_session_upload_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s-123",
            "filename": "paper.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/query"))
        .and(body_string_contains("s-123"))
        .and(body_string_contains("What is the result?"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"answer\": \"I couldn't find any relevant information in the document for your query.\", \"sources\": []}\n",
            "application/x-ndjson",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("paper.pdf");
    std::fs::write(&file, b"%PDF-1.4 fake").unwrap();

    let api = ApiClient::new(&server.uri());
    let info = api.upload_pdf_session(&file).await.unwrap();
    assert_eq!(
        info,
        SessionInfo {
            id: "s-123".to_string(),
            filename: "paper.pdf".to_string()
        }
    );

    let mut session = ChatSession::new(Arc::new(PdfSession::new(api, info, 5)), Arc::new(NoHistory));
    match session.submit("What is the result?", |_| {}).await {
        TurnOutcome::Completed(report) => {
            assert!(report.answer.starts_with("I couldn't find"));
            assert_eq!(report.sources, Some(vec![]));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}
