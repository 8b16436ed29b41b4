//! ImageTyperz exchanges against a local mock server.

use std::sync::Arc;

use hoster_hooks::captcha::{
    CaptchaImage, CaptchaServiceClient, CaptchaTask, CaptchaTaskController, DeclineReason,
    HandleOutcome, TaskKind, TaskStatus,
};
use hoster_hooks::config::{ImageTyperzConfig, ServiceEndpoints};
use hoster_hooks::transport::ReqwestTransport;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BALANCE_PATH: &str = "/Forms/RequestBalance.ashx";
const SUBMIT_PATH: &str = "/Forms/UploadFileAndGetTextNEW.ashx";
const REPORT_PATH: &str = "/Forms/SetBadImage.ashx";

fn config(server: &MockServer, password: &str) -> ImageTyperzConfig {
    ImageTyperzConfig::default()
        .with_credentials("tester", password)
        .with_endpoints(ServiceEndpoints::imagetyperz_at(&server.uri()))
}

fn transport() -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new().expect("reqwest transport"))
}

async fn mount(server: &MockServer, route: &str, marker: &str, body: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn balance_is_parsed_from_plain_text() {
    let server = MockServer::start().await;
    mount(&server, BALANCE_PATH, "REQUESTBALANCE", "12.50\r\n").await;

    let client = CaptchaServiceClient::imagetyperz(transport(), &config(&server, "secret"))
        .expect("client");
    let balance = client.get_balance().await.expect("balance");
    assert!((balance - 12.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn balance_error_body_is_surfaced() {
    let server = MockServer::start().await;
    mount(&server, BALANCE_PATH, "username=tester", "ERROR: AUTHENTICATION_FAILED").await;

    let client = CaptchaServiceClient::imagetyperz(transport(), &config(&server, "secret"))
        .expect("client");
    let err = client.get_balance().await.expect_err("authentication failure");
    assert_eq!(err.code(), "ERROR: AUTHENTICATION_FAILED");
}

#[tokio::test]
async fn simple_password_uploads_multipart() {
    let server = MockServer::start().await;
    mount(&server, SUBMIT_PATH, "filename=\"captcha.png\"", "4711|x7kq2").await;

    let client = CaptchaServiceClient::imagetyperz(transport(), &config(&server, "secret"))
        .expect("client");
    let solution = client
        .submit(&CaptchaImage::Bytes(b"fake png image".to_vec()))
        .await
        .expect("solution");

    assert_eq!(solution.ticket, "4711");
    assert_eq!(solution.text, "x7kq2");
}

#[tokio::test]
async fn complex_password_uploads_base64_field() {
    let server = MockServer::start().await;
    // base64("hello world!")
    mount(&server, SUBMIT_PATH, "file=aGVsbG8gd29ybGQh", "4712|abc").await;

    let client = CaptchaServiceClient::imagetyperz(transport(), &config(&server, "p@ss word"))
        .expect("client");
    let solution = client
        .submit(&CaptchaImage::Bytes(b"hello world!".to_vec()))
        .await
        .expect("solution");

    assert_eq!(solution.ticket, "4712");
    assert_eq!(solution.text, "abc");
}

#[tokio::test]
async fn controller_solves_and_refunds() {
    let server = MockServer::start().await;
    mount(&server, BALANCE_PATH, "REQUESTBALANCE", "3.10").await;
    mount(&server, SUBMIT_PATH, "UPLOADCAPTCHA", "9001|w0rd").await;
    mount(&server, REPORT_PATH, "imageid=9001", "SUCCESS").await;

    let controller = CaptchaTaskController::imagetyperz(transport(), &config(&server, "secret"))
        .expect("controller");
    let task = Arc::new(CaptchaTask::new(
        CaptchaImage::Bytes(b"image".to_vec()),
        TaskKind::Textual,
    ));

    let outcome = controller.handle(task.clone()).await;
    assert!(outcome.is_dispatched());
    outcome.join().await;

    assert_eq!(task.status(), TaskStatus::Solved);
    assert_eq!(task.result().as_deref(), Some("w0rd"));
    assert_eq!(task.ticket().as_deref(), Some("9001"));
    assert_eq!(task.service().as_deref(), Some("ImageTyperz"));

    controller.handle_invalid(&task).await;
    let refunds = server
        .received_requests()
        .await
        .expect("recorded requests")
        .into_iter()
        .filter(|request| request.url.path() == REPORT_PATH)
        .count();
    assert_eq!(refunds, 1);
}

#[tokio::test]
async fn empty_account_declines_task() {
    let server = MockServer::start().await;
    mount(&server, BALANCE_PATH, "REQUESTBALANCE", "0.00").await;

    let controller = CaptchaTaskController::imagetyperz(transport(), &config(&server, "secret"))
        .expect("controller");
    let task = Arc::new(CaptchaTask::new(
        CaptchaImage::Bytes(b"image".to_vec()),
        TaskKind::Textual,
    ));

    let outcome = controller.handle(task.clone()).await;
    assert!(matches!(
        outcome,
        HandleOutcome::Declined(DeclineReason::InsufficientCredits)
    ));
    assert_eq!(task.service(), None);
    assert_eq!(task.status(), TaskStatus::Pending);
}
