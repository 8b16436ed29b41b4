//! Scripted transport used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::{FilePart, HttpTransport, RequestOptions, TransportError, TransportResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    Form,
    Multipart,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    pub url: Url,
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
    pub options: RequestOptions,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

enum Reply {
    Body(String),
    Fail(String),
}

/// Replays canned replies in order and records every request it sees.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    cookies: Mutex<Vec<(Url, String)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, body: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Body(body.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Fail(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn cookies(&self) -> Vec<(Url, String)> {
        self.cookies.lock().unwrap().clone()
    }

    fn respond(&self, request: RecordedRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no more stub replies");

        match reply {
            Reply::Body(body) => Ok(TransportResponse {
                status: 200,
                url,
                body: Bytes::from(body),
            }),
            Reply::Fail(message) => Err(TransportError::Transport(message)),
        }
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(
        &self,
        url: &Url,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        self.respond(RecordedRequest {
            kind: RequestKind::Get,
            url: url.clone(),
            fields: query.to_vec(),
            file: None,
            options: RequestOptions::default(),
        })
    }

    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        self.respond(RecordedRequest {
            kind: RequestKind::Form,
            url: url.clone(),
            fields: fields.to_vec(),
            file: None,
            options: options.clone(),
        })
    }

    async fn post_multipart(
        &self,
        url: &Url,
        fields: &[(String, String)],
        file: &FilePart,
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        self.respond(RecordedRequest {
            kind: RequestKind::Multipart,
            url: url.clone(),
            fields: fields.to_vec(),
            file: Some(file.clone()),
            options: options.clone(),
        })
    }

    fn add_cookie(&self, url: &Url, cookie: &str) {
        self.cookies
            .lock()
            .unwrap()
            .push((url.clone(), cookie.to_string()));
    }
}
