//! Work-done progress for long-running server work

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tower_lsp::Client;
use tower_lsp::lsp_types::notification::Progress as ProgressNotification;
use tower_lsp::lsp_types::request::WorkDoneProgressCreate;
use tower_lsp::lsp_types::{
    NumberOrString, ProgressParams, ProgressParamsValue, WorkDoneProgress, WorkDoneProgressBegin,
    WorkDoneProgressCreateParams, WorkDoneProgressEnd, WorkDoneProgressReport,
};

/// Receives `begin`, any number of `report`, then `end`.
#[async_trait]
pub trait Progress: Send + Sync {
    async fn begin(&self, title: &str);

    async fn report(&self, message: String, percentage: Option<u32>);

    async fn end(&self, message: String);
}

/// Drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

#[async_trait]
impl Progress for Silent {
    async fn begin(&self, _title: &str) {}

    async fn report(&self, _message: String, _percentage: Option<u32>) {}

    async fn end(&self, _message: String) {}
}

/// `$/progress` notifications sent to the editor under one token.
///
/// The token is created on `begin`. If the client refuses it, the later
/// updates are dropped.
#[derive(Debug)]
pub struct ClientProgress {
    client: Client,
    token: NumberOrString,
    active: AtomicBool,
}

impl ClientProgress {
    #[must_use]
    pub fn new(client: Client, token: &str) -> Self {
        Self {
            client,
            token: NumberOrString::String(token.to_string()),
            active: AtomicBool::new(false),
        }
    }

    async fn send(&self, value: WorkDoneProgress) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        self.client
            .send_notification::<ProgressNotification>(ProgressParams {
                token: self.token.clone(),
                value: ProgressParamsValue::WorkDone(value),
            })
            .await;
    }
}

#[async_trait]
impl Progress for ClientProgress {
    async fn begin(&self, title: &str) {
        let created = self
            .client
            .send_request::<WorkDoneProgressCreate>(WorkDoneProgressCreateParams {
                token: self.token.clone(),
            })
            .await;
        if let Err(error) = created {
            tracing::warn!(%error, "client refused progress token");
            return;
        }
        self.active.store(true, Ordering::Release);
        self.send(WorkDoneProgress::Begin(WorkDoneProgressBegin {
            title: title.to_string(),
            cancellable: Some(false),
            message: None,
            percentage: Some(0),
        }))
        .await;
    }

    async fn report(&self, message: String, percentage: Option<u32>) {
        self.send(WorkDoneProgress::Report(WorkDoneProgressReport {
            cancellable: Some(false),
            message: Some(message),
            percentage,
        }))
        .await;
    }

    async fn end(&self, message: String) {
        self.send(WorkDoneProgress::End(WorkDoneProgressEnd {
            message: Some(message),
        }))
        .await;
        self.active.store(false, Ordering::Release);
    }
}
