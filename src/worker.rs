//! Out-of-band folder processing.
//!
//! A single worker thread owns the [`FolderProcessor`] and answers requests
//! over a channel. Every request carries a caller-chosen correlation id and
//! the response echoes it back, so callers can wait for their own answer.

use crate::{
    classifier::Classifier, extract::PageExtractor, folder::FolderProcessor,
    report::ProcessResponse,
};
use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::path::PathBuf;
use std::thread::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FolderRequest {
    pub correlation_id: String,
    pub folder: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FolderResponse {
    pub correlation_id: String,
    pub response: ProcessResponse,
}

pub struct FolderWorker {
    requests: Option<Sender<FolderRequest>>,
    responses: Receiver<FolderResponse>,
    stash: HashMap<String, ProcessResponse>,
    handle: Option<JoinHandle<()>>,
}

impl FolderWorker {
    pub fn spawn<C, X>(processor: FolderProcessor<C, X>) -> Self
    where
        C: Classifier + Send + 'static,
        X: PageExtractor + Send + 'static,
    {
        let (req_tx, req_rx) = unbounded::<FolderRequest>();
        let (resp_tx, resp_rx) = unbounded::<FolderResponse>();

        let handle = std::thread::spawn(move || {
            for req in req_rx {
                info!("worker: folder={} id={}", req.folder.display(), req.correlation_id);
                let response = match processor.process(&req.folder, &req.correlation_id) {
                    Ok(report) => ProcessResponse::success(&report),
                    Err(err) => ProcessResponse::failure(err),
                };
                let sent = resp_tx.send(FolderResponse {
                    correlation_id: req.correlation_id,
                    response,
                });
                if sent.is_err() {
                    debug!("worker: response receiver dropped");
                    break;
                }
            }
        });

        Self {
            requests: Some(req_tx),
            responses: resp_rx,
            stash: HashMap::new(),
            handle: Some(handle),
        }
    }

    pub fn submit(&self, folder: impl Into<PathBuf>, correlation_id: impl Into<String>) -> Result<()> {
        let tx = self
            .requests
            .as_ref()
            .ok_or_else(|| anyhow!("worker is shut down"))?;
        tx.send(FolderRequest {
            correlation_id: correlation_id.into(),
            folder: folder.into(),
        })
        .map_err(|_| anyhow!("worker thread is gone"))
    }

    /// Blocks until the response for `correlation_id` arrives. Responses for
    /// other ids received meanwhile are kept for their own callers.
    pub fn wait_for(&mut self, correlation_id: &str) -> Result<ProcessResponse> {
        if let Some(resp) = self.stash.remove(correlation_id) {
            return Ok(resp);
        }
        loop {
            let msg = self
                .responses
                .recv()
                .map_err(|_| anyhow!("worker exited before answering {correlation_id}"))?;
            if msg.correlation_id == correlation_id {
                return Ok(msg.response);
            }
            self.stash.insert(msg.correlation_id, msg.response);
        }
    }

    /// Stops accepting requests and waits for queued ones to finish.
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| anyhow!("worker thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for FolderWorker {
    fn drop(&mut self) {
        let _ = self.join();
    }
}
