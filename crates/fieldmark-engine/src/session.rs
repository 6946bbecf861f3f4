//! Page session actor.
//!
//! One task owns everything that touches a page: the DOM, the learning
//! controller, the mutation watcher and the binding cache. Host events
//! arrive over an unbounded channel and are handled one at a time, so no
//! locking is needed. Mutation records produced while handling the events
//! of one scheduling turn are delivered to the watcher together at the end
//! of that turn. Results are published on a `watch` channel.

use crate::storage::{load_bindings, save_pending, KeyValueStore};
use fieldmark_common::{ExtractionResult, MutationRecord, NodeId, Request, Response};
use fieldmark_core::config::FieldmarkConfig;
use fieldmark_core::{
    ClickEvent, ClickOutcome, ClickResult, Dom, FieldClassifier, LearningController,
    LocatorStore, MutationWatcher,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Page session closed")]
    Closed,
}

pub type BoxedClassifier = Box<dyn FieldClassifier + Send>;

/// Host-originated input to a running session.
pub enum PageEvent<D> {
    /// A request from the UI context. Exactly one response is sent.
    Message {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    PointerOver(NodeId),
    Click {
        event: ClickEvent,
        reply: Option<oneshot::Sender<ClickResult>>,
    },
    /// Arbitrary page script, e.g. a framework re-render.
    Edit(Box<dyn FnOnce(&mut D) + Send>),
    Unload,
}

pub struct PageSession<D, S> {
    dom: D,
    kv: S,
    bindings: LocatorStore,
    learner: LearningController,
    watcher: MutationWatcher,
    classifier: BoxedClassifier,
    results: watch::Sender<ExtractionResult>,
}

impl<D, S> PageSession<D, S>
where
    D: Dom + Send,
    S: KeyValueStore,
{
    /// Reads stored bindings, starts the watcher and publishes the first
    /// extraction. A store that cannot be read leaves the session without
    /// bindings.
    pub async fn open(
        mut dom: D,
        kv: S,
        config: &FieldmarkConfig,
        classifier: BoxedClassifier,
    ) -> Self {
        let bindings = match load_bindings(&kv).await {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!("Failed to read stored bindings: {}", e);
                LocatorStore::new()
            }
        };
        dom.take_mutation_records();

        let (results, _) = watch::channel(ExtractionResult::default());
        let mut session = Self {
            dom,
            kv,
            bindings,
            learner: LearningController::new(&config.learning),
            watcher: MutationWatcher::new(&config.watcher),
            classifier,
            results,
        };

        let initial = session.watcher.start(&session.dom, &mut session.bindings);
        session.publish(initial);
        session.flush().await;
        session
    }

    pub fn subscribe(&self) -> watch::Receiver<ExtractionResult> {
        self.results.subscribe()
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn bindings(&self) -> &LocatorStore {
        &self.bindings
    }

    pub fn learner(&self) -> &LearningController {
        &self.learner
    }

    pub fn watcher(&self) -> &MutationWatcher {
        &self.watcher
    }

    pub async fn handle_request(&mut self, request: Request) -> Response {
        debug!(request = ?request, "Handling request");
        match request {
            Request::EnableSelection { mode } => {
                self.learner.enable(&mut self.dom, &self.bindings, mode);
                Response::ok()
            }
            Request::DisableSelection => {
                self.learner.disable(&mut self.dom);
                Response::ok()
            }
            Request::Extract => {
                let result = self.watcher.refresh(&self.dom, &mut self.bindings);
                self.publish(result.clone());
                self.flush().await;
                Response::with_result(result)
            }
        }
    }

    pub fn pointer_over(&mut self, node: NodeId) -> bool {
        self.learner.pointer_over(&mut self.dom, node)
    }

    pub async fn click(&mut self, event: &ClickEvent) -> ClickResult {
        let result = self.learner.click(
            &mut self.dom,
            &mut self.bindings,
            event,
            self.classifier.as_mut(),
        );

        if matches!(result.outcome, ClickOutcome::Committed(_)) {
            let extracted = self.watcher.start(&self.dom, &mut self.bindings);
            self.publish(extracted);
            self.flush().await;
        }
        result
    }

    /// Feeds mutation batches to the watcher, merged into one when the
    /// watcher coalesces.
    pub async fn deliver(&mut self, batches: Vec<Vec<MutationRecord>>) {
        if batches.is_empty() {
            return;
        }

        let batches = if self.watcher.coalesces() {
            vec![batches.into_iter().flatten().collect()]
        } else {
            batches
        };

        for batch in batches {
            if let Some(result) = self.watcher.on_batch(&self.dom, &mut self.bindings, &batch) {
                self.publish(result);
            }
        }
        self.flush().await;
    }

    /// Drains the DOM's queued records and delivers them as one batch.
    pub async fn pump(&mut self) {
        let records = self.dom.take_mutation_records();
        if !records.is_empty() {
            self.deliver(vec![records]).await;
        }
    }

    /// Writes changed bindings. Failures are logged and dropped.
    pub async fn flush(&mut self) {
        match save_pending(&self.kv, &mut self.bindings).await {
            Ok(0) => {}
            Ok(count) => debug!(keys = count, "Persisted bindings"),
            Err(e) => warn!("Failed to persist bindings: {}", e),
        }
    }

    pub async fn teardown(&mut self) {
        self.learner.disable(&mut self.dom);
        self.watcher.stop();
        self.dom.take_mutation_records();
        self.flush().await;
        info!("Page session closed");
    }

    fn publish(&self, result: ExtractionResult) {
        self.results.send_replace(result);
    }

    /// Returns `true` when the event ends the session.
    async fn dispatch(&mut self, event: PageEvent<D>, batches: &mut Vec<Vec<MutationRecord>>) -> bool {
        let unload = match event {
            PageEvent::Message { request, reply } => {
                let response = self.handle_request(request).await;
                if reply.send(response).is_err() {
                    debug!("Requester went away before the response");
                }
                false
            }
            PageEvent::PointerOver(node) => {
                self.pointer_over(node);
                false
            }
            PageEvent::Click { event, reply } => {
                let result = self.click(&event).await;
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
                false
            }
            PageEvent::Edit(edit) => {
                edit(&mut self.dom);
                false
            }
            PageEvent::Unload => true,
        };

        let records = self.dom.take_mutation_records();
        if !records.is_empty() {
            batches.push(records);
        }
        unload
    }

    /// Event loop. Every event already queued when a turn starts is handled
    /// in that turn before the watcher sees the turn's mutations. Returns
    /// the DOM once the channel closes or the page unloads.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<PageEvent<D>>) -> D {
        while let Some(event) = events.recv().await {
            let mut batches = Vec::new();
            let mut unload = self.dispatch(event, &mut batches).await;
            while !unload {
                match events.try_recv() {
                    Ok(event) => unload = self.dispatch(event, &mut batches).await,
                    Err(_) => break,
                }
            }

            if unload {
                break;
            }
            self.deliver(batches).await;
        }

        self.teardown().await;
        self.dom
    }
}

impl<D, S> PageSession<D, S>
where
    D: Dom + Send + 'static,
    S: KeyValueStore + 'static,
{
    /// Runs the session on its own task.
    pub fn spawn(self) -> PageHandle<D> {
        let (events, rx) = mpsc::unbounded_channel();
        let results = self.subscribe();
        let task = tokio::spawn(self.run(rx));
        PageHandle {
            events,
            results,
            task,
        }
    }
}

/// Host side of a spawned session.
pub struct PageHandle<D> {
    events: mpsc::UnboundedSender<PageEvent<D>>,
    results: watch::Receiver<ExtractionResult>,
    task: JoinHandle<D>,
}

impl<D: Send + 'static> PageHandle<D> {
    fn post(&self, event: PageEvent<D>) -> Result<(), SessionError> {
        self.events.send(event).map_err(|_| SessionError::Closed)
    }

    pub async fn request(&self, request: Request) -> Result<Response, SessionError> {
        let (reply, response) = oneshot::channel();
        self.post(PageEvent::Message { request, reply })?;
        response.await.map_err(|_| SessionError::Closed)
    }

    pub fn pointer_over(&self, node: NodeId) -> Result<(), SessionError> {
        self.post(PageEvent::PointerOver(node))
    }

    pub async fn click(&self, event: ClickEvent) -> Result<ClickResult, SessionError> {
        let (reply, result) = oneshot::channel();
        self.post(PageEvent::Click {
            event,
            reply: Some(reply),
        })?;
        result.await.map_err(|_| SessionError::Closed)
    }

    pub fn edit<F>(&self, edit: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut D) + Send + 'static,
    {
        self.post(PageEvent::Edit(Box::new(edit)))
    }

    pub fn results(&self) -> watch::Receiver<ExtractionResult> {
        self.results.clone()
    }

    /// Unloads the page and waits for the session to finish.
    pub async fn close(self) -> Result<D, SessionError> {
        // The session may already be gone; the join below reports that.
        let _ = self.events.send(PageEvent::Unload);
        self.task.await.map_err(|_| SessionError::Closed)
    }
}
