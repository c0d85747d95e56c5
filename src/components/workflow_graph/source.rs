//! Fetches the workflow payload and republishes it as a [`GraphModel`].
//!
//! Every request gets a revision number. A response older than the last
//! published revision is discarded, so a slow request can never overwrite
//! a newer graph. Failures are logged and reported to error subscribers
//! but never published: whatever is on screen stays there.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::{Either, select};
use gloo_timers::future::TimeoutFuture;
use log::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Request, RequestInit, RequestMode, Response};

use super::config::GraphConfig;
use super::error::{GraphError, Result};
use super::types::GraphModel;

type UpdateFn = Rc<dyn Fn(GraphModel)>;
type ErrorFn = Rc<dyn Fn(&GraphError)>;

/// Fetches the workflow graph and notifies subscribers.
///
/// Clones share the same subscribers and revision counter.
#[derive(Clone)]
pub struct DataSource {
	inner: Rc<SourceInner>,
}

struct SourceInner {
	endpoint: String,
	timeout_ms: u32,
	workflow_index: usize,
	default_size: (f64, f64),
	next_subscriber: Cell<usize>,
	updates: RefCell<Vec<(usize, UpdateFn)>>,
	errors: RefCell<Vec<(usize, ErrorFn)>>,
	issued: Cell<u64>,
	published: Cell<u64>,
	started: Cell<bool>,
}

/// Keeps a callback registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
	id: usize,
	source: Weak<SourceInner>,
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(inner) = self.source.upgrade() {
			inner.updates.borrow_mut().retain(|(id, _)| *id != self.id);
			inner.errors.borrow_mut().retain(|(id, _)| *id != self.id);
		}
	}
}

impl DataSource {
	/// Source for the endpoint and timeout in `config`. Nothing is fetched yet.
	pub fn new(config: &GraphConfig) -> Self {
		Self {
			inner: Rc::new(SourceInner {
				endpoint: config.source.endpoint.clone(),
				timeout_ms: config.source.timeout_ms,
				workflow_index: config.source.workflow_index,
				default_size: (config.layout.node_width, config.layout.node_height),
				next_subscriber: Cell::new(0),
				updates: RefCell::new(Vec::new()),
				errors: RefCell::new(Vec::new()),
				issued: Cell::new(0),
				published: Cell::new(0),
				started: Cell::new(false),
			}),
		}
	}

	/// Receive every newly published model.
	pub fn subscribe(&self, on_update: impl Fn(GraphModel) + 'static) -> Subscription {
		let id = self.next_id();
		self.inner.updates.borrow_mut().push((id, Rc::new(on_update)));
		self.subscription(id)
	}

	/// Recoverable failures (transport, timeout, malformed payload).
	pub fn subscribe_errors(&self, on_error: impl Fn(&GraphError) + 'static) -> Subscription {
		let id = self.next_id();
		self.inner.errors.borrow_mut().push((id, Rc::new(on_error)));
		self.subscription(id)
	}

	fn next_id(&self) -> usize {
		let id = self.inner.next_subscriber.get();
		self.inner.next_subscriber.set(id + 1);
		id
	}

	fn subscription(&self, id: usize) -> Subscription {
		Subscription {
			id,
			source: Rc::downgrade(&self.inner),
		}
	}

	/// The single fetch at mount; later calls are no-ops.
	pub fn start(&self) {
		if !self.inner.started.replace(true) {
			self.refresh();
		}
	}

	/// Fetch again. The response is delivered asynchronously.
	pub fn refresh(&self) {
		let request = self.begin_request();
		let (endpoint, timeout_ms) = (self.inner.endpoint.clone(), self.inner.timeout_ms);
		let source = Rc::downgrade(&self.inner);
		debug!("fetching workflow graph from {endpoint} (request #{request})");
		spawn_local(async move {
			let body = fetch_payload(&endpoint, timeout_ms).await;
			match source.upgrade() {
				Some(inner) => inner.deliver(request, body),
				None => debug!("request #{request} finished after the source was dropped"),
			}
		});
	}

	/// Reserve the next revision number for an outgoing request.
	pub fn begin_request(&self) -> u64 {
		let request = self.inner.issued.get() + 1;
		self.inner.issued.set(request);
		request
	}

	/// Hand a response body (or its failure) for `request` to the subscribers.
	pub fn deliver(&self, request: u64, body: Result<String>) {
		self.inner.deliver(request, body);
	}

	/// Revision of the last published model, 0 if none yet.
	pub fn published_revision(&self) -> u64 {
		self.inner.published.get()
	}
}

impl SourceInner {
	fn deliver(&self, request: u64, body: Result<String>) {
		if request <= self.published.get() {
			debug!(
				"discarding response #{request}; #{} already published",
				self.published.get()
			);
			return;
		}

		let parsed = body.and_then(|json| {
			GraphModel::from_payload(&json, self.workflow_index, self.default_size)
		});
		match parsed {
			Ok(model) => {
				self.published.set(request);
				info!(
					"workflow graph #{request}: {} nodes, {} edges",
					model.nodes().len(),
					model.edges().len()
				);
				let model = model.with_revision(request);
				// callbacks may drop subscriptions, so don't hold the borrow
				let callbacks: Vec<UpdateFn> =
					self.updates.borrow().iter().map(|(_, f)| f.clone()).collect();
				for callback in callbacks {
					callback(model.clone());
				}
			}
			Err(err) => {
				warn!("workflow update #{request} rejected, keeping current view: {err}");
				let callbacks: Vec<ErrorFn> =
					self.errors.borrow().iter().map(|(_, f)| f.clone()).collect();
				for callback in callbacks {
					callback(&err);
				}
			}
		}
	}
}

async fn fetch_payload(endpoint: &str, timeout_ms: u32) -> Result<String> {
	let request = Box::pin(fetch_text(endpoint));
	let timeout = Box::pin(TimeoutFuture::new(timeout_ms));
	match select(request, timeout).await {
		Either::Left((body, _)) => body,
		Either::Right(((), _)) => Err(GraphError::Timeout { millis: timeout_ms }),
	}
}

async fn fetch_text(endpoint: &str) -> Result<String> {
	let opts = RequestInit::new();
	opts.set_method("GET");
	opts.set_mode(RequestMode::Cors);

	let request = Request::new_with_str_and_init(endpoint, &opts)
		.map_err(|e| GraphError::Fetch(format!("request error: {e:?}")))?;
	let window = web_sys::window().ok_or_else(|| GraphError::Fetch("no window".into()))?;
	let response = JsFuture::from(window.fetch_with_request(&request))
		.await
		.map_err(|e| GraphError::Fetch(format!("{e:?}")))?;
	let response: Response = response
		.dyn_into()
		.map_err(|_| GraphError::Fetch("response is not a Response".into()))?;
	if !response.ok() {
		return Err(GraphError::Fetch(format!("HTTP {}", response.status())));
	}

	let text = response
		.text()
		.map_err(|e| GraphError::Fetch(format!("body error: {e:?}")))?;
	JsFuture::from(text)
		.await
		.map_err(|e| GraphError::Fetch(format!("body error: {e:?}")))?
		.as_string()
		.ok_or_else(|| GraphError::Fetch("body is not text".into()))
}

#[cfg(test)]
mod tests {
	use super::*;

	const PAYLOAD: &str = r#"{"workflows":[{"nodes":[{"id":1,"name":"a"},{"id":2,"name":"b"}],"edges":[{"from":1,"to":2}]}]}"#;
	const OTHER: &str = r#"{"workflows":[{"nodes":[{"id":"x","name":"x"}],"edges":[]}]}"#;

	fn recording(source: &DataSource) -> (Rc<RefCell<Vec<GraphModel>>>, Subscription) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		let sub = source.subscribe(move |model| sink.borrow_mut().push(model));
		(seen, sub)
	}

	#[test]
	fn publishes_parsed_model_with_revision() {
		let source = DataSource::new(&GraphConfig::default());
		let (seen, _sub) = recording(&source);
		let request = source.begin_request();
		source.deliver(request, Ok(PAYLOAD.into()));

		let seen = seen.borrow();
		assert_eq!(seen.len(), 1);
		assert_eq!(seen[0].nodes().len(), 2);
		assert_eq!(seen[0].revision(), request);
		assert_eq!(seen[0].nodes()[0].width, 120.0);
		assert_eq!(source.published_revision(), request);
	}

	#[test]
	fn failures_are_reported_but_not_published() {
		let source = DataSource::new(&GraphConfig::default());
		let (seen, _sub) = recording(&source);
		let errors = Rc::new(RefCell::new(Vec::new()));
		let sink = errors.clone();
		let _err_sub = source.subscribe_errors(move |e| sink.borrow_mut().push(e.clone()));

		let r1 = source.begin_request();
		source.deliver(r1, Err(GraphError::Timeout { millis: 5000 }));
		let r2 = source.begin_request();
		source.deliver(r2, Ok("{\"workflows\": 3}".into()));

		assert!(seen.borrow().is_empty());
		assert_eq!(source.published_revision(), 0);
		let errors = errors.borrow();
		assert_eq!(errors[0], GraphError::Timeout { millis: 5000 });
		assert!(matches!(errors[1], GraphError::Parse(_)));
	}

	#[test]
	fn stale_responses_never_overwrite_newer_ones() {
		let source = DataSource::new(&GraphConfig::default());
		let (seen, _sub) = recording(&source);
		let older = source.begin_request();
		let newer = source.begin_request();
		source.deliver(newer, Ok(OTHER.into()));
		source.deliver(older, Ok(PAYLOAD.into()));

		let seen = seen.borrow();
		assert_eq!(seen.len(), 1);
		assert_eq!(seen[0].nodes()[0].id, "x");
	}

	#[test]
	fn dropped_subscription_stops_updates() {
		let source = DataSource::new(&GraphConfig::default());
		let (seen, sub) = recording(&source);
		drop(sub);
		let request = source.begin_request();
		source.deliver(request, Ok(PAYLOAD.into()));
		assert!(seen.borrow().is_empty());
	}

	#[test]
	fn selected_workflow_index_is_used() {
		let mut config = GraphConfig::default();
		config.source.workflow_index = 1;
		let source = DataSource::new(&config);
		let (seen, _sub) = recording(&source);
		let payload = r#"{"workflows":[
			{"nodes":[{"id":"a","name":"a"}],"edges":[]},
			{"nodes":[{"id":"b","name":"b"},{"id":"c","name":"c"}],"edges":[]}
		]}"#;
		let request = source.begin_request();
		source.deliver(request, Ok(payload.into()));
		assert_eq!(seen.borrow()[0].nodes().len(), 2);
	}
}
