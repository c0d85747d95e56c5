//! Per-canvas view state: current model, scene, transform and diagnostic.

use log::{debug, warn};

use super::config::GraphConfig;
use super::error::{GraphError, Result};
use super::interaction::InteractionController;
use super::layout::{LayoutResult, layout};
use super::scene::{Scene, render};
use super::types::{GraphModel, Point};

/// Graph-to-screen mapping: `screen = graph * k + (x, y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset.
	pub x: f64,
	/// Vertical offset.
	pub y: f64,
	/// Scale.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// Everything one canvas needs between frames.
pub struct WorkflowGraphState {
	/// Options this canvas was created with.
	pub config: GraphConfig,
	/// Current fit-to-view mapping.
	pub transform: ViewTransform,
	/// Hover and tooltip state.
	pub interaction: InteractionController,
	/// Canvas width in CSS pixels.
	pub width: f64,
	/// Canvas height in CSS pixels.
	pub height: f64,
	layout: Option<LayoutResult>,
	scene: Option<Scene>,
	revision: u64,
	diagnostic: Option<String>,
}

impl WorkflowGraphState {
	/// Empty view for a canvas of the given size.
	pub fn new(config: GraphConfig, width: f64, height: f64) -> Self {
		let mut state = Self {
			config,
			transform: ViewTransform::default(),
			interaction: InteractionController::new(),
			width,
			height,
			layout: None,
			scene: None,
			revision: 0,
			diagnostic: None,
		};
		state.fit_to_view();
		state
	}

	/// Lay out and redraw `model`.
	///
	/// A rejected model leaves the current scene untouched and becomes the
	/// diagnostic. Models older than the one on screen are ignored; a model
	/// carrying the same revision is applied again.
	pub fn apply_model(&mut self, model: &GraphModel) -> Result<()> {
		if model.revision() < self.revision {
			debug!(
				"model #{} superseded by #{}; skipped",
				model.revision(),
				self.revision
			);
			return Ok(());
		}

		let result = match layout(model, &self.config.layout) {
			Ok(result) => result,
			Err(err) => {
				self.report_error(&err);
				return Err(err);
			}
		};
		let scene = render(self.scene.take(), &result);
		self.interaction.attach(&scene);
		debug!(
			"scene {} drawn: {} layers, {} primitives",
			scene.generation(),
			result.layer_count(),
			scene.primitives().len()
		);

		self.revision = model.revision();
		self.scene = Some(scene);
		self.layout = Some(result);
		self.diagnostic = None;
		self.fit_to_view();
		Ok(())
	}

	/// Record a failure without touching what is drawn.
	pub fn report_error(&mut self, err: &GraphError) {
		warn!("keeping previous workflow diagram: {err}");
		self.diagnostic = Some(if err.is_transport() {
			format!("Could not refresh workflow: {err}")
		} else {
			format!("Workflow rejected: {err}")
		})
	}

	/// Last scene that was drawn successfully.
	pub fn scene(&self) -> Option<&Scene> {
		self.scene.as_ref()
	}

	/// Layout behind [`Self::scene`].
	pub fn layout(&self) -> Option<&LayoutResult> {
		self.layout.as_ref()
	}

	/// Message for the last rejected update, cleared by the next success.
	pub fn diagnostic(&self) -> Option<&str> {
		self.diagnostic.as_deref()
	}

	/// Fit the layout into the design area (shrinking only), then scale the
	/// design area to the canvas. Both are centered.
	fn fit_to_view(&mut self) {
		let canvas = &self.config.canvas;
		let design_scale = (self.width / canvas.width).min(self.height / canvas.height);
		let design_scale = if design_scale.is_finite() && design_scale > 0.0 {
			design_scale
		} else {
			1.0
		};

		let bounds = self.layout.as_ref().map(LayoutResult::bounds).unwrap_or_default();
		let mut fit: f64 = 1.0;
		if bounds.width > 0.0 {
			fit = fit.min((canvas.width - 2.0 * canvas.padding) / bounds.width);
		}
		if bounds.height > 0.0 {
			fit = fit.min((canvas.height - 2.0 * canvas.padding) / bounds.height);
		}
		let k = design_scale * fit.max(f64::EPSILON);
		let center = bounds.center();
		self.transform = ViewTransform {
			x: self.width / 2.0 - center.x * k,
			y: self.height / 2.0 - center.y * k,
			k,
		};
	}

	/// Map a canvas position into graph space.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Map a graph point onto the canvas.
	pub fn graph_to_screen(&self, p: Point) -> Point {
		Point::new(
			p.x * self.transform.k + self.transform.x,
			p.y * self.transform.k + self.transform.y,
		)
	}

	/// Hit-test a pointer position and enter or leave boxes accordingly.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		let hit = self
			.interaction
			.hit_test(self.screen_to_graph(sx, sy))
			.map(str::to_owned);
		match hit {
			Some(id) => {
				self.interaction.on_pointer_enter(&id, Point::new(sx, sy));
			}
			None if self.interaction.hover().is_some() => self.interaction.on_pointer_leave(),
			None => {}
		}
	}

	/// The pointer left the canvas.
	pub fn pointer_leave(&mut self) {
		self.interaction.on_pointer_leave();
	}

	/// Advance animations by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		self.interaction.tick(dt);
	}

	/// Refit after the canvas changed size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.fit_to_view();
	}
}
