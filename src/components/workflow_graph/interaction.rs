//! Hover tracking and tooltip state.
//!
//! The controller keeps its own copy of the hit areas of the scene it was
//! attached to. Attaching a new scene drops any hover immediately, so a
//! tooltip never outlives the boxes it was computed against.

use log::debug;

use super::scene::{Primitive, Scene};
use super::types::{Point, Rect};

/// Time for the tooltip to fade fully in or out.
pub const FADE_SECONDS: f64 = 0.15;

/// The box currently under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverState {
	/// Hovered node.
	pub node_id: String,
	/// Pointer position (screen space) the tooltip is anchored to.
	pub anchor: Point,
}

/// Hover state machine, borrowed from the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverPhase<'a> {
	/// No box under the pointer.
	Idle,
	/// Pointer over the box with this node id.
	Hovering(&'a str),
}

/// Tooltip contents for the hovered (or fading) node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tooltip {
	/// Node the tooltip describes.
	pub node_id: String,
	/// Node label, drawn in bold.
	pub title: String,
	/// Detail lines under the title.
	pub lines: Vec<String>,
	/// Screen position the tooltip is drawn next to.
	pub anchor: Point,
	/// 0.0 hidden, 1.0 fully shown.
	pub opacity: f64,
}

#[derive(Clone, Debug)]
struct HitTarget {
	node_id: String,
	rect: Rect,
	label: String,
	detail: Option<String>,
}

/// Hover and tooltip state for one attached scene.
#[derive(Debug, Default)]
pub struct InteractionController {
	targets: Vec<HitTarget>,
	generation: u64,
	hover: Option<HoverState>,
	tooltip: Option<Tooltip>,
}

impl InteractionController {
	/// Idle controller with no scene attached.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adopt the boxes of a freshly rendered scene, dropping any hover.
	pub fn attach(&mut self, scene: &Scene) {
		if let Some(hover) = self.hover.take() {
			debug!(
				"scene {} replaced while hovering {}; hover dropped",
				self.generation, hover.node_id
			);
		}
		self.tooltip = None;
		self.generation = scene.generation();
		self.targets = scene
			.primitives()
			.iter()
			.filter_map(|p| match p {
				Primitive::Box(b) => Some(HitTarget {
					node_id: b.node_id.clone(),
					rect: b.rect,
					label: b.label.clone(),
					detail: b.detail.clone(),
				}),
				Primitive::Curve(_) => None,
			})
			.collect();
	}

	/// Generation of the scene currently attached, 0 before the first attach.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Topmost box under `point` (graph coordinates).
	pub fn hit_test(&self, point: Point) -> Option<&str> {
		self.targets
			.iter()
			.rev()
			.find(|t| t.rect.contains(point))
			.map(|t| t.node_id.as_str())
	}

	/// Enter a box, or move within it. Unknown ids are ignored and return false.
	pub fn on_pointer_enter(&mut self, node_id: &str, pointer: Point) -> bool {
		let Some(target) = self.targets.iter().find(|t| t.node_id == node_id) else {
			return false;
		};

		let opacity = self.tooltip.as_ref().map_or(0.0, |t| t.opacity);
		let mut lines = vec![format!("id: {}", target.node_id)];
		if let Some(detail) = &target.detail {
			lines.push(format!("command: {detail}"));
		}
		self.tooltip = Some(Tooltip {
			node_id: target.node_id.clone(),
			title: target.label.clone(),
			lines,
			anchor: pointer,
			opacity,
		});
		self.hover = Some(HoverState {
			node_id: target.node_id.clone(),
			anchor: pointer,
		});
		true
	}

	/// Leave to idle; the tooltip keeps its content while it fades out.
	pub fn on_pointer_leave(&mut self) {
		self.hover = None;
	}

	/// Advance the tooltip fade by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		let hovering = self.hover.is_some();
		let Some(tooltip) = self.tooltip.as_mut() else {
			return;
		};
		let step = dt / FADE_SECONDS;
		if hovering {
			tooltip.opacity = (tooltip.opacity + step).min(1.0);
		} else {
			tooltip.opacity -= step;
			if tooltip.opacity <= 0.0 {
				self.tooltip = None;
			}
		}
	}

	/// Current hover, if any.
	pub fn hover(&self) -> Option<&HoverState> {
		self.hover.as_ref()
	}

	/// Current state machine phase.
	pub fn phase(&self) -> HoverPhase<'_> {
		match &self.hover {
			Some(h) => HoverPhase::Hovering(&h.node_id),
			None => HoverPhase::Idle,
		}
	}

	/// Visible (or fading) tooltip.
	pub fn tooltip(&self) -> Option<&Tooltip> {
		self.tooltip.as_ref().filter(|t| t.opacity > 0.0)
	}

	/// Highlight strength for a box, following the tooltip fade.
	pub fn highlight(&self, node_id: &str) -> f64 {
		self.tooltip
			.as_ref()
			.filter(|t| t.node_id == node_id)
			.map_or(0.0, |t| t.opacity)
	}
}
