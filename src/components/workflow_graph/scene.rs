//! Maps a [`LayoutResult`] to drawable primitives.
//!
//! Every pass replaces the previous scene wholesale; nothing is patched.

use log::debug;

use super::layout::LayoutResult;
use super::types::{EdgeId, Point, Rect};

/// A node box with its label.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxPrimitive {
	/// Node this box draws.
	pub node_id: String,
	/// Box in graph space.
	pub rect: Rect,
	/// Text drawn inside the box.
	pub label: String,
	/// Task command for the tooltip.
	pub detail: Option<String>,
}

/// Cubic Bézier piece of a curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicSegment {
	/// Start point.
	pub start: Point,
	/// First control point.
	pub c1: Point,
	/// Second control point.
	pub c2: Point,
	/// End point.
	pub end: Point,
}

impl CubicSegment {
	/// Point on the segment at parameter `t` in `[0, 1]`.
	pub fn point_at(&self, t: f64) -> Point {
		let u = 1.0 - t;
		let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
		Point::new(
			a * self.start.x + b * self.c1.x + c * self.c2.x + d * self.end.x,
			a * self.start.y + b * self.c1.y + c * self.c2.y + d * self.end.y,
		)
	}
}

/// A smoothed edge from one box to another.
#[derive(Clone, Debug, PartialEq)]
pub struct CurvePrimitive {
	/// Edge this curve draws.
	pub edge_id: EdgeId,
	/// Source node id.
	pub from: String,
	/// Target node id.
	pub to: String,
	/// Route points the curve passes through.
	pub points: Vec<Point>,
	/// One cubic per pair of consecutive route points.
	pub segments: Vec<CubicSegment>,
}

/// Anything a scene can draw.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
	/// Node box.
	Box(BoxPrimitive),
	/// Edge curve.
	Curve(CurvePrimitive),
}

/// One render pass worth of primitives: boxes in node order, then curves in edge order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
	generation: u64,
	revision: u64,
	primitives: Vec<Primitive>,
}

impl Scene {
	/// All primitives in draw order.
	pub fn primitives(&self) -> &[Primitive] {
		&self.primitives
	}

	/// Node boxes only.
	pub fn boxes(&self) -> impl Iterator<Item = &BoxPrimitive> {
		self.primitives.iter().filter_map(|p| match p {
			Primitive::Box(b) => Some(b),
			Primitive::Curve(_) => None,
		})
	}

	/// Edge curves only.
	pub fn curves(&self) -> impl Iterator<Item = &CurvePrimitive> {
		self.primitives.iter().filter_map(|p| match p {
			Primitive::Curve(c) => Some(c),
			Primitive::Box(_) => None,
		})
	}

	/// Increments on every pass; interaction state is tied to one generation.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Revision of the model this scene was drawn from.
	pub fn revision(&self) -> u64 {
		self.revision
	}
}

/// Clear-then-draw: `previous` is consumed and dropped, never patched.
pub fn render(previous: Option<Scene>, next: &LayoutResult) -> Scene {
	let generation = match previous {
		Some(prev) => {
			debug!(
				"replacing scene {} ({} primitives)",
				prev.generation,
				prev.primitives.len()
			);
			prev.generation + 1
		}
		None => 1,
	};

	let mut primitives = Vec::with_capacity(next.nodes().len() + next.edges().len());
	primitives.extend(next.nodes().iter().map(|node| {
		Primitive::Box(BoxPrimitive {
			node_id: node.id.clone(),
			rect: node.rect(),
			label: node.label.clone(),
			detail: node.detail.clone(),
		})
	}));
	primitives.extend(next.edges().iter().map(|edge| {
		Primitive::Curve(CurvePrimitive {
			edge_id: edge.id,
			from: edge.from.clone(),
			to: edge.to.clone(),
			segments: smooth(&edge.points),
			points: edge.points.clone(),
		})
	}));

	Scene {
		generation,
		revision: next.revision(),
		primitives,
	}
}

/// Vertical-tangent Béziers through every route point, so the curve passes
/// each layer anchor heading straight down and stays C1 across joints.
fn smooth(points: &[Point]) -> Vec<CubicSegment> {
	points
		.windows(2)
		.map(|pair| {
			let (start, end) = (pair[0], pair[1]);
			let mid_y = (start.y + end.y) / 2.0;
			CubicSegment {
				start,
				c1: Point::new(start.x, mid_y),
				c2: Point::new(end.x, mid_y),
				end,
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::workflow_graph::config::LayoutConfig;
	use crate::components::workflow_graph::layout::layout;
	use crate::components::workflow_graph::types::{Edge, GraphModel, Node};

	fn laid_out(nodes: &[&str], edges: &[(&str, &str)]) -> LayoutResult {
		let model = GraphModel::new(
			nodes
				.iter()
				.map(|id| Node {
					id: id.to_string(),
					label: format!("Task {id}"),
					detail: None,
					width: 100.0,
					height: 50.0,
				})
				.collect(),
			edges
				.iter()
				.map(|(f, t)| Edge {
					from: f.to_string(),
					to: t.to_string(),
				})
				.collect(),
		)
		.unwrap();
		layout(&model, &LayoutConfig::default()).unwrap()
	}

	#[test]
	fn one_box_per_node_and_one_curve_per_edge() {
		let result = laid_out(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("a", "d")]);
		let scene = render(None, &result);
		assert_eq!(scene.boxes().count(), 4);
		assert_eq!(scene.curves().count(), 4);
		assert_eq!(scene.generation(), 1);

		let ids: Vec<&str> = scene.boxes().map(|b| b.node_id.as_str()).collect();
		assert_eq!(ids, ["a", "b", "c", "d"]);
		let first = scene.boxes().next().unwrap();
		assert_eq!(first.label, "Task a");
		assert_eq!(first.rect, result.node("a").unwrap().rect());
	}

	#[test]
	fn curves_pass_through_every_route_point() {
		let result = laid_out(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
		let scene = render(None, &result);
		for curve in scene.curves() {
			assert_eq!(curve.segments.len(), curve.points.len() - 1);
			for (segment, pair) in curve.segments.iter().zip(curve.points.windows(2)) {
				assert_eq!(segment.start, pair[0]);
				assert_eq!(segment.end, pair[1]);
				assert_eq!(segment.point_at(0.0), pair[0]);
				assert_eq!(segment.point_at(1.0), pair[1]);
			}
		}
	}

	#[test]
	fn curves_are_smoothed_not_straight() {
		let result = laid_out(&["root", "l", "r"], &[("root", "l"), ("root", "r")]);
		let scene = render(None, &result);
		let curve = scene.curves().next().unwrap();
		let segment = curve.segments[0];
		let mid = segment.point_at(0.25);
		let straight_x = segment.start.x + (segment.end.x - segment.start.x) * 0.25;
		assert!((mid.x - straight_x).abs() > 1e-6);
	}

	#[test]
	fn rerender_replaces_the_previous_scene() {
		let big = laid_out(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		let small = laid_out(&["x"], &[]);
		let first = render(None, &big);
		let second = render(Some(first), &small);
		assert_eq!(second.generation(), 2);
		assert_eq!(second.primitives().len(), 1);
		assert!(matches!(&second.primitives()[0], Primitive::Box(b) if b.node_id == "x"));
	}

	#[test]
	fn redraw_is_idempotent() {
		let result = laid_out(&["a", "b"], &[("a", "b")]);
		let once = render(None, &result);
		let twice = render(Some(once.clone()), &result);
		assert_eq!(once.primitives(), twice.primitives());
	}
}
