//! Layered (Sugiyama-style) layout for workflow DAGs.
//!
//! Phases run in a fixed order: cycle check, longest-path layering,
//! anchor insertion for edges spanning several layers, barycenter
//! crossing reduction, coordinate assignment and edge routing.
//! Layers grow downwards; edges leave a node's bottom side and enter the
//! next node's top side.
//!
//! The output depends only on the model (including its node and edge
//! order), so identical models always produce identical results.

use std::collections::{HashMap, VecDeque};

use super::config::LayoutConfig;
use super::error::{GraphError, Result};
use super::types::{EdgeId, GraphModel, Point, Rect};

/// A model node with its layer and centre.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedNode {
	/// Node id from the model.
	pub id: String,
	/// Display name.
	pub label: String,
	/// Task command, if any.
	pub detail: Option<String>,
	/// Layer index; every edge goes to a higher layer.
	pub layer: usize,
	/// Position within its layer after crossing reduction.
	pub order: usize,
	/// Box centre in graph space.
	pub center: Point,
	/// Box width.
	pub width: f64,
	/// Box height.
	pub height: f64,
}

impl PlacedNode {
	/// Bounding box of the node.
	pub fn rect(&self) -> Rect {
		Rect::centered(self.center, self.width, self.height)
	}
}

/// An edge with its polyline route.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutedEdge {
	/// Position of the edge in the model.
	pub id: EdgeId,
	/// Source node id.
	pub from: String,
	/// Target node id.
	pub to: String,
	/// Source boundary, one anchor per crossed layer, target boundary.
	pub points: Vec<Point>,
}

/// Output of [`layout`]: placed nodes, routed edges and their bounds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
	nodes: Vec<PlacedNode>,
	edges: Vec<RoutedEdge>,
	index: HashMap<String, usize>,
	layer_count: usize,
	bounds: Rect,
	revision: u64,
}

impl LayoutResult {
	/// Placed nodes, in model order.
	pub fn nodes(&self) -> &[PlacedNode] {
		&self.nodes
	}

	/// Routed edges, in model order.
	pub fn edges(&self) -> &[RoutedEdge] {
		&self.edges
	}

	/// Placed node by id.
	pub fn node(&self, id: &str) -> Option<&PlacedNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Centre of the node with this id.
	pub fn position(&self, id: &str) -> Option<Point> {
		self.node(id).map(|n| n.center)
	}

	/// Layer of the node with this id.
	pub fn layer(&self, id: &str) -> Option<usize> {
		self.node(id).map(|n| n.layer)
	}

	/// Number of layers, 0 for an empty model.
	pub fn layer_count(&self) -> usize {
		self.layer_count
	}

	/// Smallest rectangle holding every node and every route point.
	pub fn bounds(&self) -> Rect {
		self.bounds
	}

	/// Revision of the model this layout was computed from.
	pub fn revision(&self) -> u64 {
		self.revision
	}
}

/// Lay out `model`, or reject it without producing any partial result.
pub fn layout(model: &GraphModel, config: &LayoutConfig) -> Result<LayoutResult> {
	let edges = resolve_edges(model)?;
	let count = model.nodes().len();

	let mut successors = vec![Vec::new(); count];
	for &(from, to) in &edges {
		successors[from].push(to);
	}
	check_acyclic(model, &successors)?;

	let layers = assign_layers(&successors);
	let mut graph = LayeredGraph::build(model, &edges, &layers);
	graph.reduce_crossings(config.ordering_passes);
	let (xs, layer_ys) = graph.assign_coordinates(config);

	let nodes: Vec<PlacedNode> = model
		.nodes()
		.iter()
		.enumerate()
		.map(|(i, node)| PlacedNode {
			id: node.id.clone(),
			label: node.label.clone(),
			detail: node.detail.clone(),
			layer: layers[i],
			order: graph.position[i],
			center: Point::new(xs[i], layer_ys[layers[i]]),
			width: node.width,
			height: node.height,
		})
		.collect();

	let routed: Vec<RoutedEdge> = graph
		.chains
		.iter()
		.enumerate()
		.map(|(i, chain)| {
			let (from, to) = edges[i];
			let (source, target) = (&nodes[from], &nodes[to]);
			let mut points = Vec::with_capacity(chain.len());
			points.push(Point::new(
				source.center.x,
				source.center.y + source.height / 2.0,
			));
			for &anchor in &chain[1..chain.len() - 1] {
				points.push(Point::new(xs[anchor], layer_ys[graph.layer_of[anchor]]));
			}
			points.push(Point::new(
				target.center.x,
				target.center.y - target.height / 2.0,
			));
			RoutedEdge {
				id: EdgeId(i),
				from: source.id.clone(),
				to: target.id.clone(),
				points,
			}
		})
		.collect();

	let bounds = compute_bounds(&nodes, &routed);
	let index = nodes
		.iter()
		.enumerate()
		.map(|(i, n)| (n.id.clone(), i))
		.collect();

	Ok(LayoutResult {
		nodes,
		edges: routed,
		index,
		layer_count: graph.layers.len(),
		bounds,
		revision: model.revision(),
	})
}

fn resolve_edges(model: &GraphModel) -> Result<Vec<(usize, usize)>> {
	model
		.edges()
		.iter()
		.map(|edge| {
			let lookup = |id: &String| {
				model.node_index(id).ok_or_else(|| GraphError::DanglingEdge {
					from: edge.from.clone(),
					to: edge.to.clone(),
					missing: id.clone(),
				})
			};
			Ok((lookup(&edge.from)?, lookup(&edge.to)?))
		})
		.collect()
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
	Unvisited,
	OnStack,
	Done,
}

/// Iterative DFS; a successor still on the stack is a back edge.
fn check_acyclic(model: &GraphModel, successors: &[Vec<usize>]) -> Result<()> {
	let mut marks = vec![Mark::Unvisited; successors.len()];
	for root in 0..successors.len() {
		if marks[root] != Mark::Unvisited {
			continue;
		}
		marks[root] = Mark::OnStack;
		let mut stack = vec![(root, 0usize)];
		while let Some(top) = stack.last_mut() {
			let v = top.0;
			let next = successors[v].get(top.1).copied();
			top.1 += 1;
			match next {
				Some(w) => match marks[w] {
					Mark::OnStack => {
						let nodes = model.nodes();
						return Err(GraphError::CyclicGraph {
							from: nodes[v].id.clone(),
							to: nodes[w].id.clone(),
						});
					}
					Mark::Unvisited => {
						marks[w] = Mark::OnStack;
						stack.push((w, 0));
					}
					Mark::Done => {}
				},
				None => {
					marks[v] = Mark::Done;
					stack.pop();
				}
			}
		}
	}
	Ok(())
}

/// Longest path from any source, walked in topological order.
fn assign_layers(successors: &[Vec<usize>]) -> Vec<usize> {
	let mut in_degree = vec![0usize; successors.len()];
	for targets in successors {
		for &t in targets {
			in_degree[t] += 1;
		}
	}
	let mut queue: VecDeque<usize> = (0..successors.len())
		.filter(|&v| in_degree[v] == 0)
		.collect();
	let mut layers = vec![0usize; successors.len()];
	while let Some(v) = queue.pop_front() {
		for &w in &successors[v] {
			layers[w] = layers[w].max(layers[v] + 1);
			in_degree[w] -= 1;
			if in_degree[w] == 0 {
				queue.push_back(w);
			}
		}
	}
	layers
}

/// Model nodes plus one anchor per crossed layer for every long edge.
///
/// Slots `0..n` are the model's nodes; anchors follow.
struct LayeredGraph {
	widths: Vec<f64>,
	heights: Vec<f64>,
	is_anchor: Vec<bool>,
	layer_of: Vec<usize>,
	layers: Vec<Vec<usize>>,
	position: Vec<usize>,
	above: Vec<Vec<usize>>,
	below: Vec<Vec<usize>>,
	/// Per edge, the slot path from source to target.
	chains: Vec<Vec<usize>>,
}

impl LayeredGraph {
	fn build(model: &GraphModel, edges: &[(usize, usize)], layers: &[usize]) -> Self {
		let mut graph = LayeredGraph {
			widths: model.nodes().iter().map(|n| n.width).collect(),
			heights: model.nodes().iter().map(|n| n.height).collect(),
			is_anchor: vec![false; layers.len()],
			layer_of: layers.to_vec(),
			layers: Vec::new(),
			position: Vec::new(),
			above: vec![Vec::new(); layers.len()],
			below: vec![Vec::new(); layers.len()],
			chains: Vec::with_capacity(edges.len()),
		};

		for &(from, to) in edges {
			let mut chain = vec![from];
			for layer in layers[from] + 1..layers[to] {
				let anchor = graph.push_anchor(layer);
				graph.link(*chain.last().unwrap_or(&from), anchor);
				chain.push(anchor);
			}
			graph.link(*chain.last().unwrap_or(&from), to);
			chain.push(to);
			graph.chains.push(chain);
		}

		let depth = graph.layer_of.iter().max().map_or(0, |&l| l + 1);
		graph.layers = vec![Vec::new(); depth];
		for slot in 0..graph.layer_of.len() {
			graph.layers[graph.layer_of[slot]].push(slot);
		}
		graph.position = vec![0; graph.layer_of.len()];
		graph.refresh_positions();
		graph
	}

	fn push_anchor(&mut self, layer: usize) -> usize {
		self.widths.push(0.0);
		self.heights.push(0.0);
		self.is_anchor.push(true);
		self.layer_of.push(layer);
		self.above.push(Vec::new());
		self.below.push(Vec::new());
		self.layer_of.len() - 1
	}

	fn link(&mut self, upper: usize, lower: usize) {
		self.below[upper].push(lower);
		self.above[lower].push(upper);
	}

	fn refresh_positions(&mut self) {
		for layer in &self.layers {
			for (i, &slot) in layer.iter().enumerate() {
				self.position[slot] = i;
			}
		}
	}

	/// Alternate downward and upward barycenter sweeps, keeping the best ordering seen.
	fn reduce_crossings(&mut self, passes: usize) {
		let mut best = self.layers.clone();
		let mut best_crossings = self.crossings();
		for _ in 0..passes {
			if best_crossings == 0 {
				break;
			}
			for l in 1..self.layers.len() {
				self.sort_layer(l, true);
			}
			for l in (0..self.layers.len().saturating_sub(1)).rev() {
				self.sort_layer(l, false);
			}
			let crossings = self.crossings();
			if crossings < best_crossings {
				best_crossings = crossings;
				best = self.layers.clone();
			}
		}
		self.layers = best;
		self.refresh_positions();
	}

	fn sort_layer(&mut self, layer: usize, by_upper: bool) {
		let neighbours = if by_upper { &self.above } else { &self.below };
		let mut keyed: Vec<(f64, usize)> = self.layers[layer]
			.iter()
			.enumerate()
			.map(|(i, &slot)| {
				let adjacent = &neighbours[slot];
				let key = if adjacent.is_empty() {
					i as f64
				} else {
					adjacent.iter().map(|&n| self.position[n] as f64).sum::<f64>()
						/ adjacent.len() as f64
				};
				(key, slot)
			})
			.collect();
		keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
		self.layers[layer] = keyed.into_iter().map(|(_, slot)| slot).collect();
		for (i, &slot) in self.layers[layer].iter().enumerate() {
			self.position[slot] = i;
		}
	}

	fn crossings(&self) -> usize {
		let mut total = 0;
		for upper in self.layers.iter().take(self.layers.len().saturating_sub(1)) {
			let segments: Vec<(usize, usize)> = upper
				.iter()
				.flat_map(|&a| self.below[a].iter().map(move |&b| (a, b)))
				.map(|(a, b)| (self.position[a], self.position[b]))
				.collect();
			for (i, &(a1, b1)) in segments.iter().enumerate() {
				for &(a2, b2) in &segments[i + 1..] {
					if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
						total += 1;
					}
				}
			}
		}
		total
	}

	fn separation(&self, left: usize, right: usize, gap: f64) -> f64 {
		let gap = if self.is_anchor[left] || self.is_anchor[right] {
			gap / 2.0
		} else {
			gap
		};
		(self.widths[left] + self.widths[right]) / 2.0 + gap
	}

	/// Returns x per slot and y per layer (centers), normalised to a top-left origin.
	fn assign_coordinates(&self, config: &LayoutConfig) -> (Vec<f64>, Vec<f64>) {
		let mut layer_ys = Vec::with_capacity(self.layers.len());
		let mut top = 0.0;
		for layer in &self.layers {
			let height = layer.iter().map(|&s| self.heights[s]).fold(0.0, f64::max);
			layer_ys.push(top + height / 2.0);
			top += height + config.vertical_gap;
		}

		let gap = config.horizontal_gap;
		let mut xs = vec![0.0; self.layer_of.len()];
		for layer in &self.layers {
			let mut cursor = 0.0;
			for (i, &slot) in layer.iter().enumerate() {
				if i > 0 {
					cursor += self.separation(layer[i - 1], slot, gap);
				}
				xs[slot] = cursor;
			}
			for &slot in layer {
				xs[slot] -= cursor / 2.0;
			}
		}

		for _ in 0..2 {
			for l in 1..self.layers.len() {
				self.straighten(&mut xs, l, &self.above, gap);
			}
			for l in (0..self.layers.len().saturating_sub(1)).rev() {
				self.straighten(&mut xs, l, &self.below, gap);
			}
		}

		let left = (0..xs.len())
			.map(|s| xs[s] - self.widths[s] / 2.0)
			.fold(f64::INFINITY, f64::min);
		if left.is_finite() {
			for x in &mut xs {
				*x -= left;
			}
		}
		(xs, layer_ys)
	}

	/// Pull each slot toward the mean x of its neighbours without reordering
	/// or breaking separation: average of a left-packed and a right-packed placement.
	fn straighten(&self, xs: &mut [f64], layer: usize, neighbours: &[Vec<usize>], gap: f64) {
		let slots = &self.layers[layer];
		if slots.is_empty() {
			return;
		}
		let desired: Vec<f64> = slots
			.iter()
			.map(|&s| {
				let adjacent = &neighbours[s];
				if adjacent.is_empty() {
					xs[s]
				} else {
					adjacent.iter().map(|&n| xs[n]).sum::<f64>() / adjacent.len() as f64
				}
			})
			.collect();

		let mut from_left = desired.clone();
		for i in 1..slots.len() {
			let min = from_left[i - 1] + self.separation(slots[i - 1], slots[i], gap);
			from_left[i] = from_left[i].max(min);
		}
		let mut from_right = desired;
		for i in (0..slots.len() - 1).rev() {
			let max = from_right[i + 1] - self.separation(slots[i], slots[i + 1], gap);
			from_right[i] = from_right[i].min(max);
		}
		for (i, &slot) in slots.iter().enumerate() {
			xs[slot] = (from_left[i] + from_right[i]) / 2.0;
		}
	}
}

fn compute_bounds(nodes: &[PlacedNode], edges: &[RoutedEdge]) -> Rect {
	let mut rects = nodes.iter().map(PlacedNode::rect).chain(
		edges
			.iter()
			.flat_map(|e| e.points.iter())
			.map(|&p| Rect::centered(p, 0.0, 0.0)),
	);
	match rects.next() {
		Some(first) => rects.fold(first, |acc, r| acc.union(&r)),
		None => Rect::default(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::workflow_graph::types::{Edge, Node};

	fn model(nodes: &[&str], edges: &[(&str, &str)]) -> GraphModel {
		GraphModel::new(
			nodes
				.iter()
				.map(|id| Node {
					id: id.to_string(),
					label: id.to_uppercase(),
					detail: None,
					width: 120.0,
					height: 60.0,
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
		.unwrap()
	}

	fn run(m: &GraphModel) -> LayoutResult {
		layout(m, &LayoutConfig::default()).unwrap()
	}

	#[test]
	fn chain_layers_increase_and_boxes_do_not_overlap() {
		let result = run(&model(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		assert_eq!(result.layer("a"), Some(0));
		assert_eq!(result.layer("b"), Some(1));
		assert_eq!(result.layer("c"), Some(2));
		let rects: Vec<Rect> = result.nodes().iter().map(PlacedNode::rect).collect();
		for (i, a) in rects.iter().enumerate() {
			for b in &rects[i + 1..] {
				assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
			}
		}
	}

	#[test]
	fn every_edge_points_to_a_higher_layer() {
		let m = model(
			&["fetch", "clean", "split", "train", "eval", "report"],
			&[
				("fetch", "clean"),
				("clean", "split"),
				("split", "train"),
				("split", "eval"),
				("train", "eval"),
				("fetch", "report"),
				("eval", "report"),
			],
		);
		let result = run(&m);
		for edge in m.edges() {
			assert!(result.layer(&edge.to) > result.layer(&edge.from), "{edge:?}");
		}
		// longest path, not shortest: report sits below eval
		assert_eq!(result.layer("report"), Some(5));
	}

	#[test]
	fn layout_is_deterministic() {
		let m = model(
			&["a", "b", "c", "d", "e"],
			&[("a", "c"), ("b", "c"), ("a", "d"), ("c", "e"), ("d", "e"), ("b", "e")],
		);
		assert_eq!(run(&m), run(&m));
	}

	#[test]
	fn two_node_cycle_is_rejected() {
		let m = model(&["a", "b"], &[("a", "b"), ("b", "a")]);
		assert_eq!(
			layout(&m, &LayoutConfig::default()),
			Err(GraphError::CyclicGraph {
				from: "b".into(),
				to: "a".into()
			})
		);
	}

	#[test]
	fn self_loop_and_deep_cycles_are_rejected() {
		let self_loop = model(&["a"], &[("a", "a")]);
		assert!(matches!(
			layout(&self_loop, &LayoutConfig::default()),
			Err(GraphError::CyclicGraph { .. })
		));
		let deep = model(
			&["root", "a", "b", "c"],
			&[("root", "a"), ("a", "b"), ("b", "c"), ("c", "a")],
		);
		assert!(matches!(
			layout(&deep, &LayoutConfig::default()),
			Err(GraphError::CyclicGraph { .. })
		));
	}

	#[test]
	fn long_edges_route_through_anchors() {
		let result = run(&model(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]));
		let long = &result.edges()[2];
		assert_eq!(long.id, EdgeId(2));
		assert_eq!(long.points.len(), 3);

		let a = result.node("a").unwrap().rect();
		let c = result.node("c").unwrap().rect();
		assert_eq!(long.points[0].y, a.bottom());
		assert!(a.contains(long.points[0]));
		assert_eq!(long.points[2].y, c.y);
		assert!(c.contains(long.points[2]));
		assert_eq!(long.points[1].y, result.position("b").unwrap().y);
		assert_eq!(result.edges()[0].points.len(), 2);
	}

	#[test]
	fn barycenter_untangles_crossed_pair() {
		// c hangs off b and d off a; input order would cross
		let result = run(&model(&["a", "b", "c", "d"], &[("a", "d"), ("b", "c")]));
		assert!(result.position("d").unwrap().x < result.position("c").unwrap().x);
		assert_eq!(result.node("d").unwrap().order, 0);
	}

	#[test]
	fn siblings_keep_the_horizontal_gap() {
		let result = run(&model(&["root", "l", "r"], &[("root", "l"), ("root", "r")]));
		let (l, r) = (result.node("l").unwrap().rect(), result.node("r").unwrap().rect());
		assert!(r.x - l.right() >= 40.0 - 1e-9);
		// parent centered over its children
		let root = result.position("root").unwrap();
		assert!((root.x - (l.center().x + r.center().x) / 2.0).abs() < 1e-9);
	}

	#[test]
	fn bounds_start_at_origin_and_cover_all_nodes() {
		let result = run(&model(&["a", "b", "c"], &[("a", "b"), ("a", "c")]));
		let bounds = result.bounds();
		assert_eq!((bounds.x, bounds.y), (0.0, 0.0));
		for node in result.nodes() {
			let r = node.rect();
			assert!(r.x >= bounds.x && r.right() <= bounds.right() + 1e-9);
			assert!(r.bottom() <= bounds.bottom() + 1e-9);
		}
	}

	#[test]
	fn empty_model_lays_out_to_nothing() {
		let result = run(&model(&[], &[]));
		assert!(result.nodes().is_empty());
		assert_eq!(result.layer_count(), 0);
		assert_eq!(result.bounds(), Rect::default());
	}
}
