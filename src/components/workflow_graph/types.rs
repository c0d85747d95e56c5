//! Graph model: validated nodes and edges plus the geometry primitives shared by
//! layout, scene and interaction.

use std::collections::HashMap;

use serde::Deserialize;

use super::error::{GraphError, Result};

/// A point in graph space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Point {
	/// Point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Axis-aligned rectangle, `x`/`y` is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	/// Left edge.
	pub x: f64,
	/// Top edge.
	pub y: f64,
	/// Horizontal extent.
	pub width: f64,
	/// Vertical extent.
	pub height: f64,
}

impl Rect {
	/// Rectangle of the given size centred on `center`.
	pub fn centered(center: Point, width: f64, height: f64) -> Self {
		Self {
			x: center.x - width / 2.0,
			y: center.y - height / 2.0,
			width,
			height,
		}
	}

	/// Right edge.
	pub fn right(&self) -> f64 {
		self.x + self.width
	}

	/// Bottom edge.
	pub fn bottom(&self) -> f64 {
		self.y + self.height
	}

	/// Centre point.
	pub fn center(&self) -> Point {
		Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}

	/// True when `p` lies inside or on the boundary.
	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
	}

	/// True when the interiors overlap; touching edges do not count.
	pub fn overlaps(&self, other: &Rect) -> bool {
		self.x < other.right()
			&& other.x < self.right()
			&& self.y < other.bottom()
			&& other.y < self.bottom()
	}

	/// Smallest rectangle covering both.
	pub fn union(&self, other: &Rect) -> Rect {
		let (x, y) = (self.x.min(other.x), self.y.min(other.y));
		Rect {
			x,
			y,
			width: self.right().max(other.right()) - x,
			height: self.bottom().max(other.bottom()) - y,
		}
	}
}

/// One workflow task.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Unique id within the model.
	pub id: String,
	/// Display name drawn inside the box.
	pub label: String,
	/// Task command, shown in the tooltip when the backend sends one.
	pub detail: Option<String>,
	/// Box width in graph units.
	pub width: f64,
	/// Box height in graph units.
	pub height: f64,
}

/// Dependency: `from` must finish before `to` starts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
	/// Source node id.
	pub from: String,
	/// Target node id.
	pub to: String,
}

/// Position of an edge in its model's edge sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// Validated, immutable workflow graph.
///
/// Node ids are unique and every edge endpoint names an existing node.
/// Acyclicity is checked later by the layout engine.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphModel {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	index: HashMap<String, usize>,
	revision: u64,
}

impl GraphModel {
	/// Build a model, rejecting duplicate ids and edges to unknown nodes.
	pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
		let mut index = HashMap::with_capacity(nodes.len());
		for (i, node) in nodes.iter().enumerate() {
			if index.insert(node.id.clone(), i).is_some() {
				return Err(GraphError::DuplicateNode {
					id: node.id.clone(),
				});
			}
		}
		for edge in &edges {
			for endpoint in [&edge.from, &edge.to] {
				if !index.contains_key(endpoint) {
					return Err(GraphError::DanglingEdge {
						from: edge.from.clone(),
						to: edge.to.clone(),
						missing: endpoint.clone(),
					});
				}
			}
		}
		Ok(Self {
			nodes,
			edges,
			index,
			revision: 0,
		})
	}

	/// Parse a backend payload of the form `{"workflows": [{"nodes": [..], "edges": [..]}]}`.
	///
	/// Nodes without an explicit size get `default_size` (width, height).
	pub fn from_payload(json: &str, workflow_index: usize, default_size: (f64, f64)) -> Result<Self> {
		let payload: WorkflowsPayload =
			serde_json::from_str(json).map_err(|e| GraphError::Parse(e.to_string()))?;
		let count = payload.workflows.len();
		let workflow = payload
			.workflows
			.into_iter()
			.nth(workflow_index)
			.ok_or_else(|| {
				GraphError::Parse(format!(
					"workflow {workflow_index} requested but payload has {count}"
				))
			})?;

		let (default_w, default_h) = default_size;
		let nodes = workflow
			.nodes
			.into_iter()
			.map(|n| Node {
				id: n.id.into_string(),
				label: n.name,
				detail: n.command,
				width: n.width.unwrap_or(default_w),
				height: n.height.unwrap_or(default_h),
			})
			.collect();
		let edges = workflow
			.edges
			.into_iter()
			.map(|e| Edge {
				from: e.from.into_string(),
				to: e.to.into_string(),
			})
			.collect();
		Self::new(nodes, edges)
	}

	/// Nodes in input order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Edges in input order; an [`EdgeId`] indexes into this slice.
	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	/// Look up a node by id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Input position of the node with this id.
	pub fn node_index(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// True when the model has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Publication counter stamped by the data source; 0 for hand-built models.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub(crate) fn with_revision(mut self, revision: u64) -> Self {
		self.revision = revision;
		self
	}
}

#[derive(Deserialize)]
struct WorkflowsPayload {
	workflows: Vec<WorkflowPayload>,
}

#[derive(Deserialize)]
struct WorkflowPayload {
	nodes: Vec<NodePayload>,
	edges: Vec<EdgePayload>,
}

#[derive(Deserialize)]
struct NodePayload {
	id: NodeKey,
	name: String,
	#[serde(default)]
	command: Option<String>,
	#[serde(default)]
	width: Option<f64>,
	#[serde(default)]
	height: Option<f64>,
}

#[derive(Deserialize)]
struct EdgePayload {
	from: NodeKey,
	to: NodeKey,
}

/// Task ids come over the wire as integers; hand-written payloads use strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeKey {
	Number(u64),
	Text(String),
}

impl NodeKey {
	fn into_string(self) -> String {
		match self {
			NodeKey::Number(n) => n.to_string(),
			NodeKey::Text(s) => s,
		}
	}
}
