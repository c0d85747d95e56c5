//! Options for layout, data source and canvas, all with serde defaults.

use serde::Deserialize;

use super::error::{GraphError, Result};

/// Backend route serving the workflow graph JSON.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/workflow/graph";

/// Options a hosting application may override. Any subset can be given as JSON.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
	/// Node sizes and spacing.
	pub layout: LayoutConfig,
	/// Where and how to fetch.
	pub source: SourceConfig,
	/// Logical drawing surface.
	pub canvas: CanvasConfig,
}

impl GraphConfig {
	/// Parse a partial config; missing keys keep their defaults.
	pub fn from_json(json: &str) -> Result<Self> {
		serde_json::from_str(json).map_err(|e| GraphError::Parse(format!("config: {e}")))
	}

	/// Replace the fetch endpoint.
	pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.source.endpoint = endpoint.into();
		self
	}
}

/// Sizes and gaps used by the layered layout.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Width for nodes the payload does not size.
	pub node_width: f64,
	/// Height for nodes the payload does not size.
	pub node_height: f64,
	/// Minimum space between neighbours in a layer.
	pub horizontal_gap: f64,
	/// Space between the bottom of one layer and the top of the next.
	pub vertical_gap: f64,
	/// Down+up barycenter sweeps used for crossing reduction.
	pub ordering_passes: usize,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			node_width: 120.0,
			node_height: 60.0,
			horizontal_gap: 40.0,
			vertical_gap: 80.0,
			ordering_passes: 4,
		}
	}
}

/// Fetch settings for the data source.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
	/// URL answering GET with the workflows payload.
	pub endpoint: String,
	/// Requests still pending after this many milliseconds fail with a timeout.
	pub timeout_ms: u32,
	/// Which entry of the `workflows` array to show.
	pub workflow_index: usize,
}

impl Default for SourceConfig {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_ENDPOINT.into(),
			timeout_ms: 5_000,
			workflow_index: 0,
		}
	}
}

/// Logical drawing surface, scaled to fit whatever container hosts the canvas.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
	/// Design width.
	pub width: f64,
	/// Design height.
	pub height: f64,
	/// Margin kept free around the diagram when fitting.
	pub padding: f64,
}

impl Default for CanvasConfig {
	fn default() -> Self {
		Self {
			width: 800.0,
			height: 600.0,
			padding: 24.0,
		}
	}
}
