//! Layered workflow diagram: payload → model → layout → scene → canvas.
//!
//! ```
//! use workflow_graph_canvas::components::workflow_graph::layout::layout;
//! use workflow_graph_canvas::components::workflow_graph::scene::render;
//! use workflow_graph_canvas::components::workflow_graph::{GraphError, GraphModel, LayoutConfig};
//!
//! let json = r#"{"workflows":[{
//!     "nodes":[{"id":1,"name":"build"},{"id":2,"name":"deploy"}],
//!     "edges":[{"from":1,"to":2}]
//! }]}"#;
//! let model = GraphModel::from_payload(json, 0, (120.0, 60.0))?;
//! let placed = layout(&model, &LayoutConfig::default())?;
//! assert_eq!(placed.layer("2"), Some(1));
//!
//! let scene = render(None, &placed);
//! assert_eq!(scene.boxes().count(), 2);
//! assert_eq!(scene.curves().count(), 1);
//! # Ok::<(), GraphError>(())
//! ```

mod component;
pub mod config;
pub mod error;
pub mod interaction;
pub mod layout;
mod render;
pub mod scene;
pub mod source;
pub mod state;
pub mod types;

pub use component::WorkflowGraphCanvas;
pub use config::{CanvasConfig, GraphConfig, LayoutConfig, SourceConfig};
pub use error::GraphError;
pub use interaction::{HoverPhase, HoverState, InteractionController, Tooltip};
pub use layout::{LayoutResult, PlacedNode, RoutedEdge};
pub use scene::{BoxPrimitive, CurvePrimitive, Primitive, Scene};
pub use source::{DataSource, Subscription};
pub use state::WorkflowGraphState;
pub use types::{Edge, EdgeId, GraphModel, Node, Point, Rect};
