//! Error taxonomy for fetching, parsing and laying out workflow graphs.

use thiserror::Error;

/// Everything that can keep a payload from reaching the screen.
///
/// None of these are fatal: the canvas keeps showing the last valid diagram.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
	/// The request could not be sent or the server answered with a failure.
	#[error("fetch failed: {0}")]
	Fetch(String),

	/// No response within the configured timeout.
	#[error("fetch timed out after {millis} ms")]
	Timeout {
		/// Timeout that elapsed.
		millis: u32,
	},

	/// The payload or config is not valid JSON of the expected shape.
	#[error("malformed workflow payload: {0}")]
	Parse(String),

	/// Two nodes share an id.
	#[error("duplicate node id `{id}`")]
	DuplicateNode {
		/// The repeated id.
		id: String,
	},

	/// An edge names a node that is not in the model.
	#[error("edge {from} -> {to} references unknown node `{missing}`")]
	DanglingEdge {
		/// Source id as given.
		from: String,
		/// Target id as given.
		to: String,
		/// Whichever endpoint is unknown.
		missing: String,
	},

	/// The edges form a cycle, so no layering exists.
	#[error("workflow graph contains a cycle through edge {from} -> {to}")]
	CyclicGraph {
		/// Source of the back edge that closes the cycle.
		from: String,
		/// Target of that back edge.
		to: String,
	},
}

impl GraphError {
	/// Network or timeout failure, as opposed to a bad payload.
	pub fn is_transport(&self) -> bool {
		matches!(self, GraphError::Fetch(_) | GraphError::Timeout { .. })
	}
}

/// Result alias used across the workflow graph modules.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transport_errors_are_classified() {
		assert!(GraphError::Fetch("offline".into()).is_transport());
		assert!(GraphError::Timeout { millis: 10 }.is_transport());
		assert!(!GraphError::Parse("bad".into()).is_transport());
		assert!(
			!GraphError::CyclicGraph {
				from: "a".into(),
				to: "b".into()
			}
			.is_transport()
		);
	}

	#[test]
	fn messages_name_the_offending_ids() {
		let err = GraphError::DanglingEdge {
			from: "1".into(),
			to: "9".into(),
			missing: "9".into(),
		};
		assert_eq!(err.to_string(), "edge 1 -> 9 references unknown node `9`");
	}
}
