use std::cell::RefCell;
use std::rc::Rc;

use workflow_graph_canvas::components::workflow_graph::layout::layout;
use workflow_graph_canvas::components::workflow_graph::scene::render;
use workflow_graph_canvas::components::workflow_graph::{
	DataSource, GraphConfig, GraphError, GraphModel, HoverPhase, LayoutConfig, Rect,
	Subscription, WorkflowGraphState,
};

const CHAIN: &str = r#"{"workflows":[{
	"nodes":[{"id":"A","name":"Extract"},{"id":"B","name":"Transform"},{"id":"C","name":"Load"}],
	"edges":[{"from":"A","to":"B"},{"from":"B","to":"C"}]
}]}"#;

const CYCLE: &str = r#"{"workflows":[{
	"nodes":[{"id":"A","name":"a"},{"id":"B","name":"b"}],
	"edges":[{"from":"A","to":"B"},{"from":"B","to":"A"}]
}]}"#;

/// Wire a source to a view state the way the canvas component does.
fn wired(source: &DataSource) -> (Rc<RefCell<WorkflowGraphState>>, Vec<Subscription>) {
	let state = Rc::new(RefCell::new(WorkflowGraphState::new(
		GraphConfig::default(),
		800.0,
		600.0,
	)));
	let on_update = {
		let state = state.clone();
		source.subscribe(move |model| {
			let _ = state.borrow_mut().apply_model(&model);
		})
	};
	let on_error = {
		let state = state.clone();
		source.subscribe_errors(move |err| state.borrow_mut().report_error(err))
	};
	(state, vec![on_update, on_error])
}

#[test]
fn chain_scenario_produces_monotonic_layers_and_separate_boxes() {
	let model = GraphModel::from_payload(CHAIN, 0, (120.0, 60.0)).unwrap();
	let result = layout(&model, &LayoutConfig::default()).unwrap();
	assert_eq!(result.layer("A"), Some(0));
	assert_eq!(result.layer("B"), Some(1));
	assert_eq!(result.layer("C"), Some(2));

	let scene = render(None, &result);
	let rects: Vec<Rect> = scene.boxes().map(|b| b.rect).collect();
	assert_eq!(rects.len(), 3);
	assert_eq!(scene.curves().count(), 2);
	for (i, a) in rects.iter().enumerate() {
		for b in &rects[i + 1..] {
			assert!(!a.overlaps(b));
		}
	}
}

#[test]
fn timeout_after_render_keeps_the_previous_scene() {
	let source = DataSource::new(&GraphConfig::default());
	let (state, _subs) = wired(&source);

	let first = source.begin_request();
	source.deliver(first, Ok(CHAIN.into()));
	let drawn = state.borrow().scene().cloned().unwrap();
	assert_eq!(drawn.boxes().count(), 3);

	let second = source.begin_request();
	source.deliver(second, Err(GraphError::Timeout { millis: 5000 }));

	let state = state.borrow();
	assert_eq!(state.scene(), Some(&drawn));
	assert!(state.diagnostic().unwrap().contains("timed out"));
}

#[test]
fn cyclic_payload_is_rejected_and_previous_view_kept() {
	let source = DataSource::new(&GraphConfig::default());
	let (state, _subs) = wired(&source);

	let first = source.begin_request();
	source.deliver(first, Ok(CHAIN.into()));
	let drawn = state.borrow().scene().cloned();

	let second = source.begin_request();
	source.deliver(second, Ok(CYCLE.into()));
	let state = state.borrow();
	assert_eq!(state.scene().cloned(), drawn);
	assert!(state.diagnostic().unwrap().contains("cycle"));
}

#[test]
fn refresh_replaces_scene_and_drops_hover() {
	let source = DataSource::new(&GraphConfig::default());
	let (state, _subs) = wired(&source);
	let first = source.begin_request();
	source.deliver(first, Ok(CHAIN.into()));

	{
		let mut s = state.borrow_mut();
		let b = s.layout().unwrap().position("B").unwrap();
		let on_b = s.graph_to_screen(b);
		s.pointer_move(on_b.x, on_b.y);
		assert_eq!(s.interaction.phase(), HoverPhase::Hovering("B"));
	}

	let smaller = r#"{"workflows":[{"nodes":[{"id":7,"name":"only"}],"edges":[]}]}"#;
	let second = source.begin_request();
	source.deliver(second, Ok(smaller.into()));

	let s = state.borrow();
	assert_eq!(s.interaction.phase(), HoverPhase::Idle);
	let scene = s.scene().unwrap();
	assert_eq!(scene.generation(), 2);
	assert_eq!(scene.revision(), second);
	assert_eq!(scene.boxes().map(|b| b.node_id.as_str()).collect::<Vec<_>>(), ["7"]);
}
