use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, Window};

use super::config::{CanvasConfig, GraphConfig};
use super::render;
use super::source::{DataSource, Subscription};
use super::state::WorkflowGraphState;

const FRAME_SECONDS: f64 = 0.016;

/// Canvas that fetches a workflow, lays it out and shows a tooltip on hover.
#[component]
pub fn WorkflowGraphCanvas(
	/// Layout, source and canvas options; defaults when omitted.
	#[prop(optional)]
	config: Option<GraphConfig>,
	/// Every change of this signal re-fetches the workflow.
	#[prop(optional, into)]
	refresh: Option<Signal<u32>>,
	/// `Some(message)` when an update was rejected, `None` once one succeeds.
	#[prop(optional)]
	on_diagnostic: Option<Callback<Option<String>>>,
) -> impl IntoView {
	let config = config.unwrap_or_default();
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let source = DataSource::new(&config);
	let state: Rc<RefCell<Option<WorkflowGraphState>>> = Rc::new(RefCell::new(None));
	let subscriptions: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let mounted = RwSignal::new(true);
	on_cleanup(move || mounted.set(false));

	let (state_init, animate_init, resize_cb_init, subs_init, source_init) = (
		state.clone(),
		animate.clone(),
		resize_cb.clone(),
		subscriptions.clone(),
		source.clone(),
	);

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if state_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			error!("workflow graph mounted without a window");
			return;
		};
		let Some(ctx) = context_2d(&canvas) else {
			error!("canvas has no 2d context");
			return;
		};

		let (w, h) = fit_canvas(&canvas, &config.canvas);
		*state_init.borrow_mut() = Some(WorkflowGraphState::new(config.clone(), w, h));

		let state_update = state_init.clone();
		let on_update = source_init.subscribe(move |model| {
			if let Some(ref mut s) = *state_update.borrow_mut() {
				let outcome = s.apply_model(&model);
				if let Some(cb) = on_diagnostic {
					cb.run(outcome.err().and(s.diagnostic().map(str::to_owned)));
				}
			}
		});
		let state_error = state_init.clone();
		let on_error = source_init.subscribe_errors(move |err| {
			if let Some(ref mut s) = *state_error.borrow_mut() {
				s.report_error(err);
				if let Some(cb) = on_diagnostic {
					cb.run(s.diagnostic().map(str::to_owned));
				}
			}
		});
		subs_init.borrow_mut().extend([on_update, on_error]);
		source_init.start();

		let (state_resize, canvas_resize, design) =
			(state_init.clone(), canvas.clone(), config.canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let (nw, nh) = fit_canvas(&canvas_resize, &design);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner, resize_teardown, subs_teardown) = (
			state_init.clone(),
			animate_init.clone(),
			resize_cb_init.clone(),
			subs_init.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win): Option<Window> = web_sys::window() else {
				return;
			};
			if !mounted.try_get_untracked().unwrap_or(false) {
				info!("workflow graph unmounted; stopping");
				subs_teardown.borrow_mut().clear();
				state_anim.borrow_mut().take();
				if let Some(cb) = resize_teardown.borrow_mut().take() {
					let _ = win
						.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
				}
				return;
			}
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(FRAME_SECONDS);
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	if let Some(refresh) = refresh {
		let source = source.clone();
		Effect::new(move |prev: Option<()>| {
			refresh.track();
			if prev.is_some() {
				source.refresh();
			}
		});
	}

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="workflow-graph-canvas"
			on:mousemove=on_mousemove
			on:mouseleave=on_mouseleave
			style="display: block;"
		/>
	}
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

/// Size the canvas to its container's width, keeping the design aspect ratio.
fn fit_canvas(canvas: &HtmlCanvasElement, design: &CanvasConfig) -> (f64, f64) {
	let container = canvas
		.parent_element()
		.map(|p| p.client_width() as f64)
		.unwrap_or(0.0);
	let scale = if container > 0.0 {
		container / design.width
	} else {
		1.0
	};
	let (w, h) = (design.width * scale, design.height * scale);
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
	(w, h)
}
