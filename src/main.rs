use leptos::mount::mount_to_body;
use workflow_graph_canvas::{App, init_logging};

fn main() {
	init_logging();
	mount_to_body(App)
}
