use leptos::prelude::*;

use crate::components::workflow_graph::{GraphConfig, WorkflowGraphCanvas};

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let refresh = RwSignal::new(0u32);
	let diagnostic = RwSignal::new(None::<String>);

	view! {
		<div class="workflow-page">
			<header class="workflow-header">
				<h1>"Workflow Graph Visualization"</h1>
				<button on:click=move |_| refresh.update(|n| *n += 1)>"Refresh"</button>
			</header>

			{move || {
				diagnostic
					.get()
					.map(|message| view! { <p class="diagnostic">{message}</p> })
			}}

			<div class="graph-container">
				<WorkflowGraphCanvas
					config=GraphConfig::default()
					refresh=refresh
					on_diagnostic=Callback::new(move |d| diagnostic.set(d))
				/>
			</div>
		</div>
	}
}
