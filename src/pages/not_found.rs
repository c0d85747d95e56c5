use leptos::prelude::*;

/// 404 page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<h1>"Nothing here"</h1>
		<a href="/">"Back to the workflow"</a>
	}
}
