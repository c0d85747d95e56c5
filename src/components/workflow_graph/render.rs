use web_sys::CanvasRenderingContext2d;

use super::interaction::Tooltip;
use super::scene::{CurvePrimitive, Scene};
use super::state::WorkflowGraphState;
use super::types::Point;

const BACKGROUND: &str = "#f7f9fb";
const BOX_FILL: &str = "#61dafb";
const BOX_STROKE: &str = "#333";
const LABEL_FONT: &str = "14px sans-serif";
const TOOLTIP_FONT: &str = "12px sans-serif";
const TOOLTIP_OFFSET: f64 = 12.0;
const TOOLTIP_PADDING: f64 = 8.0;
const TOOLTIP_LINE: f64 = 16.0;
const ARROW_SIZE: f64 = 8.0;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &WorkflowGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);

	let Some(scene) = state.scene() else {
		draw_placeholder(state, ctx, "Loading workflow…");
		return;
	};
	if scene.primitives().is_empty() {
		draw_placeholder(state, ctx, "Workflow has no tasks");
		return;
	}

	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_curves(state, scene, ctx);
	draw_boxes(state, scene, ctx);
	ctx.restore();

	if let Some(tooltip) = state.interaction.tooltip() {
		draw_tooltip(state, tooltip, ctx);
	}
}

fn draw_placeholder(state: &WorkflowGraphState, ctx: &CanvasRenderingContext2d, text: &str) {
	ctx.set_fill_style_str("#888");
	ctx.set_font(LABEL_FONT);
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let _ = ctx.fill_text(text, state.width / 2.0, state.height / 2.0);
}

fn draw_curves(state: &WorkflowGraphState, scene: &Scene, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	for curve in scene.curves() {
		let Some(first) = curve.segments.first() else {
			continue;
		};
		let t = ease_out_cubic(
			state
				.interaction
				.highlight(&curve.from)
				.max(state.interaction.highlight(&curve.to)),
		);
		let color = format!("rgba(120, 120, 120, {})", 0.8 + 0.2 * t);

		ctx.set_stroke_style_str(&color);
		ctx.set_line_width((2.0 + t) / k.max(0.5));
		ctx.begin_path();
		ctx.move_to(first.start.x, first.start.y);
		for s in &curve.segments {
			ctx.bezier_curve_to(s.c1.x, s.c1.y, s.c2.x, s.c2.y, s.end.x, s.end.y);
		}
		ctx.stroke();

		ctx.set_fill_style_str(&color);
		draw_arrowhead(curve, ctx);
	}
}

fn draw_arrowhead(curve: &CurvePrimitive, ctx: &CanvasRenderingContext2d) {
	let Some(last) = curve.segments.last() else {
		return;
	};
	let tip = last.end;
	let (dx, dy) = (tip.x - last.c2.x, tip.y - last.c2.y);
	let len = (dx * dx + dy * dy).sqrt();
	let (ux, uy) = if len < 0.001 { (0.0, 1.0) } else { (dx / len, dy / len) };
	let back = Point::new(tip.x - ux * ARROW_SIZE, tip.y - uy * ARROW_SIZE);
	let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);

	ctx.begin_path();
	ctx.move_to(tip.x, tip.y);
	ctx.line_to(back.x + px, back.y + py);
	ctx.line_to(back.x - px, back.y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_boxes(state: &WorkflowGraphState, scene: &Scene, ctx: &CanvasRenderingContext2d) {
	for b in scene.boxes() {
		let t = ease_out_cubic(state.interaction.highlight(&b.node_id));
		let r = b.rect;

		ctx.set_fill_style_str(BOX_FILL);
		ctx.fill_rect(r.x, r.y, r.width, r.height);
		if t > 0.01 {
			ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", 0.35 * t));
			ctx.fill_rect(r.x, r.y, r.width, r.height);
		}
		ctx.set_stroke_style_str(BOX_STROKE);
		ctx.set_line_width(1.0 + 1.5 * t);
		ctx.stroke_rect(r.x, r.y, r.width, r.height);

		ctx.set_fill_style_str("#111");
		ctx.set_font(LABEL_FONT);
		ctx.set_text_align("center");
		ctx.set_text_baseline("middle");
		let label = fit_text(ctx, &b.label, r.width - 8.0);
		let c = r.center();
		let _ = ctx.fill_text(&label, c.x, c.y);
	}
}

/// Truncate with an ellipsis until the text fits `max_width`.
fn fit_text(ctx: &CanvasRenderingContext2d, text: &str, max_width: f64) -> String {
	let width = |s: &str| ctx.measure_text(s).map(|m| m.width()).unwrap_or(0.0);
	if width(text) <= max_width {
		return text.to_string();
	}
	let mut chars: Vec<char> = text.chars().collect();
	while !chars.is_empty() {
		chars.pop();
		let candidate: String = chars.iter().chain(std::iter::once(&'…')).collect();
		if width(&candidate) <= max_width {
			return candidate;
		}
	}
	String::from("…")
}

/// Drawn in screen space, next to the pointer and kept inside the canvas.
fn draw_tooltip(state: &WorkflowGraphState, tooltip: &Tooltip, ctx: &CanvasRenderingContext2d) {
	let alpha = ease_out_cubic(tooltip.opacity);
	ctx.set_font(TOOLTIP_FONT);
	let measure = |s: &str| ctx.measure_text(s).map(|m| m.width()).unwrap_or(0.0);
	let text_width = std::iter::once(tooltip.title.as_str())
		.chain(tooltip.lines.iter().map(String::as_str))
		.map(measure)
		.fold(0.0, f64::max);
	let (w, h) = (
		text_width + 2.0 * TOOLTIP_PADDING,
		(1 + tooltip.lines.len()) as f64 * TOOLTIP_LINE + 2.0 * TOOLTIP_PADDING,
	);

	let mut x = tooltip.anchor.x + TOOLTIP_OFFSET;
	let mut y = tooltip.anchor.y + TOOLTIP_OFFSET;
	if x + w > state.width {
		x = (tooltip.anchor.x - TOOLTIP_OFFSET - w).max(0.0);
	}
	if y + h > state.height {
		y = (tooltip.anchor.y - TOOLTIP_OFFSET - h).max(0.0);
	}

	ctx.set_global_alpha(alpha);
	ctx.set_fill_style_str("rgba(30, 30, 40, 0.92)");
	ctx.fill_rect(x, y, w, h);

	ctx.set_text_align("left");
	ctx.set_text_baseline("top");
	ctx.set_fill_style_str("white");
	ctx.set_font(&format!("bold {TOOLTIP_FONT}"));
	let _ = ctx.fill_text(&tooltip.title, x + TOOLTIP_PADDING, y + TOOLTIP_PADDING);
	ctx.set_font(TOOLTIP_FONT);
	ctx.set_fill_style_str("#ccd");
	for (i, line) in tooltip.lines.iter().enumerate() {
		let _ = ctx.fill_text(
			line,
			x + TOOLTIP_PADDING,
			y + TOOLTIP_PADDING + (i + 1) as f64 * TOOLTIP_LINE,
		);
	}
	ctx.set_global_alpha(1.0);
}
