//! Display kinds
//!
//! A `display` surface hosts widgets: `display::box` panels, `display::text`
//! labels and `display::button`s. Nothing is painted here; each widget keeps
//! the state a renderer would draw in its props.

mod button;
mod panel;
mod surface;
mod text;

pub use button::ButtonNode;
pub use panel::BoxNode;
pub use surface::DisplayNode;
pub use text::TextNode;

use scene_engine::TickContext;
use serde_json::Value;

/// Prop holding the most recent message a widget received
pub const LAST_PROP: &str = "last";

/// Default surface size in pixels
pub const DEFAULT_SIZE: f64 = 600.0;

/// Record `message` as the widget's last received message
fn remember(ctx: &TickContext<'_>, message: &Value) {
    ctx.set_prop(LAST_PROP, message.clone());
}
