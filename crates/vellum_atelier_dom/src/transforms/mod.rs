//! DOM-specific node and directive transforms.

pub mod transform_style;
pub mod transition;
pub mod v_html;
pub mod v_model;
pub mod v_on;
pub mod v_show;
pub mod v_text;

use vellum_atelier_core::{DirectiveTransformResult, TransformContext};
use vellum_relief::ast::{DirectiveNode, NodeId};

pub use transform_style::{parse_inline_css, transform_style};
pub use transition::warn_transition_children;
pub use v_html::transform_v_html;
pub use v_model::transform_model;
pub use v_on::transform_on;
pub use v_show::transform_show;
pub use v_text::transform_v_text;

/// v-cloak is removed at mount time by the runtime; nothing to generate.
pub fn transform_cloak(
    _dir: &DirectiveNode,
    _node: NodeId,
    _ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    DirectiveTransformResult::default()
}
