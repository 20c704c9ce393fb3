//! Built-in node and directive transforms.

pub mod hoist_static;
pub mod transform_element;
pub mod transform_expression;
pub mod transform_slot_outlet;
pub mod transform_text;
pub mod v_bind;
pub mod v_for;
pub mod v_if;
pub mod v_memo;
pub mod v_model;
pub mod v_on;
pub mod v_once;
pub mod v_slot;

pub use hoist_static::{get_constant_type, hoist_static};
pub use transform_element::{build_props, transform_element, PropsBuildResult};
pub use transform_expression::{process_expression, transform_expression};
pub use transform_slot_outlet::transform_slot_outlet;
pub use transform_text::transform_text;
pub use v_bind::transform_bind;
pub use v_for::{parse_for_expression, transform_for};
pub use v_if::transform_if;
pub use v_memo::transform_memo;
pub use v_model::transform_model;
pub use v_on::{transform_on, transform_on_with, OnAugmentor};
pub use v_once::transform_once;
pub use v_slot::{build_slots, track_slot_scopes, track_v_for_slot_scopes};
