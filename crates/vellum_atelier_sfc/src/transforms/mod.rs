//! Template node transforms contributed by the SFC layer.

pub mod asset_url;
pub mod srcset;

pub use asset_url::{AssetUrlConfig, AssetUrlOptions, AssetUrlTransform};
pub use srcset::transform_srcset;
