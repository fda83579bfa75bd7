//! Templates compiled into the binary.

use super::RegistryBuilder;

mod auth;
mod blueprints;
mod content;
mod flows;
mod layout;
mod navigation;

/// Parameters most components understand.
pub const UNIVERSAL_PARAMS: [&str; 4] = ["theme", "font", "color", "spacing"];

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = blueprints::register(builder);
    let builder = navigation::register(builder);
    let builder = content::register(builder);
    let builder = layout::register(builder);
    let builder = auth::register(builder);
    flows::register(builder)
}

/// Upper bound for `count` on components that repeat an item. Larger values
/// are clamped and reported by the compiler.
pub const MAX_REPEAT_COUNT: usize = 50;

/// `count`, or `default`, clamped to [`MAX_REPEAT_COUNT`].
pub(crate) fn repeat_count(params: &crate::Params, default: usize) -> usize {
    params.number("count").unwrap_or(default).min(MAX_REPEAT_COUNT)
}

/// `light` unless the params ask for `dark`.
pub(crate) fn is_dark(params: &crate::Params) -> bool {
    params.text("theme") == Some("dark")
}
