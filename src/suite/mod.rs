//! Test units shipped with the binary: generic helpers under `builtin`
//! and the `selftest` cases used to exercise the engine end to end.

mod selftest;
mod util;

use crate::specification::registry::Registry;

pub fn register(registry: &mut Registry) {
    util::register(registry);
    selftest::register(registry);
}
