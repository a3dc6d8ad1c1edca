//! Helpers shared by the services that defer and replay side effects.

mod relay;

pub use relay::{defer, settle};
