pub mod preview;
pub mod resolve;

pub use preview::{PreviewBundle, build_preview, collect_fragments};
pub use resolve::resolve_component;
