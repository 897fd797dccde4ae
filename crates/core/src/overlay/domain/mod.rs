pub mod compositor;
pub mod layers;
pub mod overlay_renderer;
pub mod viewport;
