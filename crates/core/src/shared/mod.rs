pub mod constants;
pub mod frame;
pub mod normalized_rect;
