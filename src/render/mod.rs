pub mod display;
pub mod frame;
pub mod gpu;
pub mod layout;
pub mod pipeline;
pub mod text;
pub mod window;
