pub mod layout;
pub mod palette;
pub mod render;
pub mod text;
