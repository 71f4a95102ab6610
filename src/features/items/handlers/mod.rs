mod admin_item_handler;
mod catalog_handler;

pub use admin_item_handler::*;
pub use catalog_handler::*;
