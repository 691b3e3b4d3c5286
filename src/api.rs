pub mod api_item_processor;
pub mod client;
pub mod model;
