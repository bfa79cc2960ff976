pub mod feed_handlers;
pub mod post_handlers;
