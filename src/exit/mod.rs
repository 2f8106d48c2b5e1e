pub mod summary;
pub mod waterfall;
