pub mod listing;

pub use listing::{list, load_image, parse_u64, Row};
