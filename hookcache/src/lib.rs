pub mod batch;
pub mod settings;

pub use batch::{load_batch, parse_batch, BatchEntry};
pub use settings::Settings;
