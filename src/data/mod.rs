pub mod preprocess;

pub use preprocess::{preprocess, rescale_x};
