pub mod catalog;
pub mod conf;
pub mod extinction;
pub mod photometry;
pub mod selection;
pub mod utils;
