pub mod output;
pub mod paths;
