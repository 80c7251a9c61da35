pub mod analyzer;
pub mod errors;
pub mod factory;

pub use analyzer::{resolve_channel, AnalyzeOpts, Analysis, ChannelAnalyzer};
pub use factory::AppFactory;
