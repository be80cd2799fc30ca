pub mod analyzer;
pub mod decode;
pub mod features;
pub mod metrics;
pub mod spectrum;
pub mod vectorscope;
