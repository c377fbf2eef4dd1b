//! cirrhosis-cli: `train` and `serve` front ends over `cirrhosis-classifiers`.
pub mod serve;
pub mod train;
pub mod util;
