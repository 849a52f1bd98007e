pub mod blackhole;
pub mod enforcement;
