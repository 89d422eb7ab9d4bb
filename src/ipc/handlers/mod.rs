pub mod calc_config;
pub mod core;
pub mod marks;
pub mod reports;
pub mod subjects;
