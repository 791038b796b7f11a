pub mod fare;
pub mod rail;
pub mod schedule;
