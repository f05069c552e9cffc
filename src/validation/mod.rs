pub mod limits;
pub mod report;
pub mod rules;
