pub mod candidates;
pub mod dashboard;
pub mod employees;
pub mod files;
pub mod probes;
