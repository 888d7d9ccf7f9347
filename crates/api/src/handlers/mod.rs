pub mod admin;
pub mod jobs;
pub mod nodes;
pub mod worker;
