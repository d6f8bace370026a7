pub mod audit;
pub mod judge;
pub mod metadata;
pub mod planner;
pub mod template;
