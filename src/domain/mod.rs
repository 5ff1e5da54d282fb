pub mod ids;
pub mod penalty;
pub mod point;
pub mod problem;
pub mod report;
pub mod schedule;
pub mod selector;
pub mod tour;
pub mod tracker;
pub mod tree;
pub mod truck;

#[cfg(test)]
pub mod testutil;
