// src/services/mod.rs

pub mod activity;    // recent-activity report + describe
pub mod answers;     // answer payload rows
pub mod audit;       // JSONL mutation logbook
pub mod coordinator; // every write, one transaction each
pub mod entries;     // rule rows + filter builder
pub mod matcher;     // pattern resolvers, local + global passes

pub use activity::NO_RECENT_ACTIVITY;
pub use audit::Audit;
