pub mod catalog;
pub mod coordinator;
pub mod ledger;
pub mod timetable;
