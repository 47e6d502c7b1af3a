pub mod protracker;
