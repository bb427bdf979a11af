pub mod anki;
pub mod config;
pub mod core;
pub mod mining;
pub mod notes;
pub mod persistence;
pub mod pitch;
pub mod playback;
pub mod sources;
pub mod tui;
