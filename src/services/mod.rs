pub mod backup;
pub mod event_manager;
pub mod help;
pub mod settings;
