pub mod attribution;
pub mod cache;
pub mod commands;
pub mod events;
pub mod source;
pub mod tracker;
pub mod tracking;

pub use tracker::InviteTracker;

use super::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "invite_tracking",
            name: "Invite Tracking",
            description: "Works out which invite each new member used",
        },
        commands: commands::commands(),
        event_handlers: vec![events::handler],
    }
}
