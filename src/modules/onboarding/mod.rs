pub mod commands;
pub mod events;
pub mod store;

use super::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "onboarding",
            name: "Onboarding",
            description: "Tracks new members through the welcome steps",
        },
        commands: commands::commands(),
        event_handlers: vec![events::handler],
    }
}
