pub mod commands;

use super::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "cloud_backup",
            name: "Cloud Backup",
            description: "Manual backup, restore and export of the bot's data",
        },
        commands: commands::commands(),
        event_handlers: vec![],
    }
}
