pub mod commands;
pub mod directory;
pub mod roster;

pub use directory::StaffDirectory;
pub use roster::StaffRoster;

use super::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "staff_invites",
            name: "Staff Invites",
            description: "Per-staff invite links and referral details",
        },
        commands: commands::commands(),
        event_handlers: vec![],
    }
}
