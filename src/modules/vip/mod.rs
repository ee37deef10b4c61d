pub mod commands;
pub mod correlator;
pub mod events;
pub mod requests;
pub mod status;

pub use correlator::VipCorrelator;

use super::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "vip",
            name: "VIP",
            description: "VIP upgrade requests and conversion credit for staff",
        },
        commands: commands::commands(),
        event_handlers: vec![events::handler],
    }
}
