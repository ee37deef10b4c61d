pub mod cloud_backup;
pub mod invite_tracking;
pub mod onboarding;
pub mod staff_invites;
pub mod vip;

use crate::{Data, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub type EventHandler = for<'a> fn(
    &'a serenity::Context,
    &'a serenity::FullEvent,
    &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>>;

pub struct Module {
    pub definition: ModuleDefinition,
    pub commands: Vec<poise::Command<Data, Error>>,
    pub event_handlers: Vec<EventHandler>,
}

pub fn get_modules() -> Vec<Module> {
    vec![
        invite_tracking::module(),
        staff_invites::module(),
        vip::module(),
        onboarding::module(),
        cloud_backup::module(),
    ]
}

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    let mut all_commands = vec![];

    for mut module in get_modules() {
        let category = module.definition.id;
        for command in &mut module.commands {
            command.category = Some(category.into());
        }
        all_commands.extend(module.commands);
    }

    all_commands.push(crate::services::help::help());
    all_commands
}

pub fn definitions() -> Vec<ModuleDefinition> {
    get_modules().into_iter().map(|m| m.definition).collect()
}

/// Every module's event handlers, tagged with the owning module id.
pub fn event_handlers() -> Vec<(&'static str, EventHandler)> {
    get_modules()
        .into_iter()
        .flat_map(|m| {
            let id = m.definition.id;
            m.event_handlers.into_iter().map(move |h| (id, h))
        })
        .collect()
}
