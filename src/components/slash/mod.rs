//! Slash command registration.
//!
//! On `Ready`, walks every component's declarative tree and registers the
//! result as guild application commands.

use ticketio_core::{self as core, declarative::Node};
use serenity::client::Context;
use serenity::model::event::{Event, ReadyEvent};

use crate::{log_error, log_info};

pub struct SlashRegister {
    container: core::container::RefContainer,
}

impl SlashRegister {
    pub fn new(container: core::container::RefContainer) -> SlashRegister {
        SlashRegister {
            container,
        }
    }
}

impl core::ComponentDeclarative for SlashRegister {}

#[serenity::async_trait]
impl core::ComponentEvent for SlashRegister {
    async fn event(&self, ctx: &Context, event: &Event) {
        if let Event::Ready(ready) = event {
            self.on_ready(ctx, ready).await
        }
    }
}

impl core::Component for SlashRegister {}

impl SlashRegister {
    async fn on_ready(&self, ctx: &Context, ready: &ReadyEvent) {
        let container = self.container.read().await;
        let mut list_declarative = Vec::<&'static Node>::new();
        for component in container.as_ref() {
            if let Some(node) = component.declarative() {
                list_declarative.push(node);
                #[cfg(debug_assertions)]
                node.iter_flat().for_each(|(fullname, item)| log_info!("|{}| {}", fullname, item));
            }
        }
        for guild in &ready.ready.guilds {
            let status = guild.id.set_application_commands(ctx, |commands| {
                list_declarative.iter().for_each(|node| node.add_application_command(commands));
                commands
            }).await;
            let guild_name = guild.id.name(ctx).unwrap_or_else(|| guild.id.0.to_string());
            match status {
                Ok(_) => log_info!("Application commands added to {}", guild_name),
                Err(why) => log_error!("Error while setting application commands to \"{}\": {:?}", guild_name, why),
            }
        }
    }
}
