//! The help component shows help for a command or the whole bot.
//! It relies on the other components implementing [ComponentDeclarative].
//!
//! [ComponentDeclarative]: ticketio_core::ComponentDeclarative

use ticketio_core::{self as core, declarative::IterType, ApplicationCommandEmbed, message, message::ToMessage, get_argument};
use serenity::client::Context;
use serenity::model::application::interaction::Interaction;
use serenity::model::event::{Event, InteractionCreateEvent};

use crate::log_error;

pub struct Help {
    container: core::container::RefContainer,
}

impl Help {
    pub fn new(container: core::container::RefContainer) -> Self {
        Self {
            container
        }
    }
}

impl core::ComponentDeclarative for Help {
    fn declarative(&self) -> Option<&'static core::declarative::Node> {
        use core::declarative::*;
        use serenity::model::application::command::CommandOptionType;
        const NODE: Node = Node {
            children: &[],
            commands: &[
                Command {
                    name: "help",
                    description: "Show the help of a command",
                    args: &[
                        Argument { name: "command", type_: CommandOptionType::String, description: "Name of the command", optional: false },
                    ],
                },
                Command { name: "list_commands", description: "List the commands of the bot", args: &[] },
            ],
        };
        Some(&NODE)
    }
}

#[serenity::async_trait]
impl core::ComponentEvent for Help {
    async fn event(&self, ctx: &Context, event: &Event) {
        match event {
            Event::InteractionCreate(InteractionCreateEvent { interaction: Interaction::ApplicationCommand(orig_app_command), .. }) => {
                let app_cmd = ApplicationCommandEmbed::new(orig_app_command);
                match app_cmd.fullname().as_str() {
                    "help" => self.help(ctx, app_cmd).await,
                    "list_commands" => self.list_commands(ctx, app_cmd).await,
                    _ => (),
                }
            }
            _ => (),
        }
    }
}

impl core::Component for Help {}

impl Help {
    async fn help(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        let command = match get_argument!(app_cmd, "command", String) {
            Some(command) => command.clone(),
            None => return crate::components::utils::send_error(ctx, app_cmd, "command: missing required argument").await,
        };
        let info = self.get_command_info(command.as_str()).await;
        let msg = match info {
            Some((_, IterType::Command(command))) => command.to_message(),
            Some((_, IterType::Node(node))) => node.to_message(),
            None => message::error("Unknown command"),
        };
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }
    async fn list_commands(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        let container = self.container.read().await;
        let msg = container.as_ref().iter()
            .filter_map(|comp| comp.declarative())
            .flat_map(|node| node.iter_flat())
            .filter_map(|(fullname, iter_type)| {
                match iter_type {
                    IterType::Command(command) => Some((fullname, command)),
                    _ => None
                }
            })
            .map(|(fullname, command)| format!("**{}**: {}", fullname, command.description))
            .collect::<Vec<_>>()
            .join("\n");
        if let Err(e) = app_cmd.direct_response(ctx, message::success(msg)).await {
            log_error!("Error while sending the response: {}", e);
        }
    }
    async fn get_command_info(&self, name: &str) -> Option<(String, IterType)> {
        let container = self.container.read().await;
        container.as_ref().iter()
            .filter_map(|comp| comp.declarative())
            .flat_map(|node| node.iter_flat())
            .find(|(fullname, _)| fullname == name)
    }
}
