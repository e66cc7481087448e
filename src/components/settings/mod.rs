//! Interactive configuration panel.
//!
//! `/settings` opens an ephemeral panel whose sections (channels, staff,
//! cooldown) are driven by one collector loop. Every change is persisted as
//! soon as it happens; the panel simply stops reacting once it expires.

use std::time::Duration;

use serenity::builder::{CreateComponents, CreateSelectMenuOption};
use serenity::client::Context;
use serenity::model::application::component::{ActionRowComponent, ButtonStyle, InputTextStyle};
use serenity::model::application::interaction::{
    Interaction, InteractionResponseType,
    message_component::MessageComponentInteraction,
    modal::ModalSubmitInteraction,
};
use serenity::model::channel::Message;
use serenity::model::event::{Event, InteractionCreateEvent};
use serenity::model::id::GuildId;

use ticketio_core::{self as core, message, ApplicationCommandEmbed};
use crate::{log_error, log_warn};
use super::utils;
use super::tickets::storage::SharedStore;

const PANEL_TIMEOUT: Duration = Duration::from_secs(180);
const MODAL_TIMEOUT: Duration = Duration::from_secs(120);

const PANEL_CHANNELS: &str = "settings:channels";
const PANEL_STAFF: &str = "settings:staff";
const PANEL_COOLDOWN: &str = "settings:cooldown";
const PANEL_BACK: &str = "settings:back";
const CHAN_INTAKE: &str = "settings:chan_intake";
const CHAN_CATEGORY: &str = "settings:chan_category";
const CHAN_TRANSCRIPT: &str = "settings:chan_transcript";
const STAFF_SELECT: &str = "settings:staff_roles";
const CD_SUB10: &str = "settings:cd_sub10";
const CD_SUB5: &str = "settings:cd_sub5";
const CD_ADD5: &str = "settings:cd_add5";
const CD_ADD10: &str = "settings:cd_add10";
const MODAL_CHANNEL: &str = "settings:channel_modal";
const MODAL_INPUT: &str = "channel_input";

pub struct Settings {
    store: SharedStore,
}

impl Settings {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl core::ComponentDeclarative for Settings {
    fn declarative(&self) -> Option<&'static core::declarative::Node> {
        use core::declarative::*;
        const NODE: Node = Node {
            children: &[],
            commands: &[
                Command { name: "settings", description: "Configure ticket bot settings", args: &[] },
            ],
        };
        Some(&NODE)
    }
}

#[serenity::async_trait]
impl core::ComponentEvent for Settings {
    async fn event(&self, ctx: &Context, event: &Event) {
        match event {
            Event::InteractionCreate(InteractionCreateEvent { interaction: Interaction::ApplicationCommand(orig_app_command), .. }) => {
                let app_cmd = ApplicationCommandEmbed::new(orig_app_command);
                match app_cmd.fullname().as_str() {
                    "settings" => self.settings(ctx, app_cmd).await,
                    _ => (),
                }
            }
            _ => (),
        }
    }
}

impl core::Component for Settings {}

impl Settings {
    async fn settings(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        if !utils::member_is_admin(app_cmd.0.member.as_ref()) {
            return utils::send_error(ctx, app_cmd, "Only administrators can configure the bot.").await;
        }
        let guild_id = match app_cmd.get_guild_id() {
            Some(guild_id) => guild_id,
            None => return utils::send_error(ctx, app_cmd, "This command is not available in a DM.").await,
        };

        let (embed, components) = self.overview_view().await;
        if let Err(e) = app_cmd.0.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|data| {
                    data.ephemeral(true);
                    data.add_embed(embed);
                    data.set_components(components);
                    data
                })
        }).await {
            log_error!("Error while opening the settings panel: {}", e);
            return;
        }
        let panel = match app_cmd.0.get_interaction_response(ctx).await {
            Ok(panel) => panel,
            Err(e) => {
                log_error!("Error while fetching the settings panel: {}", e);
                return;
            }
        };

        loop {
            let interaction = match panel.await_component_interaction(ctx)
                .author_id(app_cmd.0.user.id.0)
                .timeout(PANEL_TIMEOUT)
                .await
            {
                Some(interaction) => interaction,
                None => break,
            };
            match interaction.data.custom_id.as_str() {
                PANEL_CHANNELS => {
                    let (embed, components) = self.channels_view(None).await;
                    self.respond_update(ctx, &interaction, embed, components).await;
                }
                PANEL_STAFF => self.show_staff(ctx, &interaction, guild_id, None).await,
                PANEL_COOLDOWN => {
                    let (embed, components) = self.cooldown_view().await;
                    self.respond_update(ctx, &interaction, embed, components).await;
                }
                PANEL_BACK => {
                    let (embed, components) = self.overview_view().await;
                    self.respond_update(ctx, &interaction, embed, components).await;
                }
                CHAN_INTAKE | CHAN_CATEGORY | CHAN_TRANSCRIPT => self.channel_prompt(ctx, &interaction, &panel).await,
                STAFF_SELECT => {
                    let selected = interaction.data.values.iter()
                        .filter_map(|value| value.parse::<u64>().ok())
                        .collect::<Vec<_>>();
                    let count = selected.len();
                    self.store.write().await.staff_role_ids = selected;
                    self.show_staff(ctx, &interaction, guild_id,
                        Some(format!("Updated staff roles! Selected {} role(s).", count))).await;
                }
                CD_SUB10 | CD_SUB5 | CD_ADD5 | CD_ADD10 => {
                    let delta: i64 = match interaction.data.custom_id.as_str() {
                        CD_SUB10 => -10,
                        CD_SUB5 => -5,
                        CD_ADD5 => 5,
                        _ => 10,
                    };
                    {
                        let mut data = self.store.write().await;
                        let current = data.ticket_cooldown as i64;
                        data.ticket_cooldown = (current + delta).max(0) as u64;
                    }
                    let (embed, components) = self.cooldown_view().await;
                    self.respond_update(ctx, &interaction, embed, components).await;
                }
                other => log_warn!("Unknown settings panel action: {}", other),
            }
        }
    }

    async fn respond_update(&self, ctx: &Context, interaction: &MessageComponentInteraction, embed: message::Embed, components: CreateComponents) {
        let sent = interaction.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|data| {
                    data.add_embed(embed);
                    data.set_components(components);
                    data
                })
        }).await;
        if let Err(e) = sent {
            log_error!("Error while updating the settings panel: {}", e);
        }
    }

    async fn overview_view(&self) -> (message::Embed, CreateComponents) {
        let cooldown = self.store.read().await.ticket_cooldown;
        let mut embed = message::Embed::default();
        embed.title("Ticket Bot Settings");
        embed.description(format!(
            "Use the buttons below to configure the bot.\n\n\
             **Channels**: intake channel, ticket category, transcript channel\n\
             **Staff**: roles with ticket management permission\n\
             **Cooldown**: time between ticket creations ({} seconds)",
            cooldown
        ));
        embed.color(message::COLOR_INFO);
        let mut components = CreateComponents::default();
        components.create_action_row(|action| {
            action.create_button(|button| button.label("Channels").style(ButtonStyle::Secondary).custom_id(PANEL_CHANNELS));
            action.create_button(|button| button.label("Staff").style(ButtonStyle::Secondary).custom_id(PANEL_STAFF));
            action.create_button(|button| button.label("Cooldown").style(ButtonStyle::Secondary).custom_id(PANEL_COOLDOWN))
        });
        (embed, components)
    }

    async fn channels_view(&self, notice: Option<String>) -> (message::Embed, CreateComponents) {
        let (intake, category, transcripts) = {
            let data = self.store.read().await;
            (data.ticket_channel_id, data.ticket_category_id, data.transcript_channel_id)
        };
        let display = |id: Option<u64>| id.map(|id| format!("<#{}>", id)).unwrap_or_else(|| "Not configured".to_string());
        let mut embed = message::Embed::default();
        embed.title("Channel Configuration");
        embed.description("Where tickets are opened, filed and archived.");
        embed.color(message::COLOR_INFO);
        embed.field("Ticket Channel", display(intake), false);
        embed.field("Ticket Category", display(category), false);
        embed.field("Transcript Channel", display(transcripts), false);
        if let Some(notice) = notice {
            embed.field("Update", notice, false);
        }
        let mut components = CreateComponents::default();
        components.create_action_row(|action| {
            action.create_button(|button| button.label("Channel").style(ButtonStyle::Primary).custom_id(CHAN_INTAKE));
            action.create_button(|button| button.label("Set Category").style(ButtonStyle::Primary).custom_id(CHAN_CATEGORY));
            action.create_button(|button| button.label("Transcripts").style(ButtonStyle::Primary).custom_id(CHAN_TRANSCRIPT))
        });
        components.create_action_row(|action| {
            action.create_button(|button| button.label("Back").style(ButtonStyle::Secondary).custom_id(PANEL_BACK))
        });
        (embed, components)
    }

    async fn show_staff(&self, ctx: &Context, interaction: &MessageComponentInteraction, guild_id: GuildId, notice: Option<String>) {
        let roles = match guild_id.roles(ctx).await {
            Ok(roles) => roles,
            Err(e) => {
                log_error!("Error while listing the guild roles: {}", e);
                let (embed, components) = self.overview_view().await;
                return self.respond_update(ctx, interaction, embed, components).await;
            }
        };
        let staff_role_ids = self.store.read().await.staff_role_ids.clone();

        let mut embed = message::Embed::default();
        embed.title("Staff Role Configuration");
        embed.description("Select which roles should have staff permissions in tickets.");
        embed.color(message::COLOR_INFO);
        let current = if staff_role_ids.is_empty() {
            "No roles configured".to_string()
        } else {
            staff_role_ids.iter().map(|id| format!("<@&{}>", id)).collect::<Vec<_>>().join(", ")
        };
        embed.field("Current Staff Roles", current, false);
        if let Some(notice) = notice {
            embed.field("Update", notice, false);
        }

        // Discord caps a select menu at 25 options.
        let options = roles.iter()
            .filter(|(id, _)| id.0 != guild_id.0)
            .take(25)
            .map(|(id, role)| {
                let mut option = CreateSelectMenuOption::new(&role.name, id.0.to_string());
                option.default_selection(staff_role_ids.contains(&id.0));
                option
            })
            .collect::<Vec<_>>();

        let mut components = CreateComponents::default();
        if !options.is_empty() {
            let size = options.len() as u64;
            components.create_action_row(|action| {
                action.create_select_menu(|menu| menu
                    .custom_id(STAFF_SELECT)
                    .placeholder("Select staff roles...")
                    .min_values(0)
                    .max_values(size)
                    .options(|opts| opts.set_options(options)))
            });
        } else {
            embed.field("Note", "This server has no roles to choose from.", false);
        }
        components.create_action_row(|action| {
            action.create_button(|button| button.label("Back").style(ButtonStyle::Secondary).custom_id(PANEL_BACK))
        });
        self.respond_update(ctx, interaction, embed, components).await;
    }

    async fn cooldown_view(&self) -> (message::Embed, CreateComponents) {
        let cooldown = self.store.read().await.ticket_cooldown;
        let mut embed = message::Embed::default();
        embed.title("Cooldown Configuration");
        embed.description("Minimum time a user must wait between two ticket creation attempts.");
        embed.color(message::COLOR_INFO);
        embed.field(format!("Ticket Cooldown: {} seconds", cooldown), "Use the buttons below to adjust the cooldown period.", false);
        let mut components = CreateComponents::default();
        components.create_action_row(|action| {
            action.create_button(|button| button.label("-10s").style(ButtonStyle::Primary).custom_id(CD_SUB10));
            action.create_button(|button| button.label("-5s").style(ButtonStyle::Primary).custom_id(CD_SUB5));
            action.create_button(|button| button.label("+5s").style(ButtonStyle::Primary).custom_id(CD_ADD5));
            action.create_button(|button| button.label("+10s").style(ButtonStyle::Primary).custom_id(CD_ADD10))
        });
        components.create_action_row(|action| {
            action.create_button(|button| button.label("Back").style(ButtonStyle::Secondary).custom_id(PANEL_BACK))
        });
        (embed, components)
    }

    /// Ask for a channel id through a modal and store it.
    async fn channel_prompt(&self, ctx: &Context, interaction: &MessageComponentInteraction, panel: &Message) {
        let title = match interaction.data.custom_id.as_str() {
            CHAN_INTAKE => "Set Ticket Channel",
            CHAN_CATEGORY => "Set Ticket Category",
            _ => "Set Transcript Channel",
        };
        let setting = interaction.data.custom_id.clone();
        if let Err(e) = interaction.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::Modal)
                .interaction_response_data(|data| {
                    data.custom_id(MODAL_CHANNEL);
                    data.title(title);
                    data.components(|comp| comp.create_action_row(|row| row.create_input_text(|input| input
                        .custom_id(MODAL_INPUT)
                        .label("Channel ID or #mention")
                        .placeholder("Enter the channel ID or mention (#channel)")
                        .style(InputTextStyle::Short)
                        .required(true))))
                })
        }).await {
            log_error!("Error while opening the channel modal: {}", e);
            return;
        }
        let modal = match panel.await_modal_interaction(ctx).timeout(MODAL_TIMEOUT).await {
            Some(modal) => modal,
            None => return,
        };
        let notice = match Self::modal_input(&modal).as_deref().and_then(utils::parse_channel_ref) {
            Some(id) => {
                let mut data = self.store.write().await;
                let label = match setting.as_str() {
                    CHAN_INTAKE => {
                        data.ticket_channel_id = Some(id);
                        "Ticket channel"
                    }
                    CHAN_CATEGORY => {
                        data.ticket_category_id = Some(id);
                        "Ticket category"
                    }
                    _ => {
                        data.transcript_channel_id = Some(id);
                        "Transcript channel"
                    }
                };
                format!("{} set to <#{}>", label, id)
            }
            None => "That input does not look like a channel id or #mention.".to_string(),
        };
        let (embed, components) = self.channels_view(Some(notice)).await;
        let sent = modal.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|data| {
                    data.add_embed(embed);
                    data.set_components(components);
                    data
                })
        }).await;
        if let Err(e) = sent {
            log_error!("Error while refreshing the channels section: {}", e);
        }
    }

    fn modal_input(modal: &ModalSubmitInteraction) -> Option<String> {
        modal.data.components.iter()
            .flat_map(|row| row.components.iter())
            .find_map(|component| match component {
                ActionRowComponent::InputText(input) if input.custom_id == MODAL_INPUT => Some(input.value.clone()),
                _ => None,
            })
    }
}
