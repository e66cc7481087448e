//! Ticket intake and creation.

pub mod storage;
mod wizard;

pub use storage::{SharedStore, Storage, Ticket, TicketStatus};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serenity::client::Context;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::{
    Interaction, InteractionResponseType,
    message_component::MessageComponentInteraction,
};
use serenity::model::channel::{ChannelType, PermissionOverwrite, PermissionOverwriteType, ReactionType};
use serenity::model::event::{Event, InteractionCreateEvent, ReadyEvent};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use serenity::model::user::User;
use tokio::sync::Mutex;

use ticketio_core::{self as core, message, ApplicationCommandEmbed, get_argument};
use crate::{log_error, log_warn};
use super::utils;
use wizard::{TicketWizard, WizardOutcome};

/// Custom id of the persistent intake button.
const BUTTON_TICKET_CREATE: &str = "persistent_ticket:create";

/// Category created when none is configured.
const DEFAULT_CATEGORY_NAME: &str = "Support Tickets";

/// The intake component: posts the intake embed and turns button presses
/// into ticket channels driven by the creation wizard.
pub struct Tickets {
    store: SharedStore,
    /// Per-user creation deadlines, in-memory only.
    cooldowns: Mutex<HashMap<u64, Instant>>,
}

impl Tickets {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            cooldowns: Mutex::new(HashMap::new()),
        }
    }
}

impl core::ComponentDeclarative for Tickets {
    fn declarative(&self) -> Option<&'static core::declarative::Node> {
        use core::declarative::*;
        use serenity::model::application::command::CommandOptionType;
        const NODE: Node = Node {
            children: &[],
            commands: &[
                Command {
                    name: "setup_ticket",
                    description: "Set up the purchase request system",
                    args: &[
                        Argument { name: "channel", type_: CommandOptionType::Channel, description: "Channel to post the intake message in", optional: true },
                    ],
                },
            ],
        };
        Some(&NODE)
    }
}

#[serenity::async_trait]
impl core::ComponentEvent for Tickets {
    async fn event(&self, ctx: &Context, event: &Event) {
        match event {
            Event::Ready(ready) => self.on_ready(ctx, ready).await,
            Event::InteractionCreate(InteractionCreateEvent { interaction: Interaction::ApplicationCommand(orig_app_command), .. }) => {
                let app_cmd = ApplicationCommandEmbed::new(orig_app_command);
                match app_cmd.fullname().as_str() {
                    "setup_ticket" => self.setup_ticket(ctx, app_cmd).await,
                    _ => (),
                }
            }
            Event::InteractionCreate(InteractionCreateEvent { interaction: Interaction::MessageComponent(interaction), .. })
                if interaction.data.custom_id == BUTTON_TICKET_CREATE =>
            {
                self.on_ticket_create(ctx, interaction).await
            }
            _ => (),
        }
    }
}

impl core::Component for Tickets {}

impl Tickets {
    async fn on_ready(&self, ctx: &Context, _: &ReadyEvent) {
        let intake = self.store.read().await.ticket_channel_id;
        if let Some(id) = intake {
            if let Err(err) = ChannelId(id).to_channel(ctx).await {
                log_warn!("Ticket intake channel <#{}> is gone, clearing the setting: {}", id, err);
                self.store.write().await.ticket_channel_id = None;
            }
        }
    }

    async fn setup_ticket(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        if !utils::member_is_admin(app_cmd.0.member.as_ref()) {
            return utils::send_error(ctx, app_cmd, "Only administrators can set up the purchase request system.").await;
        }
        let channel = match get_argument!(app_cmd, "channel", Channel) {
            Some(channel) => channel.id,
            None => app_cmd.0.channel_id,
        };
        let mut embed = message::Embed::default();
        embed.title("Purchase Request System");
        embed.description("Click the button below to submit a new purchase request.");
        embed.color(message::COLOR_INFO);
        embed.footer(|footer| footer.text("Purchase requests are used to order food/items from supported services."));
        let sent = channel.send_message(ctx, |msg| {
            msg.embed(|e| { *e = embed; e });
            msg.components(|comp| comp.create_action_row(|action| {
                action.create_button(|button| button
                    .label("Submit Purchase Request")
                    .style(ButtonStyle::Primary)
                    .emoji(ReactionType::Unicode("🛒".to_string()))
                    .custom_id(BUTTON_TICKET_CREATE))
            }))
        }).await;
        let msg = match sent {
            Ok(_) => {
                self.store.write().await.ticket_channel_id = Some(channel.0);
                message::success(format!("Purchase request system set up in <#{}>!", channel.0)).set_ephemeral(true)
            }
            Err(e) => {
                log_error!("Error while posting the intake message: {}", e);
                message::error("An error occurred while setting up the purchase request system.").set_ephemeral(true)
            }
        };
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }

    async fn on_ticket_create(&self, ctx: &Context, interaction: &MessageComponentInteraction) {
        let guild_id = match interaction.guild_id {
            Some(guild_id) => guild_id,
            None => {
                log_error!("The intake button is not in a guild");
                return;
            }
        };
        // Acknowledge right away, everything else goes through followups.
        let acknowledged = match interaction.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|data| data.ephemeral(true))
        }).await {
            Ok(_) => true,
            Err(e) => {
                log_warn!("Error while acknowledging the intake interaction: {}", e);
                false
            }
        };

        if let Some(remaining) = self.cooldown_remaining(interaction.user.id).await {
            self.followup(ctx, interaction, format!(
                "You are creating tickets too quickly. Please wait {} second(s) before trying again.", remaining
            )).await;
            return;
        }
        if let Some(channel) = self.store.read().await.open_ticket_of(interaction.user.id) {
            self.followup(ctx, interaction, format!(
                "You already have an open ticket in <#{}>. Please use that ticket or close it before creating a new one.", channel.0
            )).await;
            return;
        }
        self.arm_cooldown(interaction.user.id).await;

        let (channel_id, ticket_number) = match self.provision_channel(ctx, guild_id, &interaction.user).await {
            Ok(v) => v,
            Err(e) => {
                log_error!("Error while creating the ticket: {}", e);
                self.followup(ctx, interaction, "Failed to create a ticket. Please try again later.".to_string()).await;
                return;
            }
        };
        if acknowledged {
            self.followup(ctx, interaction, format!("Your ticket has been created in <#{}>", channel_id.0)).await;
        }

        let wizard = TicketWizard::new(Arc::clone(&self.store), channel_id, interaction.user.clone(), ticket_number);
        match wizard.run(ctx).await {
            Ok(WizardOutcome::Completed) | Ok(WizardOutcome::TimedOut) => (),
            Err(e) => {
                log_error!("Error in the ticket creation flow: {}", e);
                let mut embed = message::Embed::default();
                embed.title("Error");
                embed.description("An error occurred during the ticket creation process. A staff member will assist you shortly.");
                embed.color(message::COLOR_ERROR);
                let sent = channel_id.send_message(ctx, |msg| {
                    msg.content(format!("<@{}>", interaction.user.id.0));
                    msg.embed(|e| { *e = embed; e })
                }).await;
                if let Err(e) = sent {
                    log_error!("Error while reporting the wizard failure: {}", e);
                }
            }
        }
    }

    async fn followup(&self, ctx: &Context, interaction: &MessageComponentInteraction, content: String) {
        if let Err(e) = interaction.create_followup_message(ctx, |f| f.ephemeral(true).content(content)).await {
            log_error!("Error while sending the followup: {}", e);
        }
    }

    /// Seconds left before the user may create another ticket, if any.
    async fn cooldown_remaining(&self, user_id: UserId) -> Option<u64> {
        let mut cooldowns = self.cooldowns.lock().await;
        match cooldowns.get(&user_id.0).copied() {
            Some(deadline) if Instant::now() < deadline => {
                Some((deadline - Instant::now()).as_secs().max(1))
            }
            Some(_) => {
                cooldowns.remove(&user_id.0);
                None
            }
            None => None,
        }
    }

    async fn arm_cooldown(&self, user_id: UserId) {
        let seconds = self.store.read().await.ticket_cooldown;
        if seconds == 0 {
            return;
        }
        self.cooldowns.lock().await.insert(user_id.0, Instant::now() + Duration::from_secs(seconds));
    }

    /// Create the ticket channel: sequential name, configured category,
    /// overwrites for the owner, the bot and the staff roles.
    async fn provision_channel(&self, ctx: &Context, guild_id: GuildId, user: &User) -> Result<(ChannelId, u64), String> {
        let (staff_role_ids, category_id) = {
            let data = self.store.read().await;
            (data.staff_role_ids.clone(), data.ticket_category_id)
        };
        let category = match category_id {
            Some(id) => ChannelId(id),
            None => Self::find_or_create_category(ctx, guild_id).await?,
        };
        let ticket_number = self.store.write().await.next_ticket_number();

        let everyone = RoleId(guild_id.0);
        let mut permissions = vec![
            PermissionOverwrite {
                allow: member_permissions(),
                deny: Permissions::default(),
                kind: PermissionOverwriteType::Member(user.id),
            },
            PermissionOverwrite {
                allow: staff_permissions(),
                deny: Permissions::default(),
                kind: PermissionOverwriteType::Member(ctx.cache.current_user().id),
            },
            PermissionOverwrite {
                allow: Permissions::default(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(everyone),
            },
        ];
        for role_id in staff_role_ids {
            permissions.push(PermissionOverwrite {
                allow: staff_permissions(),
                deny: Permissions::default(),
                kind: PermissionOverwriteType::Role(RoleId(role_id)),
            });
        }

        let new_channel = guild_id.create_channel(ctx, |chan| {
            chan
                .name(format!("ticket-{:04}", ticket_number))
                .kind(ChannelType::Text)
                .category(category)
                .permissions(permissions)
        }).await.map_err(|e| format!("Error while creating the ticket channel: {}", e))?;
        Ok((new_channel.id, ticket_number))
    }

    async fn find_or_create_category(ctx: &Context, guild_id: GuildId) -> Result<ChannelId, String> {
        let channels = guild_id.channels(ctx).await
            .map_err(|e| format!("Error while listing the guild channels: {}", e))?;
        let existing = channels.iter()
            .find(|(_, channel)| channel.kind == ChannelType::Category && channel.name.eq_ignore_ascii_case(DEFAULT_CATEGORY_NAME));
        if let Some((id, _)) = existing {
            return Ok(*id);
        }
        let category = guild_id.create_channel(ctx, |chan| {
            chan
                .name(DEFAULT_CATEGORY_NAME)
                .kind(ChannelType::Category)
                .permissions(vec![PermissionOverwrite {
                    allow: Permissions::default(),
                    deny: Permissions::VIEW_CHANNEL,
                    kind: PermissionOverwriteType::Role(RoleId(guild_id.0)),
                }])
        }).await.map_err(|e| format!("Error while creating the ticket category: {}", e))?;
        Ok(category.id)
    }
}

fn member_permissions() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::EMBED_LINKS
        | Permissions::ATTACH_FILES
        | Permissions::ADD_REACTIONS
        | Permissions::READ_MESSAGE_HISTORY
}

fn staff_permissions() -> Permissions {
    member_permissions() | Permissions::MANAGE_CHANNELS | Permissions::MANAGE_MESSAGES
}
