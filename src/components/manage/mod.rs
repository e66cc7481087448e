//! Ticket management: participants, closing, deletion, transcripts.

mod transcript;

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serenity::client::Context;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::{
    Interaction, InteractionResponseType,
    message_component::MessageComponentInteraction,
};
use serenity::model::channel::{AttachmentType, Channel, PermissionOverwrite, PermissionOverwriteType, ReactionType};
use serenity::model::event::{Event, InteractionCreateEvent};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, UserId};
use serenity::model::permissions::Permissions;
use serenity::model::user::User;

use ticketio_core::{self as core, message, ApplicationCommandEmbed, get_argument};
use crate::{log_error, log_info, log_warn};
use super::utils;
use super::tickets::storage::{SharedStore, Ticket, TicketStatus};
use transcript::TranscriptFormat;

/// Custom ids of the persistent ticket action buttons.
const BUTTON_TICKET_CLOSE: &str = "ticket_close_button";
const BUTTON_TICKET_TRANSCRIPT: &str = "ticket_transcript_button";

const CONFIRM_YES: &str = "confirm:yes";
const CONFIRM_NO: &str = "confirm:no";

const CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);
/// How long the numbered buttons under a search result stay live.
const RESULTS_TIMEOUT: Duration = Duration::from_secs(300);
const DELETE_DELAY: Duration = Duration::from_secs(3);

const SEARCH_LIMIT: usize = 50;
const RESULTS_SHOWN: usize = 10;

/// Staff-facing ticket operations. Every operation shares the same guard:
/// administrator, configured staff role, or ticket owner.
pub struct TicketManage {
    store: SharedStore,
}

impl TicketManage {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl core::ComponentDeclarative for TicketManage {
    fn declarative(&self) -> Option<&'static core::declarative::Node> {
        use core::declarative::*;
        use serenity::model::application::command::CommandOptionType;
        const NODE: Node = Node {
            children: &[],
            commands: &[
                Command {
                    name: "ticket_add",
                    description: "Add a user to the current ticket",
                    args: &[
                        Argument { name: "user", type_: CommandOptionType::User, description: "The user to add to the ticket", optional: false },
                    ],
                },
                Command {
                    name: "ticket_remove",
                    description: "Remove a user from the current ticket",
                    args: &[
                        Argument { name: "user", type_: CommandOptionType::User, description: "The user to remove from the ticket", optional: false },
                    ],
                },
                Command { name: "ticket_close", description: "Close the current ticket", args: &[] },
                Command { name: "ticket_delete", description: "Delete the current ticket", args: &[] },
                Command {
                    name: "set_staff",
                    description: "Set a role as staff for tickets",
                    args: &[
                        Argument { name: "role", type_: CommandOptionType::Role, description: "The role to set as staff", optional: false },
                    ],
                },
                Command {
                    name: "remove_staff",
                    description: "Remove a role from staff for tickets",
                    args: &[
                        Argument { name: "role", type_: CommandOptionType::Role, description: "The role to remove from staff", optional: false },
                    ],
                },
                Command {
                    name: "transcript",
                    description: "Generate a transcript of the current ticket",
                    args: &[
                        Argument { name: "format", type_: CommandOptionType::String, description: "Transcript format: html (default) or text", optional: true },
                    ],
                },
                Command {
                    name: "set_transcript_channel",
                    description: "Set channel for ticket transcripts",
                    args: &[
                        Argument { name: "channel", type_: CommandOptionType::Channel, description: "The channel to send ticket transcripts to", optional: false },
                    ],
                },
                Command {
                    name: "search_transcripts",
                    description: "Search through ticket transcripts",
                    args: &[
                        Argument { name: "query", type_: CommandOptionType::String, description: "Text to search for in transcripts", optional: true },
                        Argument { name: "username", type_: CommandOptionType::String, description: "Filter by username", optional: true },
                        Argument { name: "date_from", type_: CommandOptionType::String, description: "Start date in YYYY-MM-DD format", optional: true },
                        Argument { name: "date_to", type_: CommandOptionType::String, description: "End date in YYYY-MM-DD format", optional: true },
                    ],
                },
                Command { name: "add_ticket_buttons", description: "Add ticket action buttons to the current channel", args: &[] },
            ],
        };
        Some(&NODE)
    }
}

#[serenity::async_trait]
impl core::ComponentEvent for TicketManage {
    async fn event(&self, ctx: &Context, event: &Event) {
        match event {
            Event::InteractionCreate(InteractionCreateEvent { interaction: Interaction::ApplicationCommand(orig_app_command), .. }) => {
                let app_cmd = ApplicationCommandEmbed::new(orig_app_command);
                match app_cmd.fullname().as_str() {
                    "ticket_add" => self.ticket_add(ctx, app_cmd).await,
                    "ticket_remove" => self.ticket_remove(ctx, app_cmd).await,
                    "ticket_close" => self.ticket_close(ctx, app_cmd).await,
                    "ticket_delete" => self.ticket_delete(ctx, app_cmd).await,
                    "set_staff" => self.set_staff(ctx, app_cmd).await,
                    "remove_staff" => self.remove_staff(ctx, app_cmd).await,
                    "transcript" => self.transcript(ctx, app_cmd).await,
                    "set_transcript_channel" => self.set_transcript_channel(ctx, app_cmd).await,
                    "search_transcripts" => self.search_transcripts(ctx, app_cmd).await,
                    "add_ticket_buttons" => self.add_ticket_buttons(ctx, app_cmd).await,
                    _ => (),
                }
            }
            Event::InteractionCreate(InteractionCreateEvent { interaction: Interaction::MessageComponent(interaction), .. })
                if interaction.data.custom_id == BUTTON_TICKET_CLOSE =>
            {
                self.on_close_button(ctx, interaction).await
            }
            Event::InteractionCreate(InteractionCreateEvent { interaction: Interaction::MessageComponent(interaction), .. })
                if interaction.data.custom_id == BUTTON_TICKET_TRANSCRIPT =>
            {
                self.on_transcript_button(ctx, interaction).await
            }
            _ => (),
        }
    }
}

impl core::Component for TicketManage {}

impl TicketManage {
    /// Shared authorization guard: administrator, staff role, or ticket owner.
    async fn authorized(&self, member: Option<&Member>, ticket: &Ticket) -> bool {
        let member = match member {
            Some(member) => member,
            None => return false,
        };
        if utils::member_is_admin(Some(member)) {
            return true;
        }
        let staff_role_ids = self.store.read().await.staff_role_ids.clone();
        if utils::member_is_staff(member, &staff_role_ids) {
            return true;
        }
        member.user.id.0 == ticket.user_id
    }

    async fn ticket_of(&self, channel_id: ChannelId) -> Option<Ticket> {
        self.store.read().await.get_ticket(channel_id).cloned()
    }

    async fn ticket_add(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        let channel_id = app_cmd.0.channel_id;
        let target = match get_argument!(app_cmd, "user", User) {
            Some((user, _)) => user.clone(),
            None => return utils::send_error(ctx, app_cmd, "user: missing required argument").await,
        };
        let ticket = match self.ticket_of(channel_id).await {
            Some(ticket) => ticket,
            None => return utils::send_error(ctx, app_cmd, "This command can only be used in a ticket channel.").await,
        };
        if !self.authorized(app_cmd.0.member.as_ref(), &ticket).await {
            return utils::send_error(ctx, app_cmd, "You don't have permission to add users to this ticket.").await;
        }
        let result = channel_id.create_permission(ctx, &PermissionOverwrite {
            allow: participant_permissions(),
            deny: Permissions::default(),
            kind: PermissionOverwriteType::Member(target.id),
        }).await;
        let msg = match result {
            Ok(_) => message::success(format!("Added <@{}> to the ticket.", target.id.0)),
            Err(e) => message::error(format!("I don't have permission to modify channel permissions: {}", e)).set_ephemeral(true),
        };
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }

    async fn ticket_remove(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        let channel_id = app_cmd.0.channel_id;
        let target = match get_argument!(app_cmd, "user", User) {
            Some((user, _)) => user.clone(),
            None => return utils::send_error(ctx, app_cmd, "user: missing required argument").await,
        };
        let ticket = match self.ticket_of(channel_id).await {
            Some(ticket) => ticket,
            None => return utils::send_error(ctx, app_cmd, "This command can only be used in a ticket channel.").await,
        };
        if !self.authorized(app_cmd.0.member.as_ref(), &ticket).await {
            return utils::send_error(ctx, app_cmd, "You don't have permission to remove users from this ticket.").await;
        }
        if target.id.0 == ticket.user_id {
            return utils::send_error(ctx, app_cmd, "You cannot remove the ticket creator from the ticket.").await;
        }
        let result = match channel_id.to_channel(ctx).await {
            Ok(Channel::Guild(channel)) => channel.delete_permission(ctx, PermissionOverwriteType::Member(target.id)).await,
            Ok(_) => return utils::send_error(ctx, app_cmd, "This channel is not a guild channel.").await,
            Err(e) => Err(e),
        };
        let msg = match result {
            Ok(_) => message::success(format!("Removed <@{}> from the ticket.", target.id.0)),
            Err(e) => message::error(format!("I don't have permission to modify channel permissions: {}", e)).set_ephemeral(true),
        };
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }

    async fn ticket_close(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        let channel_id = app_cmd.0.channel_id;
        let ticket = match self.ticket_of(channel_id).await {
            Some(ticket) => ticket,
            None => return utils::send_error(ctx, app_cmd, "This command can only be used in a ticket channel.").await,
        };
        if !self.authorized(app_cmd.0.member.as_ref(), &ticket).await {
            return utils::send_error(ctx, app_cmd, "You don't have permission to close this ticket.").await;
        }
        if ticket.status == TicketStatus::Closed {
            return utils::send_error(ctx, app_cmd, "This ticket is already closed.").await;
        }
        let confirmed = match self.confirm_command(ctx, &app_cmd, "Close Ticket",
            "Are you sure you want to close this ticket? This will archive the channel and generate an HTML transcript.").await
        {
            Ok(confirmed) => confirmed,
            Err(e) => {
                log_error!("{}", e);
                return;
            }
        };
        match confirmed {
            Some(true) => {
                if let Err(e) = self.close_ticket(ctx, channel_id, &app_cmd.0.user, &ticket).await {
                    log_error!("{}", e);
                    if let Err(e) = app_cmd.0.create_followup_message(ctx, |f| f.ephemeral(true).content(e)).await {
                        log_error!("Error while reporting the failure: {}", e);
                    }
                }
            }
            Some(false) => {
                if let Err(e) = app_cmd.0.create_followup_message(ctx, |f| f.ephemeral(true).content("Ticket closure cancelled.")).await {
                    log_error!("Error while sending the followup: {}", e);
                }
            }
            None => (),
        }
    }

    async fn ticket_delete(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        let channel_id = app_cmd.0.channel_id;
        let ticket = match self.ticket_of(channel_id).await {
            Some(ticket) => ticket,
            None => return utils::send_error(ctx, app_cmd, "This command can only be used in a ticket channel.").await,
        };
        if !self.authorized(app_cmd.0.member.as_ref(), &ticket).await {
            return utils::send_error(ctx, app_cmd, "You don't have permission to delete this ticket.").await;
        }
        let confirmed = match self.confirm_command(ctx, &app_cmd, "Delete Ticket",
            "Are you sure you want to delete this ticket? This will permanently delete the channel and cannot be undone.").await
        {
            Ok(confirmed) => confirmed,
            Err(e) => {
                log_error!("{}", e);
                return;
            }
        };
        match confirmed {
            Some(true) => {
                self.notify_owner_of_deletion(ctx, app_cmd.get_guild_id().and_then(|id| id.name(ctx)), &ticket).await;
                if let Err(e) = app_cmd.0.create_followup_message(ctx, |f| f.ephemeral(true).content("Deleting ticket channel...")).await {
                    log_warn!("Error while sending the followup: {}", e);
                }
                tokio::time::sleep(DELETE_DELAY).await;
                // Channel first, record second: a failed deletion keeps the
                // record so the store cannot point at a live channel it lost
                // track of.
                match channel_id.delete(ctx).await {
                    Ok(_) => {
                        self.store.write().await.delete_ticket(channel_id);
                    }
                    Err(e) => {
                        log_error!("Error while deleting the ticket channel: {}", e);
                        if let Err(e) = app_cmd.0.create_followup_message(ctx, |f| f.ephemeral(true).content("I don't have permission to delete this channel.")).await {
                            log_error!("Error while reporting the failure: {}", e);
                        }
                    }
                }
            }
            Some(false) => {
                if let Err(e) = app_cmd.0.create_followup_message(ctx, |f| f.ephemeral(true).content("Ticket deletion cancelled.")).await {
                    log_error!("Error while sending the followup: {}", e);
                }
            }
            None => (),
        }
    }

    /// Best-effort direct message; recipients can disable DMs.
    async fn notify_owner_of_deletion(&self, ctx: &Context, guild_name: Option<String>, ticket: &Ticket) {
        let owner = match UserId(ticket.user_id).to_user(ctx).await {
            Ok(owner) => owner,
            Err(e) => {
                log_warn!("Could not fetch the ticket owner: {}", e);
                return;
            }
        };
        let mut embed = message::Embed::default();
        embed.title("Ticket Deleted");
        embed.description(format!("Your ticket in {} has been deleted.", guild_name.unwrap_or_else(|| "the server".to_string())));
        embed.color(message::COLOR_ERROR);
        if let Err(e) = owner.dm(ctx, |m| m.embed(|e| { *e = embed; e })).await {
            log_info!("Could not DM the ticket owner: {}", e);
        }
    }

    async fn set_staff(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        if !utils::member_is_admin(app_cmd.0.member.as_ref()) {
            return utils::send_error(ctx, app_cmd, "Only administrators can manage staff roles.").await;
        }
        let role = match get_argument!(app_cmd, "role", Role) {
            Some(role) => role.clone(),
            None => return utils::send_error(ctx, app_cmd, "role: missing required argument").await,
        };
        {
            let mut data = self.store.write().await;
            if data.staff_role_ids.contains(&role.id.0) {
                drop(data);
                return utils::send_error(ctx, app_cmd, format!("<@&{}> is already set as a staff role.", role.id.0)).await;
            }
            data.staff_role_ids.push(role.id.0);
        }
        let msg = message::success(format!("<@&{}> has been set as a staff role for tickets.", role.id.0));
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }

    async fn remove_staff(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        if !utils::member_is_admin(app_cmd.0.member.as_ref()) {
            return utils::send_error(ctx, app_cmd, "Only administrators can manage staff roles.").await;
        }
        let role = match get_argument!(app_cmd, "role", Role) {
            Some(role) => role.clone(),
            None => return utils::send_error(ctx, app_cmd, "role: missing required argument").await,
        };
        {
            let mut data = self.store.write().await;
            match data.staff_role_ids.iter().position(|id| *id == role.id.0) {
                Some(index) => {
                    data.staff_role_ids.remove(index);
                }
                None => {
                    drop(data);
                    return utils::send_error(ctx, app_cmd, format!("<@&{}> is not a staff role.", role.id.0)).await;
                }
            }
        }
        let msg = message::success(format!("<@&{}> has been removed from staff roles.", role.id.0));
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }

    async fn transcript(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        let channel_id = app_cmd.0.channel_id;
        let ticket = match self.ticket_of(channel_id).await {
            Some(ticket) => ticket,
            None => return utils::send_error(ctx, app_cmd, "This command can only be used in a ticket channel.").await,
        };
        if !self.authorized(app_cmd.0.member.as_ref(), &ticket).await {
            return utils::send_error(ctx, app_cmd, "You don't have permission to generate a transcript.").await;
        }
        let format = TranscriptFormat::from_arg(get_argument!(app_cmd, "format", String).map(|s| s.as_str()));
        let delay_resp = match app_cmd.delayed_response(ctx, false).await {
            Ok(resp) => resp,
            Err(e) => {
                log_error!("Error while creating the response: {}", e);
                return;
            }
        };
        let msg = loop {
            let destination = match self.store.read().await.transcript_channel_id {
                Some(id) => ChannelId(id),
                None => break message::warn("No transcript channel is configured. Please ask an admin to set one with `/set_transcript_channel`."),
            };
            break match self.archive_transcript(ctx, channel_id, destination, format, ArchiveContext::Manual(&app_cmd.0.user)).await {
                Ok(_) => message::success(format!("{} transcript has been sent to <#{}>.", format.label(), destination.0)),
                Err(e) => {
                    log_error!("Error while generating the transcript: {}", e);
                    message::error("Failed to generate transcript. Please try again.")
                }
            };
        };
        delay_resp.send_message(msg).await.unwrap_or_else(|e| {
            log_error!("Error while sending the response: {}", e);
        });
    }

    async fn set_transcript_channel(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        if !utils::member_is_admin(app_cmd.0.member.as_ref()) {
            return utils::send_error(ctx, app_cmd, "Only administrators can set the transcript channel.").await;
        }
        let channel = match get_argument!(app_cmd, "channel", Channel) {
            Some(channel) => channel.id,
            None => return utils::send_error(ctx, app_cmd, "channel: missing required argument").await,
        };
        self.store.write().await.transcript_channel_id = Some(channel.0);
        let msg = message::success(format!(
            "Transcript channel has been set to <#{}>. All ticket transcripts will be sent to this channel.", channel.0
        ));
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }

    async fn search_transcripts(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        if !utils::member_is_admin(app_cmd.0.member.as_ref()) {
            return utils::send_error(ctx, app_cmd, "Only administrators can search transcripts.").await;
        }
        let query = get_argument!(app_cmd, "query", String).cloned();
        let username = get_argument!(app_cmd, "username", String).cloned();
        let date_from = get_argument!(app_cmd, "date_from", String).cloned();
        let date_to = get_argument!(app_cmd, "date_to", String).cloned();
        if query.is_none() && username.is_none() && date_from.is_none() && date_to.is_none() {
            return utils::send_error(ctx, app_cmd, "Please provide at least one search parameter (query, username, or date range).").await;
        }
        let date_from = match date_from.map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d")).transpose() {
            Ok(date) => date,
            Err(_) => return utils::send_error(ctx, app_cmd, "Invalid date format. Please use YYYY-MM-DD format (e.g., 2023-04-15).").await,
        };
        let date_to = match date_to.map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d")).transpose() {
            Ok(date) => date,
            Err(_) => return utils::send_error(ctx, app_cmd, "Invalid date format. Please use YYYY-MM-DD format (e.g., 2023-04-15).").await,
        };

        if let Err(e) = app_cmd.0.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::DeferredChannelMessageWithSource)
        }).await {
            log_error!("Error while creating the response: {}", e);
            return;
        }

        let results = transcript::search(
            Path::new(transcript::TRANSCRIPT_DIR),
            query.as_deref(),
            username.as_deref(),
            date_from,
            date_to,
            SEARCH_LIMIT,
        );

        let mut embed = message::Embed::default();
        embed.title("Transcript Search Results");
        embed.color(message::COLOR_INFO);
        if results.is_empty() {
            embed.description("No transcripts found matching your search criteria.");
        } else {
            let mut description = format!("Found {} transcript(s) matching your search criteria.", results.len());
            if results.len() > RESULTS_SHOWN {
                description.push_str("\n⚠️ Showing only the first 10 results.");
            }
            embed.description(description);
            for (index, result) in results.iter().take(RESULTS_SHOWN).enumerate() {
                embed.field(
                    format!("{}. Transcript from {}", index + 1, display_date(result)),
                    format!("Channel ID: {}\nFilename: {}\n",
                        result.channel_id.map(|id| id.to_string()).unwrap_or_else(|| "Unknown".to_string()),
                        result.filename),
                    false,
                );
            }
        }
        let shown = results.len().min(RESULTS_SHOWN);
        let edited = app_cmd.0.edit_original_interaction_response(ctx, |resp| {
            resp.add_embed(embed);
            if shown > 0 {
                resp.components(|comp| comp.create_action_row(|action| {
                    for index in 0..shown {
                        action.create_button(|button| button
                            .label((index + 1).to_string())
                            .style(ButtonStyle::Primary)
                            .custom_id(format!("transcript_{}", index)));
                    }
                    action
                }));
            }
            resp
        }).await;
        if let Err(e) = edited {
            log_error!("Error while sending the search results: {}", e);
            return;
        }
        if shown == 0 {
            return;
        }
        let results_message = match app_cmd.0.get_interaction_response(ctx).await {
            Ok(message) => message,
            Err(e) => {
                log_error!("Error while fetching the search results message: {}", e);
                return;
            }
        };
        // Serve files on the numbered buttons until the window closes.
        let deadline = Instant::now() + RESULTS_TIMEOUT;
        loop {
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => break,
            };
            let interaction = match results_message.await_component_interaction(ctx).timeout(remaining).await {
                Some(interaction) => interaction,
                None => break,
            };
            let selected = interaction.data.custom_id.strip_prefix("transcript_")
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| results.get(index));
            match selected {
                Some(result) if result.path.exists() => {
                    let content = format!("Here is the transcript from {}:", display_date(result));
                    let sent = interaction.create_interaction_response(ctx, |resp| {
                        resp.kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|data| data
                                .ephemeral(true)
                                .content(content)
                                .add_file(AttachmentType::Path(&result.path)))
                    }).await;
                    if let Err(e) = sent {
                        log_error!("Error while sending the transcript file: {}", e);
                    }
                }
                _ => {
                    let sent = interaction.create_interaction_response(ctx, |resp| {
                        resp.kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|data| data.ephemeral(true).content("Transcript file not found."))
                    }).await;
                    if let Err(e) = sent {
                        log_error!("Error while sending the response: {}", e);
                    }
                }
            }
        }
    }

    async fn add_ticket_buttons(&self, ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>) {
        if !utils::member_is_admin(app_cmd.0.member.as_ref()) {
            return utils::send_error(ctx, app_cmd, "Only administrators can add ticket buttons.").await;
        }
        let channel_id = app_cmd.0.channel_id;
        if self.ticket_of(channel_id).await.is_none() {
            return utils::send_error(ctx, app_cmd, "This command can only be used in a ticket channel.").await;
        }
        let mut embed = message::Embed::default();
        embed.title("Ticket Actions");
        embed.description("Use the buttons below to perform common ticket actions:");
        embed.color(message::COLOR_INFO);
        let sent = channel_id.send_message(ctx, |msg| {
            msg.embed(|e| { *e = embed; e });
            msg.components(|comp| comp.create_action_row(|action| {
                action.create_button(|button| button
                    .label("Close Ticket")
                    .style(ButtonStyle::Danger)
                    .emoji(ReactionType::Unicode("🔒".to_string()))
                    .custom_id(BUTTON_TICKET_CLOSE));
                action.create_button(|button| button
                    .label("Generate Transcript")
                    .style(ButtonStyle::Primary)
                    .emoji(ReactionType::Unicode("📝".to_string()))
                    .custom_id(BUTTON_TICKET_TRANSCRIPT))
            }))
        }).await;
        let msg = match sent {
            Ok(_) => message::success("Ticket action buttons have been added to this channel.").set_ephemeral(true),
            Err(e) => {
                log_error!("Error while posting the action buttons: {}", e);
                message::error("An error occurred while adding ticket buttons.").set_ephemeral(true)
            }
        };
        if let Err(e) = app_cmd.direct_response(ctx, msg).await {
            log_error!("Error while sending the response: {}", e);
        }
    }

    async fn on_close_button(&self, ctx: &Context, interaction: &MessageComponentInteraction) {
        let channel_id = interaction.channel_id;
        let ticket = match self.ticket_of(channel_id).await {
            Some(ticket) => ticket,
            None => return self.component_error(ctx, interaction, "This button can only be used in a ticket channel.").await,
        };
        if !self.authorized(interaction.member.as_ref(), &ticket).await {
            return self.component_error(ctx, interaction, "You don't have permission to close this ticket.").await;
        }
        if ticket.status == TicketStatus::Closed {
            return self.component_error(ctx, interaction, "This ticket is already closed.").await;
        }
        let confirmed = match self.confirm_component(ctx, interaction, "Close Ticket",
            "Are you sure you want to close this ticket? This will archive the channel and generate an HTML transcript.").await
        {
            Ok(confirmed) => confirmed,
            Err(e) => {
                log_error!("{}", e);
                return;
            }
        };
        match confirmed {
            Some(true) => {
                if let Err(e) = self.close_ticket(ctx, channel_id, &interaction.user, &ticket).await {
                    log_error!("{}", e);
                    if let Err(e) = interaction.create_followup_message(ctx, |f| f.ephemeral(true).content(e)).await {
                        log_error!("Error while reporting the failure: {}", e);
                    }
                }
            }
            Some(false) => {
                if let Err(e) = interaction.create_followup_message(ctx, |f| f.ephemeral(true).content("Ticket closure cancelled.")).await {
                    log_error!("Error while sending the followup: {}", e);
                }
            }
            None => (),
        }
    }

    async fn on_transcript_button(&self, ctx: &Context, interaction: &MessageComponentInteraction) {
        let channel_id = interaction.channel_id;
        let ticket = match self.ticket_of(channel_id).await {
            Some(ticket) => ticket,
            None => return self.component_error(ctx, interaction, "This button can only be used in a ticket channel.").await,
        };
        if !self.authorized(interaction.member.as_ref(), &ticket).await {
            return self.component_error(ctx, interaction, "You don't have permission to generate a transcript.").await;
        }
        if let Err(e) = interaction.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::DeferredChannelMessageWithSource)
        }).await {
            log_error!("Error while acknowledging the transcript button: {}", e);
            return;
        }
        let msg = loop {
            let destination = match self.store.read().await.transcript_channel_id {
                Some(id) => ChannelId(id),
                None => break message::warn("No transcript channel is configured. Please ask an admin to set one with `/set_transcript_channel`."),
            };
            break match self.archive_transcript(ctx, channel_id, destination, TranscriptFormat::Html, ArchiveContext::Manual(&interaction.user)).await {
                Ok(_) => message::success(format!("HTML transcript has been sent to <#{}>.", destination.0)),
                Err(e) => {
                    log_error!("Error while generating the transcript: {}", e);
                    message::error("Failed to generate transcript. Please try again.")
                }
            };
        };
        let edited = interaction.edit_original_interaction_response(ctx, |resp| {
            *resp = msg.into();
            resp
        }).await;
        if let Err(e) = edited {
            log_error!("Error while sending the response: {}", e);
        }
    }

    /// Close transition: transcript first (when configured), then the channel
    /// side effects, then the status commit and the closure notice.
    async fn close_ticket(&self, ctx: &Context, channel_id: ChannelId, closed_by: &User, ticket: &Ticket) -> Result<(), String> {
        let destination = self.store.read().await.transcript_channel_id.map(ChannelId);
        match destination {
            Some(destination) => {
                say(ctx, channel_id, "Generating HTML transcript...").await;
                match self.archive_transcript(ctx, channel_id, destination, TranscriptFormat::Html, ArchiveContext::Closed(closed_by)).await {
                    Ok(_) => say(ctx, channel_id, format!("HTML transcript has been sent to <#{}>.", destination.0)).await,
                    Err(e) => {
                        log_error!("Error while generating the transcript: {}", e);
                        say(ctx, channel_id, "Failed to generate transcript.").await;
                    }
                }
            }
            None => say(ctx, channel_id, "No transcript channel is configured. Closing ticket without generating transcript.").await,
        }

        let mut channel = match channel_id.to_channel(ctx).await {
            Ok(Channel::Guild(channel)) => channel,
            Ok(_) => return Err("This channel is not a guild channel.".to_string()),
            Err(e) => return Err(format!("Error while fetching the ticket channel: {}", e)),
        };
        // Both side effects are best-effort: a missing permission must not
        // leave the ticket half open.
        if let Err(e) = channel.delete_permission(ctx, PermissionOverwriteType::Member(UserId(ticket.user_id))).await {
            log_warn!("Could not revoke the owner overwrite: {}", e);
        }
        let closed_name = format!("{}-closed", channel.name);
        if let Err(e) = channel.edit(ctx, |chan| chan.name(&closed_name)).await {
            log_warn!("Could not rename the closed ticket channel: {}", e);
        }

        self.store.write().await.update_ticket_status(channel_id, TicketStatus::Closed);

        let mut embed = message::Embed::default();
        embed.title("Ticket Closed");
        embed.description(format!("This ticket has been closed by <@{}>.", closed_by.id.0));
        embed.color(message::COLOR_ERROR);
        let sent = channel_id.send_message(ctx, |msg| msg.embed(|e| { *e = embed; e })).await;
        if let Err(e) = sent {
            log_warn!("Error while sending the closing notice: {}", e);
        }
        Ok(())
    }

    /// Render, store and upload a transcript to the destination channel.
    async fn archive_transcript(
        &self,
        ctx: &Context,
        channel_id: ChannelId,
        destination: ChannelId,
        format: TranscriptFormat,
        context: ArchiveContext<'_>,
    ) -> Result<(), String> {
        let channel = match channel_id.to_channel(ctx).await {
            Ok(Channel::Guild(channel)) => channel,
            Ok(_) => return Err("This channel is not a guild channel.".to_string()),
            Err(e) => return Err(format!("Error while fetching the ticket channel: {}", e)),
        };
        let document = transcript::generate(ctx, &channel, format).await;
        let path = transcript::save(&document, channel_id).await
            .ok_or_else(|| "No transcript file produced".to_string())?;
        let creator = self.store.read().await.get_ticket(channel_id)
            .map(|ticket| format!("<@{}>", ticket.user_id))
            .unwrap_or_else(|| "Unknown user".to_string());
        let content = match context {
            ArchiveContext::Closed(user) => format!(
                "{} Transcript for ticket {} (ticket closed)\nClosed by: <@{}>\nTicket creator: {}\nClosed on: {}\nFormat: {}",
                format.label(), channel.name, user.id.0, creator,
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), format.describe()
            ),
            ArchiveContext::Manual(user) => format!(
                "{} Transcript for ticket {} (manual generation)\nGenerated by: <@{}>\nTicket creator: {}\nFormat: {}",
                format.label(), channel.name, user.id.0, creator, format.describe()
            ),
        };
        destination.send_message(ctx, |msg| msg.content(content).add_file(AttachmentType::Path(&path))).await
            .map_err(|e| format!("Error while uploading the transcript: {}", e))?;
        Ok(())
    }

    /// Ephemeral Confirm/Cancel dialog on a command. `Ok(None)` on expiry.
    async fn confirm_command(&self, ctx: &Context, app_cmd: &ApplicationCommandEmbed<'_>, title: &str, question: &str) -> Result<Option<bool>, String> {
        let mut embed = message::Embed::default();
        embed.title(title);
        embed.description(question);
        embed.color(message::COLOR_WARN);
        app_cmd.0.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|data| {
                    data.ephemeral(true);
                    data.add_embed(embed);
                    data.components(confirm_buttons)
                })
        }).await.map_err(|e| format!("Error while sending the confirmation dialog: {}", e))?;
        let dialog = app_cmd.0.get_interaction_response(ctx).await
            .map_err(|e| format!("Error while fetching the confirmation dialog: {}", e))?;
        self.await_confirmation(ctx, &dialog, app_cmd.0.user.id).await
    }

    /// Same dialog, opened from a message component.
    async fn confirm_component(&self, ctx: &Context, interaction: &MessageComponentInteraction, title: &str, question: &str) -> Result<Option<bool>, String> {
        let mut embed = message::Embed::default();
        embed.title(title);
        embed.description(question);
        embed.color(message::COLOR_WARN);
        interaction.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|data| {
                    data.ephemeral(true);
                    data.add_embed(embed);
                    data.components(confirm_buttons)
                })
        }).await.map_err(|e| format!("Error while sending the confirmation dialog: {}", e))?;
        let dialog = interaction.get_interaction_response(ctx).await
            .map_err(|e| format!("Error while fetching the confirmation dialog: {}", e))?;
        self.await_confirmation(ctx, &dialog, interaction.user.id).await
    }

    async fn await_confirmation(&self, ctx: &Context, dialog: &serenity::model::channel::Message, author: UserId) -> Result<Option<bool>, String> {
        let interaction = match dialog.await_component_interaction(ctx).author_id(author.0).timeout(CONFIRM_TIMEOUT).await {
            Some(interaction) => interaction,
            None => return Ok(None),
        };
        if let Err(e) = interaction.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::DeferredUpdateMessage)
        }).await {
            log_warn!("Error while acknowledging the confirmation: {}", e);
        }
        Ok(Some(interaction.data.custom_id == CONFIRM_YES))
    }

    async fn component_error<D: std::fmt::Display>(&self, ctx: &Context, interaction: &MessageComponentInteraction, error: D) {
        log_error!("{}", error);
        let sent = interaction.create_interaction_response(ctx, |resp| {
            *resp = message::error(error).set_ephemeral(true).into();
            resp
        }).await;
        if let Err(e) = sent {
            log_error!("Error while sending the response: {}", e);
        }
    }
}

fn confirm_buttons(comp: &mut serenity::builder::CreateComponents) -> &mut serenity::builder::CreateComponents {
    comp.create_action_row(|action| {
        action.create_button(|button| button
            .label("Confirm")
            .style(ButtonStyle::Danger)
            .emoji(ReactionType::Unicode("✅".to_string()))
            .custom_id(CONFIRM_YES));
        action.create_button(|button| button
            .label("Cancel")
            .style(ButtonStyle::Secondary)
            .emoji(ReactionType::Unicode("❌".to_string()))
            .custom_id(CONFIRM_NO))
    })
}

enum ArchiveContext<'a> {
    Closed(&'a User),
    Manual(&'a User),
}

fn participant_permissions() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::EMBED_LINKS
        | Permissions::ATTACH_FILES
        | Permissions::READ_MESSAGE_HISTORY
}

async fn say<D: std::fmt::Display>(ctx: &Context, channel_id: ChannelId, content: D) {
    if let Err(e) = channel_id.say(ctx, content).await {
        log_warn!("Error while sending a channel message: {}", e);
    }
}

fn display_date(result: &transcript::SearchResult) -> String {
    result.date
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown date".to_string())
}
