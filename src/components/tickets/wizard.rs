//! Ticket creation wizard.
//!
//! One wizard drives one questionnaire inside a freshly provisioned ticket
//! channel. Steps are explicit states; every waiting state is a collector
//! future bounded by [`STEP_TIMEOUT`], and a `None` from the collector ends
//! the whole flow as [`WizardOutcome::TimedOut`].

use std::sync::Arc;
use std::time::Duration;

use serenity::builder::CreateSelectMenuOption;
use serenity::client::Context;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::channel::{Message, ReactionType};
use serenity::model::id::ChannelId;
use serenity::model::user::User;

use ticketio_core::message;
use crate::{log_error, log_warn};
use crate::components::utils;
use super::storage::{SharedStore, Ticket, TicketStatus};

const BUTTON_COUNTRY_CANADA: &str = "country:canada";
const BUTTON_COUNTRY_US: &str = "country:us";
const BUTTON_GROUP_LINK_YES: &str = "group_link:yes";
const BUTTON_GROUP_LINK_NO: &str = "group_link:no";
const MENU_PAYMENT_METHOD: &str = "payment_method";

const STEP_TIMEOUT: Duration = Duration::from_secs(180);

/// Answer recorded when the user declines to share a group link.
pub const NO_LINK_PROVIDED: &str = "No link provided";

/// The waiting states of the questionnaire, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WizardStep {
    Country,
    GroupLinkChoice,
    GroupLinkText,
    PaymentMethod,
    Finalizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    /// The questionnaire ran to the end and the ticket record is committed.
    Completed,
    /// A step timed out. The channel stays, no record is written and staff
    /// follow up manually.
    TimedOut,
}

#[derive(Default)]
struct Answers {
    country: Option<String>,
    group_link: Option<String>,
    payment_method: Option<String>,
}

enum WizardView {
    None,
    GroupLinkButtons,
    PaymentMenu,
}

pub struct TicketWizard {
    store: SharedStore,
    channel_id: ChannelId,
    user: User,
    ticket_number: u64,
    answers: Answers,
}

impl TicketWizard {
    pub fn new(store: SharedStore, channel_id: ChannelId, user: User, ticket_number: u64) -> Self {
        Self {
            store,
            channel_id,
            user,
            ticket_number,
            answers: Answers::default(),
        }
    }

    /// Drive the questionnaire from the first step to the end.
    pub async fn run(mut self, ctx: &Context) -> Result<WizardOutcome, String> {
        let mut message = self.send_welcome(ctx).await?;
        let mut step = WizardStep::Country;
        loop {
            let next = match step {
                WizardStep::Country => self.step_country(ctx, &message).await?,
                WizardStep::GroupLinkChoice => self.step_group_link_choice(ctx, &mut message).await?,
                WizardStep::GroupLinkText => self.step_group_link_text(ctx, &mut message).await?,
                WizardStep::PaymentMethod => self.step_payment_method(ctx, &mut message).await?,
                WizardStep::Finalizing => {
                    self.finalize(ctx, &mut message).await?;
                    return Ok(WizardOutcome::Completed);
                }
            };
            step = match next {
                Some(next) => next,
                None => {
                    self.notify_timeout(ctx).await;
                    return Ok(WizardOutcome::TimedOut);
                }
            };
        }
    }

    fn setup_embed(&self, fields: &[(&str, String)]) -> message::Embed {
        let mut embed = message::Embed::default();
        embed.title(format!("Purchase Request #{:04} - Setup", self.ticket_number));
        embed.description(format!("Welcome <@{}>!", self.user.id.0));
        embed.color(message::COLOR_INFO);
        for (name, value) in fields {
            embed.field(*name, value, false);
        }
        embed
    }

    fn country_field(&self) -> (&'static str, String) {
        let country = self.answers.country.clone().unwrap_or_default();
        ("Step 1: Country ✅", format!("Selected: **{}**", country))
    }

    fn group_link_field(&self) -> (&'static str, String) {
        let value = match self.answers.group_link.as_deref() {
            Some(NO_LINK_PROVIDED) | None => NO_LINK_PROVIDED.to_string(),
            Some(link) => format!("Link provided: **{}**", link),
        };
        ("Step 2: Group Link ✅", value)
    }

    async fn send_welcome(&self, ctx: &Context) -> Result<Message, String> {
        let embed = self.setup_embed(&[
            ("Step 1: Select Your Country", "Please select your country from the options below.".to_string()),
        ]);
        self.channel_id.send_message(ctx, |msg| {
            msg.embed(|e| { *e = embed; e });
            msg.components(|comp| comp.create_action_row(|action| {
                action.create_button(|button| button
                    .label("Canada")
                    .style(ButtonStyle::Primary)
                    .emoji(ReactionType::Unicode("🇨🇦".to_string()))
                    .custom_id(BUTTON_COUNTRY_CANADA));
                action.create_button(|button| button
                    .label("US")
                    .style(ButtonStyle::Primary)
                    .emoji(ReactionType::Unicode("🇺🇸".to_string()))
                    .custom_id(BUTTON_COUNTRY_US))
            }))
        }).await.map_err(|e| format!("Error while sending the setup message: {}", e))
    }

    async fn edit_message(&self, ctx: &Context, message: &mut Message, embed: message::Embed, view: WizardView) -> Result<(), String> {
        message.edit(ctx, |msg| {
            msg.set_embed(embed);
            msg.components(|comp| match view {
                WizardView::None => comp,
                WizardView::GroupLinkButtons => comp.create_action_row(|action| {
                    action.create_button(|button| button
                        .label("Yes")
                        .style(ButtonStyle::Success)
                        .emoji(ReactionType::Unicode("✅".to_string()))
                        .custom_id(BUTTON_GROUP_LINK_YES));
                    action.create_button(|button| button
                        .label("No")
                        .style(ButtonStyle::Danger)
                        .emoji(ReactionType::Unicode("❌".to_string()))
                        .custom_id(BUTTON_GROUP_LINK_NO))
                }),
                WizardView::PaymentMenu => comp.create_action_row(|action| {
                    action.create_select_menu(|menu| menu
                        .custom_id(MENU_PAYMENT_METHOD)
                        .placeholder("Select a payment method...")
                        .min_values(1)
                        .max_values(1)
                        .options(|opts| opts.set_options(Self::payment_options())))
                }),
            })
        }).await.map_err(|e| format!("Error while updating the setup message: {}", e))
    }

    fn payment_options() -> Vec<CreateSelectMenuOption> {
        [
            ("PayPal", "💰", "Pay using PayPal"),
            ("Zelle", "💳", "Pay using Zelle"),
            ("CashApp", "💵", "Pay using CashApp"),
            ("Other", "🔄", "Other payment method"),
        ]
            .into_iter()
            .map(|(label, emoji, description)| {
                let mut option = CreateSelectMenuOption::new(label, label);
                option.description(description);
                option.emoji(ReactionType::Unicode(emoji.to_string()));
                option
            })
            .collect()
    }

    /// Wait for the ticket owner to use one of the wizard controls.
    async fn await_component(&self, ctx: &Context, message: &Message) -> Option<Arc<MessageComponentInteraction>> {
        let interaction = message.await_component_interaction(ctx)
            .author_id(self.user.id.0)
            .timeout(STEP_TIMEOUT)
            .await?;
        // Acknowledge silently, the wizard edits its own message.
        if let Err(e) = interaction.create_interaction_response(ctx, |resp| {
            resp.kind(InteractionResponseType::DeferredUpdateMessage)
        }).await {
            log_warn!("Error while acknowledging a wizard interaction: {}", e);
        }
        Some(interaction)
    }

    /// Wait for a message from the ticket owner in the ticket channel.
    async fn await_reply(&self, ctx: &Context) -> Option<Arc<Message>> {
        self.user.await_reply(ctx)
            .channel_id(self.channel_id.0)
            .timeout(STEP_TIMEOUT)
            .await
    }

    async fn step_country(&mut self, ctx: &Context, message: &Message) -> Result<Option<WizardStep>, String> {
        let interaction = match self.await_component(ctx, message).await {
            Some(interaction) => interaction,
            None => return Ok(None),
        };
        let country = match interaction.data.custom_id.as_str() {
            BUTTON_COUNTRY_CANADA => "Canada",
            _ => "US",
        };
        self.answers.country = Some(country.to_string());
        Ok(Some(WizardStep::GroupLinkChoice))
    }

    async fn step_group_link_choice(&mut self, ctx: &Context, message: &mut Message) -> Result<Option<WizardStep>, String> {
        let embed = self.setup_embed(&[
            self.country_field(),
            ("Step 2: Group Link", "Do you have a group link to share with us?".to_string()),
        ]);
        self.edit_message(ctx, message, embed, WizardView::GroupLinkButtons).await?;
        let interaction = match self.await_component(ctx, message).await {
            Some(interaction) => interaction,
            None => return Ok(None),
        };
        match interaction.data.custom_id.as_str() {
            BUTTON_GROUP_LINK_YES => Ok(Some(WizardStep::GroupLinkText)),
            _ => {
                self.answers.group_link = Some(NO_LINK_PROVIDED.to_string());
                Ok(Some(WizardStep::PaymentMethod))
            }
        }
    }

    async fn step_group_link_text(&mut self, ctx: &Context, message: &mut Message) -> Result<Option<WizardStep>, String> {
        let embed = self.setup_embed(&[
            self.country_field(),
            ("Step 2: Group Link ✅", "Please type your group link in the chat.".to_string()),
        ]);
        self.edit_message(ctx, message, embed, WizardView::None).await?;
        let mut reply = match self.await_reply(ctx).await {
            Some(reply) => reply,
            None => return Ok(None),
        };
        if !utils::is_valid_url(&reply.content) {
            if let Err(e) = reply.delete(ctx).await {
                log_warn!("Could not delete the group link message: {}", e);
            }
            let embed = self.setup_embed(&[
                self.country_field(),
                ("Step 2: Group Link ✅", "That does not look like a link. Please type your group link again.".to_string()),
            ]);
            self.edit_message(ctx, message, embed, WizardView::None).await?;
            reply = match self.await_reply(ctx).await {
                Some(reply) => reply,
                None => return Ok(None),
            };
        }
        self.answers.group_link = Some(reply.content.clone());
        // Keep the channel clean.
        if let Err(e) = reply.delete(ctx).await {
            log_warn!("Could not delete the group link message: {}", e);
        }
        Ok(Some(WizardStep::PaymentMethod))
    }

    async fn step_payment_method(&mut self, ctx: &Context, message: &mut Message) -> Result<Option<WizardStep>, String> {
        let embed = self.setup_embed(&[
            self.country_field(),
            self.group_link_field(),
            ("Step 3: Payment Method", "Please select your preferred payment method:".to_string()),
        ]);
        self.edit_message(ctx, message, embed, WizardView::PaymentMenu).await?;
        let interaction = match self.await_component(ctx, message).await {
            Some(interaction) => interaction,
            None => return Ok(None),
        };
        let method = match interaction.data.values.iter().next() {
            Some(value) => value.clone(),
            None => return Err("No payment method was selected".to_string()),
        };
        self.answers.payment_method = Some(method);
        Ok(Some(WizardStep::Finalizing))
    }

    /// Commit the finished questionnaire: summary embed, staff notice, record.
    async fn finalize(&mut self, ctx: &Context, message: &mut Message) -> Result<(), String> {
        let country = self.answers.country.clone().unwrap_or_else(|| "Not specified".to_string());
        let group_link = self.answers.group_link.clone().unwrap_or_else(|| NO_LINK_PROVIDED.to_string());
        let payment_method = self.answers.payment_method.clone().unwrap_or_else(|| "Not specified".to_string());

        let mut embed = message::Embed::default();
        embed.title("Purchase Request");
        embed.description(format!(
            "**COUNTRY**\n```\n{}\n```\n\
             **GROUP LINK**\n```\n{}\n```\n\
             **PAYMENT METHOD**\n```\n{}\n```\n\
             -# If you have **any** special delivery instructions or live in an apartment please let\n\
             -# staff know _before the order is placed_",
            country, group_link, payment_method
        ));
        embed.color(message::COLOR_SUCCESS);
        self.edit_message(ctx, message, embed, WizardView::None).await?;

        let staff_role_ids = self.store.read().await.staff_role_ids.clone();
        if !staff_role_ids.is_empty() {
            let ping = staff_role_ids.iter().map(|id| format!("<@&{}> ", id)).collect::<String>();
            let mut notice = message::Embed::default();
            notice.title("New Purchase Request");
            notice.description("A new purchase request has been submitted and is ready for processing.");
            notice.color(message::COLOR_WARN);
            notice.field("Ticket", format!("#{:04}", self.ticket_number), true);
            notice.field("User", format!("<@{}>", self.user.id.0), true);
            let sent = self.channel_id.send_message(ctx, |msg| {
                msg.content(ping);
                msg.embed(|e| { *e = notice; e })
            }).await;
            if let Err(e) = sent {
                log_warn!("Error while notifying the staff: {}", e);
            }
        }

        self.store.write().await.add_ticket(self.channel_id, Ticket {
            user_id: self.user.id.0,
            status: TicketStatus::Open,
            created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            country,
            group_link,
            payment_method,
        });
        Ok(())
    }

    async fn notify_timeout(&self, ctx: &Context) {
        let mut embed = message::Embed::default();
        embed.title("Purchase Request Setup Timed Out");
        embed.description("The purchase request setup process has timed out. A staff member will assist you shortly.");
        embed.color(message::COLOR_ERROR);
        let sent = self.channel_id.send_message(ctx, |msg| {
            msg.content(format!("<@{}>", self.user.id.0));
            msg.embed(|e| { *e = embed; e })
        }).await;
        if let Err(e) = sent {
            log_error!("Error while sending the timeout notice: {}", e);
        }
    }
}
