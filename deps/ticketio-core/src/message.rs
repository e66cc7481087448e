use serenity::builder::{CreateEmbed, CreateInteractionResponse, EditInteractionResponse, CreateMessage};
use serenity::utils::Colour;
pub use serenity::builder::CreateEmbed as Embed;

pub trait ToMessage {
    fn to_message(&self) -> Message;
}

pub const COLOR_INFO: Colour = Colour(0x00C9FF);
pub const COLOR_SUCCESS: Colour = Colour(0x1ed760);
pub const COLOR_ERROR: Colour = Colour(0xFF0000);
pub const COLOR_WARN: Colour = Colour(0xFFB800);

/// Message creation interface
///
/// Useful to pass the same message content to the different response APIs
/// (channel messages, interaction responses, deferred edits).
#[derive(Debug, Clone)]
pub struct Message {
    pub message: String,
    pub embeds: Vec<CreateEmbed>,
    pub ephemeral: bool,
}

impl Message {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn with_text(message: String) -> Self {
        Message {
            message,
            ..Default::default()
        }
    }
    pub fn set_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
    pub fn add_embed<F>(&mut self, f: F) -> &mut Self
        where F: FnOnce(&mut CreateEmbed) -> &mut CreateEmbed
    {
        let mut embed = CreateEmbed::default();
        f(&mut embed);
        self.embeds.push(embed);
        self
    }
    pub fn last_embed(&self) -> Option<&CreateEmbed> {
        self.embeds.last()
    }
    pub fn last_embed_mut(&mut self) -> Option<&mut CreateEmbed> {
        self.embeds.last_mut()
    }
}
impl Default for Message {
    fn default() -> Self {
        Self {
            message: String::new(),
            embeds: Vec::new(),
            ephemeral: false,
        }
    }
}
impl From<Message> for CreateMessage<'static> {
    fn from(message: Message) -> Self {
        let mut res = CreateMessage::default();
        res.content(message.message);
        res.add_embeds(message.embeds);
        res
    }
}
impl From<Message> for CreateInteractionResponse<'_> {
    fn from(message: Message) -> Self {
        use serenity::model::application::interaction::InteractionResponseType;
        let mut response = CreateInteractionResponse::default();
        response.interaction_response_data(|data| {
            if message.ephemeral {
                data.ephemeral(true);
            }
            data.content(message.message);
            for embed in message.embeds {
                data.add_embed(embed);
            }
            data
        });
        response.kind(InteractionResponseType::ChannelMessageWithSource);
        response
    }
}
impl From<&Message> for EditInteractionResponse {
    fn from(message: &Message) -> Self {
        let mut response = Self::default();
        response.content(&message.message);
        for embed in &message.embeds {
            response.add_embed(embed.clone());
        }
        response
    }
}
impl From<Message> for EditInteractionResponse {
    fn from(message: Message) -> Self {
        let mut response = Self::default();
        response.content(message.message);
        for embed in message.embeds {
            response.add_embed(embed);
        }
        response
    }
}
/// Build an error message
pub fn error<S: ToString>(error_message: S) -> Message {
    custom_embed("Error", error_message, COLOR_ERROR)
}
/// Build a warning message
pub fn warn<S: ToString>(warn_message: S) -> Message {
    custom_embed("Warning", warn_message, COLOR_WARN)
}
/// Build a success message
pub fn success<S: ToString>(success_message: S) -> Message {
    custom_embed("Done", success_message, COLOR_SUCCESS)
}
/// Build an information message
pub fn info<S: ToString>(info_message: S) -> Message {
    custom_embed("Information", info_message, COLOR_INFO)
}
/// Build a custom embed message
pub fn custom_embed<S1, S2, C>(title: S1, message: S2, color: C) -> Message
    where
    S1: ToString,
    S2: ToString,
    C: Into<Colour>
{
    let mut embed = CreateEmbed::default();
    embed
        .title(title)
        .description(message)
        .color(color);
    Message {
        embeds: vec![embed],
        ..Default::default()
    }
}
