use serenity::{
    model::{
        id::GuildId,
        application::{
            command::CommandOptionType,
            interaction::application_command::{ApplicationCommandInteraction, CommandData, CommandDataOption}
        }
    },
    client::Context,
    builder::EditInteractionResponse
};

use crate::message::Message;
#[derive(Clone)]
enum CommandType<'b> {
    Command(&'b CommandData),
    Option(&'b CommandDataOption)
}

impl<'a> CommandType<'a> {
    pub fn get_argument(&'a self, name: &str) -> Option<&'a CommandDataOption> {
        match self {
            CommandType::Command(command) => {
                command.options.iter().find(|option| option.name == name)
            },
            CommandType::Option(option) => {
                option.options.iter().find(|option| option.name == name)
            }
        }
    }
}

/// Deferred interaction response.
///
/// The interaction is acknowledged right away and the actual message is sent
/// later, once the command handler is done with its (potentially slow) work.
pub struct DelayedResponse<'a> {
    pub message: Option<Message>,
    ctx: &'a Context,
    app_cmd: ApplicationCommandEmbed<'a>
}

impl<'a> DelayedResponse<'a> {
    pub async fn new(ctx: &'a Context, app_cmd: ApplicationCommandEmbed<'a>, ephemeral: bool) -> serenity::Result<DelayedResponse<'a>> {
        Self::send_new_response(ctx, app_cmd.0, ephemeral).await?;

        Ok(DelayedResponse {
            message: None,
            ctx,
            app_cmd
        })
    }
    pub fn message(&mut self) -> &mut Message {
        if let None = self.message {
            self.message = Some(Message::with_text(String::new()));
        }
        match self.message {
            Some(ref mut message) => message,
            None => unreachable!("Message already created")
        }
    }
    pub async fn send(mut self) -> serenity::Result<()> {
        let result = Self::edit_response(self.ctx, self.app_cmd.0, &self.message).await;
        self.message = None;
        result
    }
    pub async fn send_message(mut self, msg: Message) -> serenity::Result<()> {
        self.message = Some(msg);
        self.send().await
    }
    async fn send_new_response(ctx: &Context, app_cmd: &ApplicationCommandInteraction, ephemeral: bool) -> serenity::Result<()> {
        use serenity::model::application::interaction::InteractionResponseType;
        app_cmd.create_interaction_response(ctx, |resp|{
            resp
                .kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|data| {
                    data.ephemeral(ephemeral)
                })
        }).await
    }
    async fn edit_response(ctx: &Context, app_cmd: &ApplicationCommandInteraction, msg: &Option<Message>) -> serenity::Result<()> {
        app_cmd.edit_original_interaction_response(ctx, |resp|{
            match msg {
                Some(msg) => *resp = EditInteractionResponse::from(msg),
                None => ()
            };
            resp
        }).await.and(Ok(()))
    }
}

impl<'a> Drop for DelayedResponse<'a> {
    fn drop(&mut self) {
        if let Some(msg) = &self.message {
            println!("Delayed message not sent: {:?}", msg);
        }
    }
}

/// # Application command container
///
/// When the bot receives a command through an interaction event, this
/// structure eases the access to the data of an [`ApplicationCommandInteraction`].
/// Since the command and its arguments can sit at different levels depending
/// on the sub groups, [`get_argument`] returns the argument directly.
///
/// [`get_argument`]: `Self::get_argument`
#[derive(Clone)]
pub struct ApplicationCommandEmbed<'a>(pub &'a ApplicationCommandInteraction, CommandType<'a>);

impl<'a> ApplicationCommandEmbed<'a> {
    /// Create an application command container.
    ///
    /// The (sub) command is searched for in the root command, then in the options.
    pub fn new(interaction: &'a ApplicationCommandInteraction) -> Self {
        let mut command = CommandType::Command(&interaction.data);
        loop {
            let options = match command {
                CommandType::Command(data) => &data.options,
                CommandType::Option(data) => &data.options
            };
            if options.len() == 0 {
                break;
            }
            if let Some(cmd) = options.iter().find(|option| option.kind == CommandOptionType::SubCommand || option.kind == CommandOptionType::SubCommandGroup) {
                command = CommandType::Option(cmd);
            } else {
                break;
            }
        }
        ApplicationCommandEmbed(interaction, command)
    }
    pub fn fullname_vec<'b>(&'b self) -> Vec<&'b str> {
        let mut names = vec![self.0.data.name.as_str()];
        let mut cmd = self.0.data.options.first();
        while let Some(&CommandDataOption{ref name, ref options, kind: CommandOptionType::SubCommandGroup | CommandOptionType::SubCommand, ..}) = cmd {
            names.push(name.as_str());
            cmd = options.first();
        }
        names
    }
    /// Return the full command name.
    ///
    /// Includes the name of the sub groups and the command, such as
    /// `group.sub_group.command`.
    pub fn fullname(&self) -> String {
        self.fullname_vec().join(".")
    }
    /// Return the id of the guild the command was invoked in.
    pub fn get_guild_id(&self) -> Option<GuildId> {
        self.0.guild_id
    }
    /// Search and return the argument `name`.
    pub fn get_argument(&'a self, name: &str) -> Option<&'a CommandDataOption> {
        self.1.get_argument(name)
    }

    pub async fn delayed_response<'b>(&'b self, ctx: &'b Context, ephemeral: bool) -> serenity::Result<DelayedResponse<'b>> {
        DelayedResponse::new(ctx, (*self).clone(), ephemeral).await
    }

    pub async fn direct_response(&self, ctx: &Context, msg: Message) -> serenity::Result<()> {
        self.0.create_interaction_response(ctx, |resp|{
            *resp = msg.into();
            resp
        }).await
    }
}
/// Helper to access an argument of a command.
///
/// Does no superfluous checking and returns the argument of the command if
/// the criteria are met.
#[macro_export]
macro_rules! get_argument {
    ($app_command:expr, $name:expr, User) => {
        match $app_command.get_argument($name) {
            Some(serenity::model::application::interaction::application_command::CommandDataOption{
                resolved: Some(serenity::model::application::interaction::application_command::CommandDataOptionValue::User(a, b)),
                ..
            }) => Some((a, b)),
            _ => None
        }
    };
    ($app_command:expr, $name:expr, $typ:ident) => {
        match $app_command.get_argument($name) {
            Some(serenity::model::application::interaction::application_command::CommandDataOption{
                resolved: Some(serenity::model::application::interaction::application_command::CommandDataOptionValue::$typ(s)),
                ..
            }) => Some(s),
            _ => None
        }
    };
}
