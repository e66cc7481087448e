//! Miscellaneous events.

use ticketio_core as core;
use serenity::client::Context;
use serenity::model::event::{Event, ReadyEvent};
use serenity::model::gateway::Activity;
use serenity::model::permissions::Permissions;

use crate::{log_info, log_warn};

pub struct Misc {
    bot_permissions: u64,
}

impl Misc {
    pub fn new(bot_permissions: u64) -> Self {
        Self {
            bot_permissions,
        }
    }
}

impl core::ComponentDeclarative for Misc {}

#[serenity::async_trait]
impl core::ComponentEvent for Misc {
    async fn event(&self, ctx: &Context, event: &Event) {
        if let Event::Ready(ready) = event {
            self.on_ready(ctx, ready).await
        }
    }
}

impl core::Component for Misc {}

impl Misc {
    async fn on_ready(&self, ctx: &Context, ready: &ReadyEvent) {
        log_info!("Connected as {}", ready.ready.user.name);
        ctx.set_activity(Activity::watching("for tickets")).await;
        let perms = Permissions::from_bits(self.bot_permissions)
            .unwrap_or_else(|| {
                log_warn!("Invalid bot permissions in the configuration. Using the default permissions.");
                Permissions::default()
            });
        match ready.ready.user.invite_url(&ctx.http, perms).await {
            Ok(url) => log_info!("Invite link: {}", url),
            Err(e) => log_warn!("Could not build the invite link: {}", e.to_string()),
        }
    }
}
