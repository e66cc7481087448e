//! Application core.
//!
//! Bot initialization and component management happen in this module.

use std::sync::Arc;
use serenity::{Client, prelude::GatewayIntents};
use crate::{components as cmp, config::Config};
use ticketio_core as core;

type Result<T> = serenity::Result<T>;

/// The bot structure.
///
/// Root of the application. The bot is made of several components created and
/// placed into a [ComponentContainer]. The container hands the client a
/// [ComponentEventDispatcher] which deploys Discord events into the components.
///
/// [ComponentContainer]: core::ComponentContainer
/// [ComponentEventDispatcher]: core::event::ComponentEventDispatcher
pub struct Bot {
    /// Serenity Discord client
    client: Client,
    /// Component holder, kept alive for the lifetime of the client.
    _cmp_container: core::container::RefContainer
}

impl Bot {
    /// Create a new bot and initialize it.
    pub async fn new(config: &Config) -> Result<Bot> {
        let store: cmp::SharedStore = Arc::new(
            cmp::utils::Data::from_file_or_default("tickets")
                .expect("Unable to load the ticket store")
        );
        let ref_container = Arc::new(tokio::sync::RwLock::new(core::ComponentContainer::new()));
        {
            let mut container = ref_container.write().await;
            container.add_component(cmp::Help::new(ref_container.clone()));
            container.add_component(cmp::Misc::new(config.permissions));
            container.add_component(cmp::Tickets::new(Arc::clone(&store)));
            container.add_component(cmp::TicketManage::new(Arc::clone(&store)));
            container.add_component(cmp::Settings::new(Arc::clone(&store)));
            container.add_component(cmp::SlashRegister::new(ref_container.clone()));
        }
        let client = Client::builder(&config.token, GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT)
            .raw_event_handler(ref_container.read().await.get_event_dispatcher())
            .application_id(config.app_id)
            .await?;
        Ok(Bot{
            client,
            _cmp_container: ref_container
        })
    }
    /// Start the bot.
    pub async fn start(&mut self) -> Result<()> {
        self.client.start().await
    }
}
