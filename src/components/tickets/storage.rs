//! Persisted ticket table and bot settings.
//!
//! One JSON document (`tickets.json`) holds everything that must survive a
//! restart. Components share it as a [`SharedStore`] passed at construction;
//! mutations go through a write guard, which rewrites the document on drop.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, UserId};

use crate::components::utils::Data;

pub type SharedStore = Arc<Data<Storage>>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Ticket {
    pub user_id: u64,
    pub status: TicketStatus,
    pub created_at: String,
    pub country: String,
    pub group_link: String,
    pub payment_method: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Storage {
    /// Ticket table, keyed by stringified channel id.
    pub tickets: HashMap<String, Ticket>,
    pub staff_role_ids: Vec<u64>,
    pub ticket_counter: u64,
    pub ticket_category_id: Option<u64>,
    pub ticket_channel_id: Option<u64>,
    pub transcript_channel_id: Option<u64>,
    /// Seconds a user must wait between two ticket creation attempts.
    pub ticket_cooldown: u64,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            tickets: HashMap::new(),
            staff_role_ids: Vec::new(),
            ticket_counter: 0,
            ticket_category_id: None,
            ticket_channel_id: None,
            transcript_channel_id: None,
            ticket_cooldown: 30,
        }
    }
}

impl Storage {
    pub fn add_ticket(&mut self, channel_id: ChannelId, ticket: Ticket) {
        self.tickets.insert(channel_id.0.to_string(), ticket);
    }
    pub fn get_ticket(&self, channel_id: ChannelId) -> Option<&Ticket> {
        self.tickets.get(&channel_id.0.to_string())
    }
    pub fn is_ticket(&self, channel_id: ChannelId) -> bool {
        self.get_ticket(channel_id).is_some()
    }
    /// Update a ticket status. Returns false when the ticket does not exist.
    pub fn update_ticket_status(&mut self, channel_id: ChannelId, status: TicketStatus) -> bool {
        match self.tickets.get_mut(&channel_id.0.to_string()) {
            Some(ticket) => {
                ticket.status = status;
                true
            }
            None => false,
        }
    }
    pub fn delete_ticket(&mut self, channel_id: ChannelId) -> Option<Ticket> {
        self.tickets.remove(&channel_id.0.to_string())
    }
    /// Find the open ticket of a user, if any. Full scan of the ticket table.
    pub fn open_ticket_of(&self, user_id: UserId) -> Option<ChannelId> {
        self.tickets.iter()
            .find(|(_, ticket)| ticket.user_id == user_id.0 && ticket.status == TicketStatus::Open)
            .and_then(|(id, _)| id.parse::<u64>().ok())
            .map(ChannelId)
    }
    /// Draw the next ticket number.
    ///
    /// Callers hold the write guard, so the increment and the rewrite on
    /// guard drop happen as one step: two concurrent wizard completions
    /// cannot draw the same number.
    pub fn next_ticket_number(&mut self) -> u64 {
        self.ticket_counter += 1;
        self.ticket_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ticket(user_id: u64, status: TicketStatus) -> Ticket {
        Ticket {
            user_id,
            status,
            created_at: "2024-05-01 10:30:00".to_string(),
            country: "US".to_string(),
            group_link: "No link provided".to_string(),
            payment_method: "PayPal".to_string(),
        }
    }

    #[test]
    fn add_then_get_round_trip() {
        let mut storage = Storage::default();
        storage.add_ticket(ChannelId(100), sample_ticket(7, TicketStatus::Open));
        let ticket = storage.get_ticket(ChannelId(100)).unwrap();
        assert_eq!(ticket.user_id, 7);
        assert_eq!(ticket.country, "US");
        assert_eq!(ticket.group_link, "No link provided");
        assert_eq!(ticket.payment_method, "PayPal");
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[test]
    fn status_update_leaves_other_fields_alone() {
        let mut storage = Storage::default();
        storage.add_ticket(ChannelId(100), sample_ticket(7, TicketStatus::Open));
        assert!(storage.update_ticket_status(ChannelId(100), TicketStatus::Closed));
        let ticket = storage.get_ticket(ChannelId(100)).unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert_eq!(ticket.user_id, 7);
        assert_eq!(ticket.created_at, "2024-05-01 10:30:00");
        assert_eq!(ticket.payment_method, "PayPal");
        assert!(!storage.update_ticket_status(ChannelId(999), TicketStatus::Closed));
    }

    #[test]
    fn delete_removes_the_record() {
        let mut storage = Storage::default();
        storage.add_ticket(ChannelId(100), sample_ticket(7, TicketStatus::Open));
        assert!(storage.delete_ticket(ChannelId(100)).is_some());
        assert!(storage.get_ticket(ChannelId(100)).is_none());
        assert!(storage.delete_ticket(ChannelId(100)).is_none());
    }

    #[test]
    fn one_open_ticket_per_user() {
        let mut storage = Storage::default();
        storage.add_ticket(ChannelId(100), sample_ticket(7, TicketStatus::Closed));
        assert_eq!(storage.open_ticket_of(UserId(7)), None);
        storage.add_ticket(ChannelId(101), sample_ticket(7, TicketStatus::Open));
        assert_eq!(storage.open_ticket_of(UserId(7)), Some(ChannelId(101)));
        assert_eq!(storage.open_ticket_of(UserId(8)), None);
    }

    #[test]
    fn counter_is_strictly_increasing() {
        let mut storage = Storage::default();
        assert_eq!(storage.next_ticket_number(), 1);
        assert_eq!(storage.next_ticket_number(), 2);
        assert_eq!(storage.next_ticket_number(), 3);
        assert_eq!(storage.ticket_counter, 3);
    }

    #[test]
    fn persisted_layout() {
        let mut storage = Storage::default();
        storage.add_ticket(ChannelId(100), sample_ticket(7, TicketStatus::Open));
        storage.staff_role_ids.push(55);
        let json = serde_json::to_string(&storage).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tickets"]["100"]["status"], "open");
        assert_eq!(value["tickets"]["100"]["user_id"], 7);
        assert_eq!(value["staff_role_ids"][0], 55);
        assert_eq!(value["ticket_counter"], 0);
        assert_eq!(value["ticket_cooldown"], 30);
        assert!(value["ticket_category_id"].is_null());
    }
}
