//! # Core library of ticketio
//!
//! This library provides the component layer the bot is built on.
//!
//! ## Components system
//!
//! The bot is split into components. Each component manages its own data
//! and can be used to interact with the client or other components.
//!
//! Each component must implement the [`Component`] trait to handle events and
//! application commands. The [`Component`] trait is composed of two traits:
//! - [`ComponentEvent`] which manages Discord gateway events.
//! - [`ComponentDeclarative`] which declares the application commands of the
//!     component (groups, command names, arguments, description...)
//!
//! ## Simplify serenity
//!
//! The crate [`serenity`] is a raw implementation of the Discord API in pure
//! Rust. While [`serenity`] implements the Discord API very well and manages
//! the low level functionality, it does not provide facilities and shortcuts
//! to easily interact with it.
//!
//! This library is an overlay over [`serenity`] to answer that problem.

pub mod declarative;
pub mod event;
pub mod container;
pub mod embed;
pub mod message;
use std::sync::Arc;

pub use declarative::ComponentDeclarative;
pub use event::ComponentEvent;
pub use container::ComponentContainer;
pub use embed::ApplicationCommandEmbed;

pub trait Component: ComponentDeclarative + ComponentEvent {}
pub type Components = Vec<Arc<dyn Component>>;
