pub mod channels;
pub mod db;
pub mod embeds;
pub mod interaction;
pub mod tracker;
pub mod types;

pub use tracker::{TicketError, TicketTracker};
