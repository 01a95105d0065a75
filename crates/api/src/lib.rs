//! HTTP clients for the note monitor's off-chain data.
//!
//! This crate provides clients for:
//! - Note indexer: GraphQL snapshot of every note (liquidation candidates)
//! - Rewards API: KERO entitlement with merkle proof, LP yields per note
//! - DefiLlama: USD spot prices
//! - Discord: operator channel notifications

mod discord;
mod notes;
mod pricer;
mod rewards;

pub use discord::{wrap_message, DiscordConfig, DiscordNotifier, MESSAGE_HEADER};
pub use notes::{NoteSearchClient, NoteSnapshot, DEFAULT_INDEXER_URL, SEARCH_LIMIT};
pub use pricer::{PriceAsset, PriceClient};
pub use rewards::{NoteYields, Rewards, RewardsClient, VaultYield, DEFAULT_API_URL};
