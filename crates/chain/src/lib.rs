//! Note monitor chain interaction layer.
//!
//! This crate provides:
//! - Contract bindings for the note manager, vaults, staking factory and Curve pools
//! - Read-only note, vault and pool queries
//! - New-head subscriptions over WebSocket
//! - Transaction signing and sending for operator actions
//! - Liquidation event history

pub mod addresses;
mod block_listener;
pub mod contracts;
mod events;
mod reader;
mod signer;

pub use addresses::{lp_name, parse_note_id, vault_for_asset, LP_POOLS};
pub use block_listener::{BlockHead, BlockListener, BlockStream};
pub use events::{date_to_block, fetch_liquidations, parse_date, LiquidationEvent, AVERAGE_BLOCK_TIME_SECS};
pub use reader::{BlockInfo, NoteReader, PoolBalances, VaultPosition, VaultValues};
pub use signer::{GasQuote, NonceManager, TransactionSender};
