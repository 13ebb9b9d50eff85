//! Parts inventory module.
//!
//! Business rules for stocked parts, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod item;

pub use item::{
    InventoryFilter, InventoryItem, ItemDetails, ItemFields, DEFAULT_MIN_QUANTITY,
};
