//! Table definitions for redb storage.
//!
//! Scoped data shares one byte-keyed table; key encoding is handled by the
//! keys module. Pulse bookkeeping lives in its own tables.

use redb::TableDefinition;

/// Table definitions for the store.
pub struct Tables;

impl Tables {
    /// Scoped key space: `scope ‖ subkey` → value bytes.
    pub const SCOPED: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("scoped");

    /// Store metadata: name → pulse number.
    /// Keys: [`Tables::CURRENT_PULSE_KEY`].
    pub const META: TableDefinition<'static, &'static str, u32> = TableDefinition::new("meta");

    /// Pulse chain: pulse → previous pulse.
    pub const PULSES: TableDefinition<'static, u32, u32> = TableDefinition::new("pulses");

    /// Key of the current pulse marker in [`Tables::META`].
    pub const CURRENT_PULSE_KEY: &'static str = "current_pulse";
}
