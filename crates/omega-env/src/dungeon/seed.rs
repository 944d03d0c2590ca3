use std::fmt::Write as _;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seed for deterministic dungeon generation.
///
/// A 128-bit seed, serialized as a 32-character hex string so that run
/// configurations stay readable and copy-pasteable.
///
/// # Example
///
/// ```
/// use omega_env::dungeon::DungeonSeed;
///
/// let seed = DungeonSeed::from_u128(0x2a);
/// let json = serde_json::to_string(&seed).unwrap();
/// assert_eq!(json, "\"0000000000000000000000000000002a\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DungeonSeed([u8; 16]);

impl DungeonSeed {
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    #[must_use]
    pub const fn to_u128(self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Derives the seed of one environment slot.
    ///
    /// Slots are spread with a 128-bit odd multiplier, so nearby base seeds and
    /// nearby slots still produce unrelated generators.
    #[must_use]
    pub const fn for_slot(self, slot: usize) -> Self {
        const SPREAD: u128 = 0x9e37_79b9_7f4a_7c15_f39c_c060_5ced_c835;
        let slot = slot as u128 + 1;
        Self::from_u128(self.to_u128() ^ slot.wrapping_mul(SPREAD))
    }
}

impl Serialize for DungeonSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut hex_str = String::with_capacity(2 * self.0.len());
        write!(&mut hex_str, "{:032x}", self.to_u128()).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex_str)
    }
}

impl<'de> Deserialize<'de> for DungeonSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        if hex_str.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "invalid seed: expected 32 hex characters, got {}",
                hex_str.len()
            )));
        }
        let num = u128::from_str_radix(&hex_str, 16)
            .map_err(|e| serde::de::Error::custom(format!("invalid seed: {hex_str} ({e})")))?;
        Ok(Self::from_u128(num))
    }
}
