//! Core types: Symbol, Side, Holding, TargetAllocation, quantity truncation.

use std::cmp::Ordering;
use std::fmt;

/// Ticker symbol stored inline (no heap allocation).
///
/// Symbols are 1 to 8 printable ASCII bytes (`SPY`, `MATIC`, `BRK.B`).
/// `Symbol` is `Copy`, so it can be used freely as a map key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    len: u8,
    bytes: [u8; Symbol::MAX_LEN],
}

impl Symbol {
    /// Maximum symbol length in bytes.
    pub const MAX_LEN: usize = 8;

    /// Create a symbol, returning `None` if `s` is empty, longer than
    /// [`Symbol::MAX_LEN`], or contains non-printable / non-ASCII bytes.
    pub fn try_new(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.is_empty() || raw.len() > Self::MAX_LEN {
            return None;
        }
        if !raw.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            len: raw.len() as u8,
            bytes,
        })
    }

    /// Create a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid symbol (see [`Symbol::try_new`]).
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol: {s:?}"),
        }
    }

    /// The symbol as a string slice.
    pub fn as_str(&self) -> &str {
        // Only printable ASCII is ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid symbol: {s:?}")))
    }
}

/// Trade direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.pad("BUY"),
            Side::Sell => f.pad("SELL"),
        }
    }
}

/// One owned position, as reported by the account.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Holding {
    pub symbol: Symbol,
    /// Held quantity. Fractional for crypto assets.
    pub quantity: f64,
}

impl Holding {
    pub fn new(symbol: Symbol, quantity: f64) -> Self {
        Self { symbol, quantity }
    }
}

/// A target weight for one symbol, as a fraction of portfolio value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetAllocation {
    pub symbol: Symbol,
    pub weight: f64,
}

impl TargetAllocation {
    pub fn new(symbol: Symbol, weight: f64) -> Self {
        Self { symbol, weight }
    }
}

/// Number of decimal places order quantities are truncated to.
pub const QUANTITY_DECIMALS: i32 = 2;

/// Absorbs binary representation error (`0.29 * 100 = 28.999...`) before truncating.
const TRUNCATION_EPSILON: f64 = 1e-9;

/// Truncate a quantity toward zero at [`QUANTITY_DECIMALS`] decimal places.
///
/// Non-finite input truncates to `0.0`.
///
/// ```
/// use weightbook::truncate_quantity;
///
/// assert_eq!(truncate_quantity(12.4567), 12.45);
/// assert_eq!(truncate_quantity(0.004), 0.0);
/// assert_eq!(truncate_quantity(0.29), 0.29);
/// ```
pub fn truncate_quantity(quantity: f64) -> f64 {
    if !quantity.is_finite() {
        return 0.0;
    }
    let scale = 10f64.powi(QUANTITY_DECIMALS);
    let scaled = quantity * scale;
    let nudged = if scaled >= 0.0 {
        scaled + TRUNCATION_EPSILON
    } else {
        scaled - TRUNCATION_EPSILON
    };
    nudged.trunc() / scale
}
