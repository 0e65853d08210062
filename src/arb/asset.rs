use std::collections::HashMap;
use std::fmt;

use super::error::ArbError;

/// Index of an asset in the [`AssetUniverse`]
pub type AssetId = usize;

/// The ordered, deduplicated set of asset symbols for one run.
///
/// Indices are assigned in first-seen order and never change once the universe is built.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AssetUniverse {
    /// Symbols in index order
    symbols: Vec<String>,
    /// Reverse lookup from symbol to index
    index: HashMap<String, AssetId>,
}

impl fmt::Debug for AssetUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetUniverse({})", self.symbols.join(", "))
    }
}

impl AssetUniverse {
    /// Returns the index of `symbol`, inserting it at the end if it is new.
    pub fn insert(&mut self, symbol: &str) -> AssetId {
        if let Some(id) = self.index.get(symbol) {
            return *id;
        }
        let id = self.symbols.len();
        self.symbols.push(symbol.to_string());
        self.index.insert(symbol.to_string(), id);
        id
    }

    /// Resolves a symbol to its index.
    ///
    /// # Errors
    ///
    /// Returns [`ArbError::InvalidAsset`] if the symbol is not in the universe
    pub fn resolve(&self, symbol: &str) -> Result<AssetId, ArbError> {
        self.index
            .get(symbol)
            .copied()
            .ok_or_else(|| ArbError::InvalidAsset(symbol.to_string()))
    }

    /// The symbol at `id`, or `"?"` for an index outside the universe
    #[must_use]
    pub fn symbol(&self, id: AssetId) -> &str {
        self.symbols.get(id).map_or("?", String::as_str)
    }

    /// Number of assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the universe has no assets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates over the symbols in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for AssetUniverse {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut universe = Self::default();
        for symbol in iter {
            universe.insert(symbol.as_ref());
        }
        universe
    }
}
