use std::ops::Range;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::SourceSpan;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct SrcOffset(pub usize);

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn range(&self) -> Range<usize> {
        self.offs.0..self.offs.0 + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(&self, other: Span) -> Span {
        let start = self.offs().min(other.offs());
        let end = self.end().max(other.end());
        Span::new(SrcOffset(start), end - start)
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.range()
    }
}

/// Label name -> word address, filled during the first assembler pass.
///
/// Names are stored upper-cased so lookups are case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    table: FxMap<String, u8>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            table: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Bind `name` to `addr`. Returns the existing address if the name is already bound.
    pub fn insert(&mut self, name: &str, addr: u8) -> Result<(), u8> {
        let key = name.to_ascii_uppercase();
        if let Some(existing) = self.table.get(&key) {
            return Err(*existing);
        }
        self.table.insert(key, addr);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.table.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Labels in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.table.iter().map(|(name, addr)| (name.as_str(), *addr))
    }
}
