use super::{wire::WireReader, SymbolRange};
use crate::cast;
use crate::error::Result;

/// Symbol counts of a single context, kept sorted by symbol value.
///
/// The sort order is the cumulative order: a symbol's range starts at the
/// sum of the counts of all smaller symbols. Contexts above order 1 rarely
/// see more than a handful of distinct symbols, so a sorted vec beats a
/// 256-wide array on memory by a wide margin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(u8, u32)>,
    total: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(symbol, count)` pairs in ascending symbol order,
    /// skipping zero counts.
    pub fn from_counts(counts: impl IntoIterator<Item = (u8, u32)>) -> Self {
        let entries: Vec<(u8, u32)> = counts.into_iter().filter(|&(_, c)| c > 0).collect();
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        let total = entries.iter().map(|&(_, c)| u64::from(c)).sum();
        Self { entries, total }
    }

    pub fn increment(&mut self, symbol: u8) {
        match self.entries.binary_search_by_key(&symbol, |&(s, _)| s) {
            Ok(idx) if self.entries[idx].1 == u32::MAX => return,
            Ok(idx) => self.entries[idx].1 += 1,
            Err(idx) => self.entries.insert(idx, (symbol, 1)),
        }
        self.total += 1;
    }

    pub fn count(&self, symbol: u8) -> u32 {
        match self.entries.binary_search_by_key(&symbol, |&(s, _)| s) {
            Ok(idx) => self.entries[idx].1,
            Err(_) => 0,
        }
    }

    /// Sum of the counts of all symbols below `symbol`, seen or not.
    pub fn cumulative_below(&self, symbol: u8) -> u64 {
        self.entries
            .iter()
            .take_while(|&&(s, _)| s < symbol)
            .map(|&(_, c)| u64::from(c))
            .sum()
    }

    /// Halves every count, rounding up so no symbol drops out.
    pub fn halve(&mut self) {
        self.total = 0;
        for (_, count) in self.entries.iter_mut() {
            *count = (*count + 1) / 2;
            self.total += u64::from(*count);
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn range(&self, symbol: u8) -> Option<SymbolRange> {
        let mut low = 0;
        for &(s, count) in &self.entries {
            if s == symbol {
                return Some(SymbolRange::new(low, low + u64::from(count), self.total));
            }
            if s > symbol {
                break;
            }
            low += u64::from(count);
        }
        None
    }

    pub fn symbol_for_offset(&self, offset: u64) -> Option<u8> {
        let mut high = 0;
        for &(s, count) in &self.entries {
            high += u64::from(count);
            if offset < high {
                return Some(s);
            }
        }
        None
    }

    /// `entries: u16 LE` then `entries × (symbol: u8, count: u32 LE)`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&cast!(u16, self.entries.len()).to_le_bytes());
        for &(symbol, count) in &self.entries {
            out.push(symbol);
            out.extend_from_slice(&count.to_le_bytes());
        }
    }

    pub fn read_from(reader: &mut WireReader) -> Result<Self> {
        let len = usize::from(reader.u16()?);
        if len > 256 {
            return Err(reader.error(format!("table with {len} symbols")));
        }

        let mut table = Self { entries: Vec::with_capacity(len), total: 0 };
        for _ in 0..len {
            let (symbol, count) = (reader.u8()?, reader.u32()?);
            if count == 0 {
                return Err(reader.error(format!("zero count for symbol {symbol:#04x}")));
            }
            if table.entries.last().is_some_and(|&(prev, _)| prev >= symbol) {
                return Err(reader.error(format!("symbol {symbol:#04x} out of order")));
            }
            table.entries.push((symbol, count));
            table.total += u64::from(count);
        }
        Ok(table)
    }
}

impl FromIterator<u8> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut table = Self::new();
        iter.into_iter().for_each(|symbol| table.increment(symbol));
        table
    }
}

#[cfg(test)]
mod tests {
    use super::FrequencyTable;
    use crate::models::{wire::WireReader, SymbolRange};

    #[test]
    fn cumulative_ranges_follow_symbol_order() {
        let table: FrequencyTable = b"cabbcc".iter().copied().collect();
        assert_eq!(table.total(), 6);
        assert_eq!(table.range(b'a'), Some(SymbolRange::new(0, 1, 6)));
        assert_eq!(table.range(b'b'), Some(SymbolRange::new(1, 3, 6)));
        assert_eq!(table.range(b'c'), Some(SymbolRange::new(3, 6, 6)));
        assert_eq!(table.range(b'd'), None);
        assert_eq!(table.range(b'0'), None);
    }

    #[test]
    fn offsets_map_back_to_symbols() {
        let table: FrequencyTable = b"cabbcc".iter().copied().collect();
        let decoded: Vec<u8> = (0..6).filter_map(|o| table.symbol_for_offset(o)).collect();
        assert_eq!(decoded, b"abbccc");
        assert_eq!(table.symbol_for_offset(6), None);
    }

    #[test]
    fn empty_table_resolves_nothing() {
        let table = FrequencyTable::new();
        assert!(table.is_empty());
        assert_eq!(table.range(0), None);
        assert_eq!(table.symbol_for_offset(0), None);
    }

    #[test]
    fn cumulative_counts_for_unseen_symbols() {
        let table: FrequencyTable = b"cabbcc".iter().copied().collect();
        assert_eq!(table.cumulative_below(b'a'), 0);
        assert_eq!(table.cumulative_below(b'b'), 1);
        assert_eq!(table.cumulative_below(b'c'), 3);
        assert_eq!(table.cumulative_below(b'z'), 6);
        assert_eq!(table.count(b'c'), 3);
        assert_eq!(table.count(b'z'), 0);
    }

    #[test]
    fn halving_keeps_every_symbol() {
        let mut table: FrequencyTable = b"abbbbc".iter().copied().collect();
        table.halve();
        assert_eq!(table.iter().collect::<Vec<_>>(), [(b'a', 1), (b'b', 2), (b'c', 1)]);
        assert_eq!(table.total(), 4);
    }

    #[test]
    fn wire_format() {
        let table: FrequencyTable = b"aab".iter().copied().collect();
        let mut out = vec![];
        table.write_to(&mut out);
        assert_eq!(out, b"\x02\x00a\x02\x00\x00\x00b\x01\x00\x00\x00");

        let mut reader = WireReader::new(&out, "table");
        assert_eq!(FrequencyTable::read_from(&mut reader).unwrap(), table);
        reader.finish().unwrap();
    }

    #[test]
    fn rejects_unsorted_and_zero_counts() {
        let unsorted = b"\x02\x00b\x01\x00\x00\x00a\x01\x00\x00\x00";
        assert!(FrequencyTable::read_from(&mut WireReader::new(unsorted, "table")).is_err());
        let zero = b"\x01\x00a\x00\x00\x00\x00";
        assert!(FrequencyTable::read_from(&mut WireReader::new(zero, "table")).is_err());
    }
}
