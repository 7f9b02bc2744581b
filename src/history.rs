/// Up to `MAX_ORDER` previous bytes packed into a shift register.
///
/// The newest byte sits in the lowest 8 bits, so the suffix of length `len`
/// is just the low `8 * len` bits. This is also the key layout of the
/// context tables, which makes lookups a mask away from the running context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunningContext {
    bytes: u64,
    len: usize,
    capacity: usize,
}

pub const MAX_ORDER: usize = 7;

impl RunningContext {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity <= MAX_ORDER);
        Self { bytes: 0, len: 0, capacity }
    }

    pub fn clear(&mut self) {
        self.bytes = 0;
        self.len = 0;
    }

    /// Appends a symbol, dropping the oldest one when full.
    pub fn push(&mut self, symbol: u8) {
        self.bytes = ((self.bytes << 8) | u64::from(symbol)) & mask(self.capacity);
        self.len = (self.len + 1).min(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Key of the last `len` symbols.
    pub fn suffix(&self, len: usize) -> u64 {
        debug_assert!(len <= self.len);
        self.bytes & mask(len)
    }
}

/// Packs context bytes (oldest first) into a table key.
pub fn pack(context: &[u8]) -> u64 {
    debug_assert!(context.len() <= MAX_ORDER);
    context.iter().fold(0, |key, &b| (key << 8) | u64::from(b))
}

/// Inverse of [`pack`] for a known context length.
pub fn unpack(key: u64, len: usize) -> Vec<u8> {
    key.to_be_bytes()[8 - len..].to_vec()
}

#[inline(always)]
fn mask(len: usize) -> u64 {
    match len {
        0 => 0,
        _ => u64::MAX >> (64 - 8 * len),
    }
}

#[cfg(test)]
mod tests {
    use super::{pack, unpack, RunningContext};

    #[test]
    fn keeps_last_symbols_only() {
        let mut ctx = RunningContext::new(2);
        b"xyz".iter().for_each(|&b| ctx.push(b));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.suffix(2), pack(b"yz"));
        assert_eq!(ctx.suffix(1), pack(b"z"));
        assert_eq!(ctx.suffix(0), 0);
    }

    #[test]
    fn grows_until_capacity() {
        let mut ctx = RunningContext::new(3);
        assert!(ctx.is_empty());
        ctx.push(b'a');
        assert_eq!((ctx.len(), ctx.suffix(1)), (1, pack(b"a")));
        ctx.push(b'b');
        assert_eq!(ctx.suffix(2), pack(b"ab"));
        ctx.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn order_zero_never_grows() {
        let mut ctx = RunningContext::new(0);
        ctx.push(b'a');
        assert_eq!((ctx.len(), ctx.suffix(0)), (0, 0));
    }

    #[test]
    fn full_width_context() {
        let mut ctx = RunningContext::new(7);
        b"0123456789".iter().for_each(|&b| ctx.push(b));
        assert_eq!(unpack(ctx.suffix(7), 7), b"3456789");
        assert_eq!(unpack(pack(b"\x00ab"), 3), b"\x00ab");
    }
}
