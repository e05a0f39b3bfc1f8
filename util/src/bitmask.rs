use std::fmt;

/// A set of bit flags addressed by index.
///
/// Fixed-width unsigned ints are the cheap case; [`BitVec`] covers anything wider
/// than 128 bits. Callers pick the narrowest type that fits the number of bits they
/// need and stay generic over the rest.
pub trait Bitmask: Clone + fmt::Debug {
    /// Create a mask with room for at least `bits` bits, all unset.
    fn empty(bits: usize) -> Self;

    /// Number of addressable bits.
    fn capacity(&self) -> usize;

    /// return true if the i'th bit is set
    fn get(&self, i: usize) -> bool;

    /// set the i'th bit to true
    fn set(&mut self, i: usize);

    /// Set every bit that is set in `other`.
    fn union_with(&mut self, other: &Self);

    /// true if no bit is set.
    fn is_clear(&self) -> bool;
}

macro_rules! int_bitmask {
    ($($ty:ty),*) => {
        $(
            impl Bitmask for $ty {
                #[inline]
                fn empty(bits: usize) -> Self {
                    debug_assert!(bits <= <$ty>::BITS as usize);
                    0
                }

                #[inline]
                fn capacity(&self) -> usize {
                    <$ty>::BITS as usize
                }

                #[inline]
                fn get(&self, i: usize) -> bool {
                    (*self >> i) & 1 == 1
                }

                #[inline]
                fn set(&mut self, i: usize) {
                    *self |= 1 << i
                }

                #[inline]
                fn union_with(&mut self, other: &Self) {
                    *self |= *other
                }

                #[inline]
                fn is_clear(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

int_bitmask!(u8, u16, u32, u64, u128);

const WORD_BITS: usize = u64::BITS as usize;

/// Heap-allocated bitmask for when the fixed-width ints are too small.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitVec {
    words: Vec<u64>,
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // most significant word first, so it reads like the int masks:
        f.write_str("BitVec(")?;
        for word in self.words.iter().rev() {
            write!(f, "{word:064b}")?;
        }
        f.write_str(")")
    }
}

impl Bitmask for BitVec {
    fn empty(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(WORD_BITS)],
        }
    }

    fn capacity(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    #[inline]
    fn get(&self, i: usize) -> bool {
        self.words
            .get(i / WORD_BITS)
            .is_some_and(|word| (word >> (i % WORD_BITS)) & 1 == 1)
    }

    #[inline]
    fn set(&mut self, i: usize) {
        let word = i / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (i % WORD_BITS);
    }

    fn union_with(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            *mine |= *theirs;
        }
    }

    fn is_clear(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn check_set_get<B: Bitmask>(bits: usize) {
        let mut mask = B::empty(bits);
        assert!(mask.is_clear());
        assert!(mask.capacity() >= bits);
        mask.set(1);
        mask.set(bits - 1);
        assert!(!mask.get(0));
        assert!(mask.get(1));
        assert!(mask.get(bits - 1));
        assert!(!mask.is_clear());
    }

    #[test]
    fn test_set_get() {
        check_set_get::<u8>(8);
        check_set_get::<u16>(16);
        check_set_get::<u32>(32);
        check_set_get::<u64>(64);
        check_set_get::<u128>(128);
        check_set_get::<BitVec>(300);
    }

    #[test]
    fn test_int_layout() {
        let mut mask = 0u8;
        mask.set(1);
        assert_eq!(0b10, mask);
        let mut mask = 0u128;
        mask.set(127);
        assert_eq!(1u128 << 127, mask);
    }

    #[test]
    fn test_union() {
        let mut a = 0b0011u16;
        a.union_with(&0b0100);
        assert_eq!(0b0111, a);

        let mut a = BitVec::empty(10);
        let mut b = BitVec::empty(200);
        a.set(3);
        b.set(150);
        a.union_with(&b);
        assert!(a.get(3));
        assert!(a.get(150));
        assert!(!a.get(149));
    }

    #[test]
    fn test_bitvec_grows_on_set() {
        let mut mask = BitVec::empty(0);
        assert_eq!(0, mask.capacity());
        assert!(!mask.get(70));
        mask.set(70);
        assert!(mask.get(70));
        assert_eq!(128, mask.capacity());
    }
}
