use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hash, Hasher};

use seahash::SeaHasher;

/// Keys in this crate are small integers and short identifiers, where SipHash is
/// needlessly slow.
pub type FastHasher = SeaHasher;

pub type FastBuildHasher = BuildHasherDefault<FastHasher>;
pub type FastHashMap<K, V> = HashMap<K, V, FastBuildHasher>;
pub type FastHashSet<K> = HashSet<K, FastBuildHasher>;

/// Hashes a value with `FastHasher`.
#[inline]
pub fn hash64<T: Hash + ?Sized>(v: &T) -> u64 {
    let mut state = FastHasher::default();
    v.hash(&mut state);
    state.finish()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stable() {
        assert_eq!(hash64("u_cc3Color"), hash64("u_cc3Color"));
        assert!(hash64("u_cc3Color") != hash64("u_cc3Colour"));
    }

    #[test]
    fn map() {
        let mut map = FastHashMap::default();
        map.insert((3u32, 4i32), "uniform");
        assert_eq!(map.get(&(3, 4)), Some(&"uniform"));
        assert_eq!(map.get(&(4, 3)), None);
    }
}
