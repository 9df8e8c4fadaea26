use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::hash;

/// The precomputed hash of a name. Shader variable names are hashed once at link time, so
/// that per-frame lookups never touch the strings again.
#[derive(Serialize, Deserialize, Eq)]
pub struct HashValue<T>(u64, PhantomData<T>)
where
    T: Hash + ?Sized;

impl<T> HashValue<T>
where
    T: Hash + ?Sized,
{
    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl<T> fmt::Debug for HashValue<T>
where
    T: Hash + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HashValue({:016x})", self.0)
    }
}

impl<T> Clone for HashValue<T>
where
    T: Hash + ?Sized,
{
    fn clone(&self) -> Self {
        HashValue(self.0, self.1)
    }
}

impl<T> Copy for HashValue<T> where T: Hash + ?Sized {}

impl<T> PartialEq for HashValue<T>
where
    T: Hash + ?Sized,
{
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl<T> Hash for HashValue<T>
where
    T: Hash + ?Sized,
{
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.0.hash(state);
    }
}

impl<F> From<F> for HashValue<str>
where
    F: AsRef<str>,
{
    fn from(v: F) -> Self {
        HashValue(hash::hash64(v.as_ref()), PhantomData)
    }
}

impl<T> PartialEq<T> for HashValue<str>
where
    T: AsRef<str>,
{
    fn eq(&self, other: &T) -> bool {
        self.0.eq(&hash::hash64(other.as_ref()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::hash::FastHashMap;

    #[test]
    fn hash_str() {
        let hash = HashValue::<str>::from("u_cc3MatrixModelView");
        assert_eq!(hash, "u_cc3MatrixModelView");
        assert!(hash != "u_cc3MatrixModelViewInv");
    }

    #[test]
    fn lookup() {
        let mut map = FastHashMap::<HashValue<str>, usize>::default();
        map.insert("a_cc3Position".into(), 0);
        map.insert("a_cc3Normal".into(), 1);
        map.insert(String::from("a_cc3Position").into(), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a_cc3Position".into()), Some(&2));
    }
}
