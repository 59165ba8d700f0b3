//! Element identity and disposal contracts.
//!
//! Views decide membership by *identity*: two distinct shared elements that
//! happen to compare equal are still different elements. Shared elements
//! (`Arc<T>`) therefore compare by pointer, while plain value types compare
//! by value and carry no identity at all.

use alloc::string::String;
use alloc::sync::Arc;

/// Stable identity of a shared element, derived from its allocation address.
///
/// An identity is only meaningful while the element is alive; owners that
/// key maps by identity must keep the element alive (or evict the entry)
/// before the allocation can be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(usize);

impl Identity {
    /// Creates an identity from a raw address.
    #[inline]
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// Returns the raw address backing this identity.
    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }
}

/// An element that can live in a view snapshot.
pub trait Element: Clone + Send + Sync + 'static {
    /// Returns true if `self` and `other` are the same element.
    fn same(&self, other: &Self) -> bool;

    /// Returns the identity of a shared element, or `None` for value types.
    fn identity(&self) -> Option<Identity> {
        None
    }
}

impl<T: ?Sized + Send + Sync + 'static> Element for Arc<T> {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        Arc::as_ptr(self) as *const () == Arc::as_ptr(other) as *const ()
    }

    #[inline]
    fn identity(&self) -> Option<Identity> {
        Some(Identity(Arc::as_ptr(self) as *const () as usize))
    }
}

macro_rules! value_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                #[inline]
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

value_element!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    (), String, &'static str,
);

impl<T: Element> Element for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn identity(&self) -> Option<Identity> {
        self.as_ref().and_then(Element::identity)
    }
}

/// Release-on-removal contract for derived elements.
pub trait Disposable {
    /// Releases the resources held by this element.
    fn dispose(&self);
}

impl<T: Disposable + ?Sized> Disposable for Arc<T> {
    #[inline]
    fn dispose(&self) {
        (**self).dispose()
    }
}
