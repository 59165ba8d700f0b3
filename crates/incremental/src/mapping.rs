//! Memoizing source-to-derived element mapping.
//!
//! A `MappingCache` turns a selector into a stable projection: the derived
//! element for a shared source element is created once and handed back on
//! every later lookup, so mapped views keep derived identities stable across
//! refreshes. Entries are keyed by the source element's [`Identity`]; the
//! cache never stores the source element itself. Owners evict entries
//! explicitly (`release` / `retain_live`) when elements leave the source.
//!
//! Value-type sources have no identity and are never cached. With disposal
//! tracking on, the values derived for them are still remembered, so they
//! are disposed when evicted (`evict` / `retain_detached`) or on `dispose`.

use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};
use liveseq_core::{Disposable, Element, Error, Identity, Result};

/// Source-to-derived element selector.
pub enum Selector<S, U> {
    /// Derives from the source element alone.
    Plain(Arc<dyn Fn(&S) -> U + Send + Sync>),
    /// Derives from the source element and its position.
    Indexed(Arc<dyn Fn(&S, usize) -> U + Send + Sync>),
}

impl<S, U> Selector<S, U> {
    /// Creates a position-independent selector.
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&S) -> U + Send + Sync + 'static,
    {
        Selector::Plain(Arc::new(f))
    }

    /// Creates a position-aware selector.
    pub fn indexed<F>(f: F) -> Self
    where
        F: Fn(&S, usize) -> U + Send + Sync + 'static,
    {
        Selector::Indexed(Arc::new(f))
    }

    /// Runs the selector.
    #[inline]
    pub fn select(&self, source: &S, index: usize) -> U {
        match self {
            Selector::Plain(f) => f(source),
            Selector::Indexed(f) => f(source, index),
        }
    }
}

impl<S, U> Clone for Selector<S, U> {
    fn clone(&self) -> Self {
        match self {
            Selector::Plain(f) => Selector::Plain(Arc::clone(f)),
            Selector::Indexed(f) => Selector::Indexed(Arc::clone(f)),
        }
    }
}

/// Re-derives the position-dependent state of an existing derived element.
pub type IndexUpdater<S, U> = Arc<dyn Fn(&S, &U, usize) -> U + Send + Sync>;

/// A memoizing, disposal-aware mapping from source to derived elements.
pub struct MappingCache<S, U> {
    selector: Selector<S, U>,
    updater: Option<IndexUpdater<S, U>>,
    disposer: Option<fn(&U)>,
    entries: HashMap<Identity, U>,
    /// Values derived for identity-less sources, kept only for disposal
    detached: Vec<U>,
    disposed: bool,
}

impl<S: Element, U: Element> MappingCache<S, U> {
    /// Creates a cache around the given selector.
    pub fn new(selector: Selector<S, U>) -> Self {
        Self {
            selector,
            updater: None,
            disposer: None,
            entries: HashMap::new(),
            detached: Vec::new(),
            disposed: false,
        }
    }

    /// Installs an index updater, enabling [`update_index`](Self::update_index).
    pub fn with_updater<F>(self, updater: F) -> Self
    where
        F: Fn(&S, &U, usize) -> U + Send + Sync + 'static,
    {
        self.with_shared_updater(Arc::new(updater))
    }

    /// Installs an already shared index updater.
    pub fn with_shared_updater(mut self, updater: IndexUpdater<S, U>) -> Self {
        self.updater = Some(updater);
        self
    }

    /// Returns true if an index updater is configured.
    #[inline]
    pub fn has_updater(&self) -> bool {
        self.updater.is_some()
    }

    /// Returns the number of cached entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true once [`dispose`](Self::dispose) has run.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns the derived element for `source` at `index`, creating and
    /// caching it on first sight.
    ///
    /// With an index updater, every lookup of a cached element re-derives
    /// its position-dependent state; if that produces a different derived
    /// identity the entry is replaced.
    pub fn get_or_create(&mut self, source: &S, index: usize) -> Result<U> {
        self.ensure_live()?;

        let key = match source.identity() {
            Some(key) => key,
            None => {
                let derived = self.selector.select(source, index);
                if self.disposer.is_some() {
                    self.detached.push(derived.clone());
                }
                return Ok(derived);
            }
        };

        if let Some(existing) = self.entries.get(&key).cloned() {
            return Ok(if self.has_updater() {
                self.reposition(key, source, existing, index)
            } else {
                existing
            });
        }

        let derived = self.selector.select(source, index);
        self.entries.insert(key, derived.clone());
        Ok(derived)
    }

    /// Re-derives the position-dependent state of `source` at `index`.
    ///
    /// Fails with `Unsupported` when no index updater was configured.
    pub fn update_index(&mut self, source: &S, index: usize) -> Result<U> {
        self.ensure_live()?;
        if self.updater.is_none() {
            return Err(Error::unsupported("update_index without an index updater"));
        }
        self.get_or_create(source, index)
    }

    /// Evicts the entry for `source`, disposing its derived element when
    /// disposal tracking is enabled. Returns true if an entry was evicted.
    pub fn release(&mut self, source: &S) -> bool {
        let evicted = source
            .identity()
            .and_then(|key| self.entries.remove(&key));
        match evicted {
            Some(derived) => {
                self.dispose_value(&derived);
                true
            }
            None => false,
        }
    }

    /// Evicts what was derived for `source` after one occurrence of it left
    /// the owner's collection, now holding `live`.
    ///
    /// A shared source that still occurs in `live` keeps its entry. For a
    /// value source exactly `derived` is released. Returns true if something
    /// was evicted.
    pub fn evict(&mut self, source: &S, derived: &U, live: &[S]) -> bool {
        if source.identity().is_some() {
            if live.iter().any(|s| s.same(source)) {
                return false;
            }
            return self.release(source);
        }
        match self.detached.iter().position(|d| d.same(derived)) {
            Some(pos) => {
                let derived = self.detached.swap_remove(pos);
                self.dispose_value(&derived);
                true
            }
            None => false,
        }
    }

    /// Evicts every entry whose source is not in `live`. Returns the number
    /// of evicted entries.
    pub fn retain_live(&mut self, live: &[S]) -> usize {
        let keep: HashSet<Identity> = live.iter().filter_map(Element::identity).collect();
        let mut evicted = Vec::new();
        self.entries.retain(|key, derived| {
            if keep.contains(key) {
                true
            } else {
                evicted.push(derived.clone());
                false
            }
        });
        for derived in &evicted {
            self.dispose_value(derived);
        }
        evicted.len()
    }

    /// Disposes every tracked value derived for an identity-less source
    /// that is not in `shown`. Returns the number of disposed values.
    pub fn retain_detached(&mut self, shown: &[U]) -> usize {
        if self.detached.is_empty() {
            return 0;
        }
        let keep: HashSet<Identity> = shown.iter().filter_map(Element::identity).collect();
        let mut evicted = Vec::new();
        self.detached.retain(|derived| {
            let live = match derived.identity() {
                Some(key) => keep.contains(&key),
                None => shown.iter().any(|s| s.same(derived)),
            };
            if !live {
                evicted.push(derived.clone());
            }
            live
        });
        for derived in &evicted {
            self.dispose_value(derived);
        }
        evicted.len()
    }

    /// Disposes every tracked derived element exactly once and drops all
    /// entries. Further use of the cache fails with `Disposed`.
    pub fn dispose(&mut self) -> Result<usize> {
        self.ensure_live()?;
        self.disposed = true;
        let detached = core::mem::take(&mut self.detached);
        let count = self.entries.len() + detached.len();
        for derived in self.entries.values().chain(detached.iter()) {
            self.dispose_value(derived);
        }
        self.entries.clear();
        Ok(count)
    }

    fn reposition(&mut self, key: Identity, source: &S, existing: U, index: usize) -> U {
        let updater = match &self.updater {
            Some(updater) => Arc::clone(updater),
            None => return existing,
        };
        let updated = updater(source, &existing, index);
        if !updated.same(&existing) {
            self.entries.insert(key, updated.clone());
            self.dispose_value(&existing);
        }
        updated
    }

    fn dispose_value(&self, derived: &U) {
        if let Some(dispose) = self.disposer {
            dispose(derived);
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::disposed("MappingCache"))
        } else {
            Ok(())
        }
    }
}

impl<S: Element, U: Element + Disposable> MappingCache<S, U> {
    /// Enables disposal tracking: evicted, replaced and (on `dispose`)
    /// remaining derived elements are disposed.
    pub fn with_disposal(mut self) -> Self {
        self.disposer = Some(|derived: &U| derived.dispose());
        self
    }
}
