// -------------------------------------------------------------------
// Versioned
// -------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Versioned<T> {
    version: u64,
    data: T,
}

impl<T> Versioned<T> {
    pub fn new(data: T) -> Self {
        Self { version: 0, data }
    }
    pub fn get(&self) -> &T {
        &self.data
    }
    pub fn get_mut(&mut self) -> &mut T {
        self.version = self.version.wrapping_add(1);
        &mut self.data
    }
    pub fn set(&mut self, data: T) {
        self.data = data;
        self.version = self.version.wrapping_add(1);
    }
    pub fn version(&self) -> u64 {
        self.version
    }
}

// -------------------------------------------------------------------
// Memoized
// -------------------------------------------------------------------

pub struct Memoized<S, K, V> {
    version: u64,
    cached: Option<(K, V)>,
    get_key: Box<dyn Fn(&S) -> K>,
    calc: Box<dyn Fn(&S) -> V>,
}

impl<S, K, V> Memoized<S, K, V>
where
    K: PartialEq,
{
    pub fn new(
        get_key: impl Fn(&S) -> K + 'static,
        calc: impl Fn(&S) -> V + 'static,
    ) -> Self {
        Self {
            version: 0,
            cached: None,
            get_key: Box::new(get_key),
            calc: Box::new(calc),
        }
    }

    /// Recompute only if the key changed; return a reference to the cached value.
    pub fn get<'a>(&'a mut self, store: &S) -> &'a V {
        self.get_mut(store)
    }

    /// Mutable access to the cached value, recomputing first if stale.
    pub fn get_mut<'a>(&'a mut self, store: &S) -> &'a mut V {
        let key = (self.get_key)(store);
        match &mut self.cached {
            Some((cached_key, value)) if *cached_key == key => value,
            slot => {
                let value = (self.calc)(store);
                self.version = self.version.wrapping_add(1);
                &mut slot.insert((key, value)).1
            }
        }
    }

    /// Incremented each time the value is recomputed.
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_versioned_bumps_on_mutation() {
        let mut value = Versioned::new(vec![1]);
        assert_eq!(value.version(), 0);
        value.get_mut().push(2);
        value.set(vec![3]);
        assert_eq!(value.version(), 2);
        assert_eq!(value.get(), &vec![3]);
    }

    #[test]
    fn test_memoized_recomputes_only_when_key_changes() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut memo = Memoized::new(
            |s: &Versioned<Vec<i32>>| s.version(),
            move |s: &Versioned<Vec<i32>>| {
                counter.set(counter.get() + 1);
                s.get().iter().sum::<i32>()
            },
        );
        let mut store = Versioned::new(vec![1, 2]);

        assert_eq!(*memo.get(&store), 3);
        assert_eq!(*memo.get(&store), 3);
        assert_eq!(calls.get(), 1);

        store.get_mut().push(4);
        assert_eq!(*memo.get(&store), 7);
        assert_eq!(calls.get(), 2);
        assert_eq!(memo.version(), 2);
    }
}
