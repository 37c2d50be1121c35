use super::LeafId;
use std::collections::HashMap;

/// A mounted editor widget bound to one subsection.
///
/// The binding is a resource: it must be released exactly once, when its
/// subsection is removed or the whole document is rebuilt.
pub trait EditorBinding {
    /// Current text held by the widget.
    fn value(&self) -> String;

    fn set_value(&self, text: &str);

    fn release(self);
}

/// Explicit `LeafId -> binding` map. Nothing is dropped implicitly: every
/// removal path goes through [`EditorRegistry::release`] or
/// [`EditorRegistry::release_all`].
#[derive(Debug)]
pub struct EditorRegistry<E> {
    handles: HashMap<LeafId, E>,
}

impl<E> Default for EditorRegistry<E> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<E: EditorBinding> EditorRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handle` to `leaf`. A previous binding for the same leaf is
    /// released first so two widgets never share an id.
    pub fn mount(&mut self, leaf: LeafId, handle: E) {
        if let Some(old) = self.handles.insert(leaf, handle) {
            log::debug!("editor for {leaf} remounted, releasing previous binding");
            old.release();
        }
    }

    pub fn is_mounted(&self, leaf: LeafId) -> bool {
        self.handles.contains_key(&leaf)
    }

    pub fn get(&self, leaf: LeafId) -> Option<&E> {
        self.handles.get(&leaf)
    }

    pub fn value(&self, leaf: LeafId) -> Option<String> {
        self.handles.get(&leaf).map(|h| h.value())
    }

    pub fn release(&mut self, leaf: LeafId) -> bool {
        match self.handles.remove(&leaf) {
            Some(h) => {
                h.release();
                log::debug!("released editor for {leaf}");
                true
            }
            None => false,
        }
    }

    /// Releases every binding in one pass. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, h) in self.handles.drain() {
            h.release();
        }
        if count > 0 {
            log::debug!("released {count} editors");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records releases in a shared journal.
    #[derive(Debug)]
    pub(crate) struct FakeEditor {
        pub name: String,
        pub text: Rc<RefCell<String>>,
        pub journal: Rc<RefCell<Vec<String>>>,
    }

    impl FakeEditor {
        pub(crate) fn new(name: &str, text: &str, journal: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                text: Rc::new(RefCell::new(text.to_string())),
                journal: Rc::clone(journal),
            }
        }
    }

    impl EditorBinding for FakeEditor {
        fn value(&self) -> String {
            self.text.borrow().clone()
        }

        fn set_value(&self, text: &str) {
            *self.text.borrow_mut() = text.to_string();
        }

        fn release(self) {
            self.journal.borrow_mut().push(self.name);
        }
    }
}
