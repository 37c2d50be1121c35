use crate::models::ColorSet;
use std::sync::Arc;

pub type SharedColorSet = Arc<ColorSet>;

fn entry(
    bg: &str,
    text: &str,
    border: &str,
    ring: &str,
    editor_bg: &str,
    print_text: &str,
) -> SharedColorSet {
    Arc::new(ColorSet {
        bg: bg.to_string(),
        text: text.to_string(),
        border: border.to_string(),
        ring: ring.to_string(),
        easymde_bg: editor_bg.to_string(),
        print_bg: editor_bg.to_string(),
        print_text: print_text.to_string(),
    })
}

/// Built-in palette: blue, green, yellow, purple, red, indigo.
pub fn default_palette() -> Vec<SharedColorSet> {
    vec![
        entry("bg-blue-100", "text-blue-800", "border-blue-300", "focus:ring-blue-400", "#EFF6FF", "#1E40AF"),
        entry("bg-green-100", "text-green-800", "border-green-300", "focus:ring-green-400", "#ECFDF5", "#166534"),
        entry("bg-yellow-100", "text-yellow-800", "border-yellow-300", "focus:ring-yellow-400", "#FEFCE8", "#854D0E"),
        entry("bg-purple-100", "text-purple-800", "border-purple-300", "focus:ring-purple-400", "#F5F3FF", "#5B21B6"),
        entry("bg-red-100", "text-red-800", "border-red-300", "focus:ring-red-400", "#FEF2F2", "#991B1B"),
        entry("bg-indigo-100", "text-indigo-800", "border-indigo-300", "focus:ring-indigo-400", "#EEF2FF", "#3730A3"),
    ]
}

/// Round-robin color rotation for new pillars.
///
/// Owned by a document; reset whenever the document is rebuilt so a reload
/// always starts at the first palette entry.
#[derive(Clone, Debug)]
pub struct ColorAssigner {
    palette: Vec<SharedColorSet>,
    cursor: usize,
}

impl ColorAssigner {
    /// An empty palette falls back to the built-in one.
    pub fn new(palette: Vec<SharedColorSet>) -> Self {
        let palette = if palette.is_empty() {
            default_palette()
        } else {
            palette
        };
        Self { palette, cursor: 0 }
    }

    pub fn next(&mut self) -> SharedColorSet {
        let color = Arc::clone(&self.palette[self.cursor]);
        self.cursor = (self.cursor + 1) % self.palette.len();
        color
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.palette.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palette.is_empty()
    }
}

impl Default for ColorAssigner {
    fn default() -> Self {
        Self::new(default_palette())
    }
}
