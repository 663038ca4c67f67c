use std::collections::HashMap;

use crate::api::types::TextureId;

/// Maps texture keys (image paths in map files) to texture ids.
///
/// The host registers the textures it has already uploaded; keys the host
/// did not register get fresh ids so the host can load them afterwards.
pub struct TextureRegistry {
    textures: HashMap<String, TextureId>,
    next: u32,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            next: 0,
        }
    }

    /// Bind a key to a known texture id.
    pub fn register(&mut self, key: impl Into<String>, id: TextureId) {
        self.next = self.next.max(id.0.saturating_add(1));
        self.textures.insert(key.into(), id);
    }

    /// Look up a texture by key. Returns None if not found.
    pub fn get(&self, key: &str) -> Option<TextureId> {
        self.textures.get(key).copied()
    }

    /// Look up a texture by key, assigning a new id if it is unknown.
    pub fn resolve(&mut self, key: &str) -> TextureId {
        if let Some(id) = self.get(key) {
            return id;
        }
        let id = TextureId(self.next);
        self.next = self.next.saturating_add(1);
        self.textures.insert(key.to_owned(), id);
        id
    }

    /// All known keys with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TextureId)> {
        self.textures.iter().map(|(key, id)| (key.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl Default for TextureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_ids_are_reused() {
        let mut reg = TextureRegistry::new();
        reg.register("tiles.png", TextureId(7));
        assert_eq!(reg.get("tiles.png"), Some(TextureId(7)));
        assert_eq!(reg.resolve("tiles.png"), TextureId(7));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_keys_get_fresh_ids() {
        let mut reg = TextureRegistry::new();
        reg.register("a.png", TextureId(3));
        let b = reg.resolve("b.png");
        let c = reg.resolve("c.png");
        assert_eq!(b, TextureId(4));
        assert_eq!(c, TextureId(5));
        assert_eq!(reg.resolve("b.png"), b);
    }

    #[test]
    fn unknown_returns_none() {
        let reg = TextureRegistry::new();
        assert!(reg.get("nonexistent").is_none());
        assert!(reg.is_empty());
    }
}
