use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vista_common::MaterialHandle;

/// Opaque handle to a texture owned by the asset layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Texture map slots a material can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapKind {
    Albedo,
    Normal,
    MetallicRoughness,
    Emissive,
    Occlusion,
}

impl MapKind {
    pub const COUNT: usize = 5;

    pub const ALL: [MapKind; MapKind::COUNT] = [
        MapKind::Albedo,
        MapKind::Normal,
        MapKind::MetallicRoughness,
        MapKind::Emissive,
        MapKind::Occlusion,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Fixed table of texture maps indexed by [`MapKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialMaps {
    maps: [Option<TextureHandle>; MapKind::COUNT],
}

impl MaterialMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: MapKind, texture: TextureHandle) -> Self {
        self.set(kind, Some(texture));
        self
    }

    pub fn get(&self, kind: MapKind) -> Option<TextureHandle> {
        self.maps[kind.index()]
    }

    /// Bind or clear a slot, returning what was there.
    pub fn set(&mut self, kind: MapKind, texture: Option<TextureHandle>) -> Option<TextureHandle> {
        std::mem::replace(&mut self.maps[kind.index()], texture)
    }

    /// Bound slots in [`MapKind`] order.
    pub fn iter(&self) -> impl Iterator<Item = (MapKind, TextureHandle)> + '_ {
        MapKind::ALL
            .into_iter()
            .filter_map(|k| self.get(k).map(|t| (k, t)))
    }

    pub fn bound_count(&self) -> usize {
        self.maps.iter().filter(|m| m.is_some()).count()
    }
}

/// Per-frame material table, carried alongside the snapshot in a custom
/// triple-buffer slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialTable {
    materials: BTreeMap<MaterialHandle, MaterialMaps>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, material: MaterialHandle, maps: MaterialMaps) -> Option<MaterialMaps> {
        self.materials.insert(material, maps)
    }

    pub fn get(&self, material: MaterialHandle) -> Option<&MaterialMaps> {
        self.materials.get(&material)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Copy another table into this one, keeping this allocation where possible.
    pub fn copy_from(&mut self, other: &MaterialTable) {
        self.materials.clone_from(&other.materials);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_independent() {
        let maps = MaterialMaps::new()
            .with(MapKind::Albedo, TextureHandle(1))
            .with(MapKind::Emissive, TextureHandle(9));
        assert_eq!(maps.get(MapKind::Albedo), Some(TextureHandle(1)));
        assert_eq!(maps.get(MapKind::Normal), None);
        assert_eq!(maps.bound_count(), 2);
        let bound: Vec<MapKind> = maps.iter().map(|(k, _)| k).collect();
        assert_eq!(bound, vec![MapKind::Albedo, MapKind::Emissive]);
    }

    #[test]
    fn set_returns_previous_binding() {
        let mut maps = MaterialMaps::new();
        assert_eq!(maps.set(MapKind::Normal, Some(TextureHandle(4))), None);
        assert_eq!(maps.set(MapKind::Normal, None), Some(TextureHandle(4)));
        assert_eq!(maps.bound_count(), 0);
    }

    #[test]
    fn table_lookup_and_copy() {
        let mut table = MaterialTable::new();
        table.insert(
            MaterialHandle(1),
            MaterialMaps::new().with(MapKind::Albedo, TextureHandle(10)),
        );
        let mut other = MaterialTable::new();
        other.copy_from(&table);
        assert_eq!(other, table);
        assert_eq!(
            other.get(MaterialHandle(1)).and_then(|m| m.get(MapKind::Albedo)),
            Some(TextureHandle(10))
        );
        assert!(other.get(MaterialHandle(2)).is_none());
    }

    #[test]
    fn every_kind_has_a_distinct_slot() {
        let mut maps = MaterialMaps::new();
        for (i, kind) in MapKind::ALL.into_iter().enumerate() {
            maps.set(kind, Some(TextureHandle(i as u64)));
        }
        for (i, kind) in MapKind::ALL.into_iter().enumerate() {
            assert_eq!(maps.get(kind), Some(TextureHandle(i as u64)));
        }
    }
}
