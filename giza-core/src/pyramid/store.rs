//! Job-scoped canvas storage.

use std::collections::HashMap;

use giza_tile_utils::TileId;

use crate::plotter::{Canvas, Plotter};

/// In-memory mapping from tile identifier to a partially-built canvas.
///
/// One store exists per job (or per map/reduce task), explicitly passed and
/// discarded after the output stage; it is populated by a single writer and
/// frozen via [`CanvasStore::into_entries`] before parallel consumption.
#[derive(Debug, Default)]
pub struct CanvasStore {
    tiles: HashMap<TileId, Canvas>,
}

impl CanvasStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The canvas for `id`, created on first use.
    pub fn get_or_insert_with(
        &mut self,
        id: TileId,
        create: impl FnOnce() -> Canvas,
    ) -> &mut Canvas {
        self.tiles.entry(id).or_insert_with(create)
    }

    /// Folds another store into this one, merging canvases produced for the
    /// same tile through the plotter.
    pub fn absorb(&mut self, other: CanvasStore, plotter: &dyn Plotter) {
        for (id, canvas) in other.tiles {
            match self.tiles.entry(id) {
                std::collections::hash_map::Entry::Occupied(mut e) => {
                    plotter.merge(e.get_mut(), canvas);
                }
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(canvas);
                }
            }
        }
    }

    /// Freezes the store into entries sorted by tile id (level first).
    ///
    /// The sorted vector is what the output stage slices into disjoint
    /// ranges for its workers.
    #[must_use]
    pub fn into_entries(self) -> Vec<(TileId, Canvas)> {
        let mut entries: Vec<(TileId, Canvas)> = self.tiles.into_iter().collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    /// All tile ids, sorted. Level extraction does not require decoding.
    #[must_use]
    pub fn tile_ids(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = self.tiles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn get(&self, id: TileId) -> Option<&Canvas> {
        self.tiles.get(&id)
    }
}

impl FromIterator<(TileId, Canvas)> for CanvasStore {
    fn from_iter<T: IntoIterator<Item = (TileId, Canvas)>>(iter: T) -> Self {
        CanvasStore {
            tiles: iter.into_iter().collect(),
        }
    }
}
