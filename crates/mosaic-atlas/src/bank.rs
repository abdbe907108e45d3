// Atlas bank: a pool of atlases per pixel format, repacked and uploaded on resolve.

use std::collections::HashMap;

use mosaic_core::{
    BorderFlags, ImageUpload, PixelFormat, TexRect, TextureBackend, TextureId,
};

use crate::atlas::{Atlas, EntryKey};
use crate::config::BankConfig;
use crate::error::AtlasError;

// ──────────────────────────────────────────────
// Handles
// ──────────────────────────────────────────────

/// Caller-facing handle for one registered image. Stays valid when the
/// image migrates to an overflow atlas; invalidated by `remove_entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BankEntryId {
    index: u32,
    generation: u32,
}

/// Index into the bank's atlas list. Atlases are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct AtlasRefId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefState {
    Clean,
    /// Needs a repack before its regions can be read.
    Dirty,
}

// ──────────────────────────────────────────────
// Records
// ──────────────────────────────────────────────

struct AtlasRef {
    atlas: Atlas,
    texture: TextureId,
    format: PixelFormat,
    state: RefState,
    entries: Vec<BankEntryId>,
    packed_width: u32,
    packed_height: u32,
}

#[derive(Debug, Clone, Copy)]
struct Resolved {
    texture: TextureId,
    region: TexRect,
}

struct BankEntry {
    atlas_entry: EntryKey,
    atlas_ref: AtlasRefId,
    border: BorderFlags,
    /// Texture and UV rectangle as of the last resolve of its atlas.
    resolved: Option<Resolved>,
}

struct Slot {
    generation: u32,
    entry: Option<BankEntry>,
}

/// Summary of one atlas for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasInfo {
    pub texture: TextureId,
    pub format: PixelFormat,
    pub entries: usize,
    pub width: u32,
    pub height: u32,
    pub dirty: bool,
}

// ──────────────────────────────────────────────
// AtlasBank
// ──────────────────────────────────────────────

pub struct AtlasBank<B: TextureBackend> {
    backend: B,
    config: BankConfig,
    refs: Vec<AtlasRef>,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
}

impl<B: TextureBackend> AtlasBank<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, BankConfig::default())
    }

    pub fn with_config(backend: B, config: BankConfig) -> Self {
        Self {
            backend,
            config,
            refs: Vec::new(),
            slots: Vec::new(),
            free_slots: Vec::new(),
        }
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register an image. It is packed and uploaded on the next `resolve`.
    ///
    /// Goes into the most recently created atlas of `format`, creating one
    /// if the format is new. Fails if the image, border included, can never
    /// fit in a single atlas.
    pub fn new_entry(
        &mut self,
        width: u32,
        height: u32,
        data: &[u8],
        format: PixelFormat,
        border: BorderFlags,
    ) -> Result<BankEntryId, AtlasError> {
        if width == 0 || height == 0 {
            return Err(AtlasError::InvalidDimensions { width, height });
        }
        let stored_w = width.saturating_add(border.padding());
        let stored_h = height.saturating_add(border.padding());
        if !self.config.fits(stored_w, stored_h) {
            return Err(AtlasError::ExceedsMaxSize {
                width: stored_w,
                height: stored_h,
                max_width: self.config.max_width,
                max_height: self.config.max_height,
            });
        }
        let expected = format.image_len(width, height);
        if data.len() < expected {
            return Err(AtlasError::DataTooShort {
                expected,
                actual: data.len(),
            });
        }

        let ref_id = self.find_or_create_ref(format);
        let atlas_ref = &mut self.refs[ref_id.0];
        let atlas_entry = atlas_ref.atlas.add_entry(width, height, data, border)?;
        atlas_ref.state = RefState::Dirty;

        let id = self.alloc_slot(BankEntry {
            atlas_entry,
            atlas_ref: ref_id,
            border,
            resolved: None,
        });
        self.refs[ref_id.0].entries.push(id);
        Ok(id)
    }

    /// Drop an image. Its atlas is repacked on the next `resolve`.
    pub fn remove_entry(&mut self, id: BankEntryId) -> Result<(), AtlasError> {
        let entry = self.free_slot(id).ok_or(AtlasError::StaleEntry)?;
        let atlas_ref = &mut self.refs[entry.atlas_ref.0];
        atlas_ref.atlas.remove_entry(entry.atlas_entry);
        atlas_ref.entries.retain(|e| *e != id);
        atlas_ref.state = RefState::Dirty;
        Ok(())
    }

    /// Texture the entry samples from, as of the last resolve.
    pub fn texture(&self, id: BankEntryId) -> Option<TextureId> {
        self.entry(id)?.resolved.map(|r| r.texture)
    }

    /// Normalized rectangle of the entry's pixels (border excluded), as of
    /// the last resolve.
    pub fn region(&self, id: BankEntryId) -> Option<TexRect> {
        self.entry(id)?.resolved.map(|r| r.region)
    }

    /// Whether two entries were resolved into the same texture.
    pub fn same_texture(&self, a: BankEntryId, b: BankEntryId) -> bool {
        match (self.texture(a), self.texture(b)) {
            (Some(ta), Some(tb)) => ta == tb,
            _ => false,
        }
    }

    pub fn contains(&self, id: BankEntryId) -> bool {
        self.entry(id).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn atlas_count(&self) -> usize {
        self.refs.len()
    }

    pub fn dirty_count(&self) -> usize {
        self.refs
            .iter()
            .filter(|r| r.state == RefState::Dirty)
            .count()
    }

    pub fn atlases(&self) -> impl Iterator<Item = AtlasInfo> + '_ {
        self.refs.iter().map(|r| AtlasInfo {
            texture: r.texture,
            format: r.format,
            entries: r.entries.len(),
            width: r.packed_width,
            height: r.packed_height,
            dirty: r.state == RefState::Dirty,
        })
    }

    /// Repack and upload every dirty atlas, then refresh each entry's
    /// texture and region. Entries that overflow an atlas move to a new
    /// atlas of the same format, which is resolved in a further pass.
    ///
    /// Returns false if nothing was dirty.
    pub fn resolve(&mut self) -> bool {
        let mut did_work = false;
        loop {
            let mut overflowed = false;
            // Overflow atlases appended during this pass are handled by the next one.
            let count = self.refs.len();
            for index in 0..count {
                if self.refs[index].state == RefState::Clean {
                    continue;
                }
                did_work = true;
                overflowed |= self.resolve_ref(AtlasRefId(index));
            }
            if !overflowed {
                break;
            }
        }
        did_work
    }

    /// Returns true if some entries had to move to an overflow atlas.
    fn resolve_ref(&mut self, id: AtlasRefId) -> bool {
        let (max_w, max_h) = (self.config.max_width, self.config.max_height);
        let atlas_ref = &mut self.refs[id.0];
        atlas_ref.state = RefState::Clean;

        let image = atlas_ref.atlas.pack(max_w, max_h);
        atlas_ref.packed_width = image.width;
        atlas_ref.packed_height = image.height;
        if image.is_empty() {
            log::debug!("Atlas {:?} is empty, skipping upload", atlas_ref.texture);
        } else {
            self.backend.upload(
                atlas_ref.texture,
                ImageUpload {
                    width: image.width,
                    height: image.height,
                    format: atlas_ref.format,
                    data: &image.data,
                    clamp: true,
                },
            );
        }

        let failed = atlas_ref.atlas.pack_failed().to_vec();
        let overflowed = !failed.is_empty();
        if overflowed {
            self.spill(id, &failed);
        }
        self.update_regions(id);
        overflowed
    }

    /// Move entries that did not fit into another dirty atlas of the same
    /// format: an empty one if the bank has it, otherwise a new one.
    fn spill(&mut self, from: AtlasRefId, failed: &[EntryKey]) {
        let source = &mut self.refs[from.0];
        let format = source.format;
        let mut atlas = Atlas::for_format(format);
        let rekeyed: HashMap<EntryKey, EntryKey> = failed
            .iter()
            .filter_map(|&key| Some((key, atlas.move_entry(&mut source.atlas, key)?)))
            .collect();

        let slots = &self.slots;
        let (moved, kept): (Vec<BankEntryId>, Vec<BankEntryId>) =
            source.entries.iter().copied().partition(|id| {
                slots[id.index as usize]
                    .entry
                    .as_ref()
                    .is_some_and(|e| rekeyed.contains_key(&e.atlas_entry))
            });
        source.entries = kept;

        log::debug!(
            "{} entries overflowed atlas {:?} ({:?})",
            moved.len(),
            source.texture,
            format
        );

        let to = match self.empty_ref(format, from) {
            Some(to) => {
                log::debug!("Reusing empty atlas {:?}", self.refs[to.0].texture);
                self.refs[to.0].atlas = atlas;
                to
            }
            None => self.create_ref(format, atlas),
        };
        for id in &moved {
            if let Some(entry) = self.slots[id.index as usize].entry.as_mut() {
                if let Some(&key) = rekeyed.get(&entry.atlas_entry) {
                    entry.atlas_entry = key;
                }
                entry.atlas_ref = to;
                entry.resolved = None;
            }
        }
        let target = &mut self.refs[to.0];
        target.entries = moved;
        target.state = RefState::Dirty;
    }

    fn update_regions(&mut self, id: AtlasRefId) {
        let atlas_ref = &self.refs[id.0];
        let locations: HashMap<EntryKey, _> = atlas_ref.atlas.placements().collect();
        for entry_id in &atlas_ref.entries {
            let Some(entry) = self.slots[entry_id.index as usize].entry.as_mut() else {
                continue;
            };
            let Some(&rect) = locations.get(&entry.atlas_entry) else {
                log::error!("Entry {:?} missing from its packed atlas", entry.atlas_entry);
                continue;
            };
            let rect = if entry.border.has_border() {
                rect.inset()
            } else {
                rect
            };
            entry.resolved = Some(Resolved {
                texture: atlas_ref.texture,
                region: TexRect::from_packed(
                    rect,
                    atlas_ref.packed_width,
                    atlas_ref.packed_height,
                ),
            });
        }
    }

    // Newest atlas of the format first, so fresh entries land next to the
    // most recent overflow rather than in an atlas that is already full.
    fn find_or_create_ref(&mut self, format: PixelFormat) -> AtlasRefId {
        match self.refs.iter().rposition(|r| r.format == format) {
            Some(index) => AtlasRefId(index),
            None => self.create_ref(format, Atlas::for_format(format)),
        }
    }

    // An atlas emptied by removals keeps its texture, so overflow goes
    // there before the bank grows.
    fn empty_ref(&self, format: PixelFormat, except: AtlasRefId) -> Option<AtlasRefId> {
        self.refs
            .iter()
            .enumerate()
            .position(|(index, r)| {
                index != except.0 && r.format == format && r.atlas.is_empty() && r.entries.is_empty()
            })
            .map(AtlasRefId)
    }

    fn create_ref(&mut self, format: PixelFormat, atlas: Atlas) -> AtlasRefId {
        let texture = self.backend.create_texture();
        self.backend.incref(texture);
        self.refs.push(AtlasRef {
            atlas,
            texture,
            format,
            state: RefState::Clean,
            entries: Vec::new(),
            packed_width: 0,
            packed_height: 0,
        });
        log::debug!("Created atlas {:?} for {:?}", texture, format);
        AtlasRefId(self.refs.len() - 1)
    }

    // ── Slots ──

    fn entry(&self, id: BankEntryId) -> Option<&BankEntry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?
            .entry
            .as_ref()
    }

    fn alloc_slot(&mut self, entry: BankEntry) -> BankEntryId {
        match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                BankEntryId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                BankEntryId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    fn free_slot(&mut self, id: BankEntryId) -> Option<BankEntry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);
        Some(entry)
    }
}

impl<B: TextureBackend> Drop for AtlasBank<B> {
    fn drop(&mut self) {
        for atlas_ref in &self.refs {
            self.backend.decref(atlas_ref.texture);
        }
    }
}
