// Atlas: owns copies of same-format sub-images and packs them into one image.
//
// Packing is a shelf heuristic: entries go tallest first into left-to-right
// rows, leftover row space is back-filled with later (shorter) entries, and
// new rows may start on a step of the previous one instead of at x = 0.

use mosaic_core::{BorderFlags, PackedRect, PixelFormat};

use crate::error::AtlasError;
use crate::skyline::{Row, Skyline};

/// Stop back-filling a row once fewer pixels than this remain.
const MIN_ROW_GAP: u32 = 5;

/// Identity of an entry within the atlas that owns it. Keys are only
/// meaningful to that atlas; `move_entry` hands out a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(u64);

/// One sub-image owned by an atlas.
#[derive(Debug)]
pub struct AtlasEntry {
    key: EntryKey,
    /// Stored size, border included.
    width: u32,
    height: u32,
    /// Set by the last successful `pack` of the owning atlas.
    position: Option<(u32, u32)>,
    data: Vec<u8>,
}

impl AtlasEntry {
    pub fn key(&self) -> EntryKey {
        self.key
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stored pixels, row-major, border included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn packed_location(&self) -> Option<PackedRect> {
        self.position
            .map(|(x, y)| PackedRect::new(x, y, self.width, self.height))
    }
}

/// Image produced by `Atlas::pack`. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PackedImage {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug)]
pub struct Atlas {
    bpp: u32,
    next_key: u64,
    entries: Vec<AtlasEntry>,
    /// Entries the last `pack` could not place. Kept as keys so the list
    /// survives removals while the caller relocates them.
    dont_fit: Vec<EntryKey>,
}

impl Atlas {
    pub fn new(bytes_per_pixel: u32) -> Self {
        debug_assert!(
            (1..=4).contains(&bytes_per_pixel),
            "unsupported bytes per pixel: {bytes_per_pixel}"
        );
        Self {
            bpp: bytes_per_pixel,
            next_key: 0,
            entries: Vec::new(),
            dont_fit: Vec::new(),
        }
    }

    pub fn for_format(format: PixelFormat) -> Self {
        Self::new(format.bytes_per_pixel())
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.bpp
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AtlasEntry> {
        self.entries.iter()
    }

    pub fn entry(&self, key: EntryKey) -> Option<&AtlasEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: EntryKey) -> bool {
        self.entry(key).is_some()
    }

    /// Copy `width` x `height` pixels from `data` into a new entry.
    ///
    /// With a border flag the stored entry is `(width + 2) x (height + 2)`:
    /// the side columns repeat the nearest interior pixel when extruding (or
    /// stay zero for a transparent border), then the top and bottom rows are
    /// copied from the first and last bordered rows, corners included.
    pub fn add_entry(
        &mut self,
        width: u32,
        height: u32,
        data: &[u8],
        border: BorderFlags,
    ) -> Result<EntryKey, AtlasError> {
        if width == 0 || height == 0 {
            return Err(AtlasError::InvalidDimensions { width, height });
        }
        let expected = self.bpp as usize * width as usize * height as usize;
        if data.len() < expected {
            return Err(AtlasError::DataTooShort {
                expected,
                actual: data.len(),
            });
        }

        let key = self.alloc_key();
        let pad = border.padding();
        self.entries.push(AtlasEntry {
            key,
            width: width + pad,
            height: height + pad,
            position: None,
            data: copy_with_border(
                self.bpp as usize,
                width as usize,
                height as usize,
                &data[..expected],
                border,
            ),
        });
        Ok(key)
    }

    /// Free an entry's pixels. The entry must belong to this atlas.
    pub fn remove_entry(&mut self, key: EntryKey) {
        let removed = self.take_entry(key).is_some();
        debug_assert!(removed, "entry {key:?} is not in this atlas");
        if !removed {
            log::error!("Tried to remove entry {:?} not owned by the atlas", key);
        }
    }

    /// Detach an entry without dropping its pixels.
    pub fn take_entry(&mut self, key: EntryKey) -> Option<AtlasEntry> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        let mut entry = self.entries.remove(index);
        entry.position = None;
        Some(entry)
    }

    /// Adopt an entry detached from another atlas of the same pixel size.
    /// Returns the entry's key in this atlas.
    pub fn insert_entry(&mut self, mut entry: AtlasEntry) -> EntryKey {
        debug_assert_eq!(
            entry.data.len(),
            self.bpp as usize * entry.width as usize * entry.height as usize,
            "entry pixel size does not match the atlas"
        );
        entry.key = self.alloc_key();
        let key = entry.key;
        self.entries.push(entry);
        key
    }

    /// Transfer an entry from `src` into this atlas and return its new key.
    /// The pixel buffer moves with it; its position is unset until this
    /// atlas is packed.
    pub fn move_entry(&mut self, src: &mut Atlas, key: EntryKey) -> Option<EntryKey> {
        debug_assert_eq!(self.bpp, src.bpp, "moving between atlases of different formats");
        let entry = src.take_entry(key);
        debug_assert!(entry.is_some(), "entry {key:?} is not in the source atlas");
        match entry {
            Some(entry) => Some(self.insert_entry(entry)),
            None => {
                log::error!("Tried to move entry {:?} not owned by the source atlas", key);
                None
            }
        }
    }

    /// Entries the most recent `pack` could not place. Replaced by the next
    /// `pack`; not affected by `remove_entry` or `move_entry`.
    pub fn pack_failed(&self) -> &[EntryKey] {
        &self.dont_fit
    }

    /// Location within the most recent packed image.
    pub fn entry_packed_location(&self, key: EntryKey) -> Option<PackedRect> {
        self.entry(key).and_then(AtlasEntry::packed_location)
    }

    /// Every placed entry with its location in the most recent packed image.
    pub fn placements(&self) -> impl Iterator<Item = (EntryKey, PackedRect)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.packed_location().map(|rect| (e.key, rect)))
    }

    /// Pack every entry into one image no larger than `max_width` x `max_height`.
    ///
    /// Entries that cannot be placed are listed by `pack_failed` and keep no
    /// position; everything else is placed without overlap. The returned
    /// image is the bounding box of the placed entries.
    pub fn pack(&mut self, max_width: u32, max_height: u32) -> PackedImage {
        self.dont_fit.clear();
        for entry in &mut self.entries {
            entry.position = None;
        }
        if self.entries.is_empty() {
            return PackedImage::default();
        }

        // Tallest first. The sort is stable, so equal heights keep insertion order.
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| self.entries[b].height.cmp(&self.entries[a].height));

        let mut placed = vec![false; self.entries.len()];
        let mut skyline = Skyline::new(max_width);
        let mut row = Row::new(0);
        let mut data_h = 0;

        for (i, &index) in order.iter().enumerate() {
            if placed[index] {
                continue;
            }
            let (w, h) = (self.entries[index].width, self.entries[index].height);

            if row.cursor() + w <= max_width {
                let y = skyline.floor(row.cursor(), w);
                if y + h <= max_height {
                    data_h = data_h.max(place(&mut self.entries[index], &mut row, y));
                    placed[index] = true;
                    continue;
                }
            }

            // Out of room on this row. Everything taller is already placed,
            // so any later entry that fits the leftover width can go here.
            for &later in &order[i + 1..] {
                let remaining = max_width - row.cursor();
                if remaining < MIN_ROW_GAP {
                    break;
                }
                if placed[later] || self.entries[later].width > remaining {
                    continue;
                }
                let (tw, th) = (self.entries[later].width, self.entries[later].height);
                let y = skyline.floor(row.cursor(), tw);
                if y + th > max_height {
                    continue;
                }
                data_h = data_h.max(place(&mut self.entries[later], &mut row, y));
                placed[later] = true;
            }

            let next = skyline.merged(&row);
            match next.row_start(w, h, data_h, max_height) {
                Some((x, y)) => {
                    skyline = next;
                    row = Row::new(x);
                    data_h = data_h.max(place(&mut self.entries[index], &mut row, y));
                    placed[index] = true;
                }
                None => self.dont_fit.push(self.entries[index].key),
            }
        }

        let image = self.build_image();
        log::debug!(
            "Packed {} entries into {}x{} ({} did not fit)",
            self.entries.len() - self.dont_fit.len(),
            image.width,
            image.height,
            self.dont_fit.len()
        );
        image
    }

    fn alloc_key(&mut self) -> EntryKey {
        self.next_key += 1;
        EntryKey(self.next_key)
    }

    fn build_image(&self) -> PackedImage {
        let (width, height) = self
            .placements()
            .fold((0, 0), |(w, h), (_, r)| (w.max(r.right()), h.max(r.bottom())));

        let bpp = self.bpp as usize;
        let stride = width as usize * bpp;
        let mut data = vec![0u8; stride * height as usize];
        for entry in &self.entries {
            let Some((x, y)) = entry.position else {
                continue;
            };
            let row_bytes = entry.width as usize * bpp;
            for (r, src) in entry.data.chunks_exact(row_bytes).enumerate() {
                let start = (y as usize + r) * stride + x as usize * bpp;
                data[start..start + row_bytes].copy_from_slice(src);
            }
        }

        PackedImage {
            width,
            height,
            data,
        }
    }
}

/// Put `entry` at the row cursor and `y`. Returns the entry's bottom edge.
fn place(entry: &mut AtlasEntry, row: &mut Row, y: u32) -> u32 {
    entry.position = Some((row.cursor(), y));
    let bottom = y + entry.height;
    row.push(entry.width, bottom);
    bottom
}

fn copy_with_border(
    bpp: usize,
    width: usize,
    height: usize,
    src: &[u8],
    border: BorderFlags,
) -> Vec<u8> {
    if !border.has_border() {
        return src.to_vec();
    }

    let row_bytes = width * bpp;
    let stride = (width + 2) * bpp;
    let mut out = vec![0u8; stride * (height + 2)];

    for (row, src_row) in src.chunks_exact(row_bytes).enumerate() {
        let dst = &mut out[(row + 1) * stride..(row + 2) * stride];
        dst[bpp..bpp + row_bytes].copy_from_slice(src_row);
        if border.extrude {
            dst[..bpp].copy_from_slice(&src_row[..bpp]);
            dst[stride - bpp..].copy_from_slice(&src_row[row_bytes - bpp..]);
        }
    }

    if border.extrude {
        out.copy_within(stride..2 * stride, 0);
        out.copy_within(height * stride..(height + 1) * stride, (height + 1) * stride);
    }
    out
}
