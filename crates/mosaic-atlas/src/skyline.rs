// Row height tables used by the shelf packer.

/// Start of a horizontal step: from `x` up to the next breakpoint, everything
/// above `bottom` is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Breakpoint {
    pub x: u32,
    pub bottom: u32,
}

/// Height profile of every row finished so far, covering `[0, width)`.
#[derive(Debug, Clone)]
pub(crate) struct Skyline {
    points: Vec<Breakpoint>,
    width: u32,
}

impl Skyline {
    pub fn new(width: u32) -> Self {
        Self {
            points: vec![Breakpoint { x: 0, bottom: 0 }],
            width,
        }
    }

    #[cfg(test)]
    pub fn points(&self) -> &[Breakpoint] {
        &self.points
    }

    fn segment_end(&self, index: usize) -> u32 {
        self.points
            .get(index + 1)
            .map_or(self.width, |next| next.x)
    }

    /// Occupied bottom at a single column.
    pub fn bottom_at(&self, x: u32) -> u32 {
        self.points
            .iter()
            .take_while(|p| p.x <= x)
            .last()
            .map_or(0, |p| p.bottom)
    }

    /// Lowest y an entry spanning `[x, x + width)` can start at.
    pub fn floor(&self, x: u32, width: u32) -> u32 {
        let end = x + width;
        self.points
            .iter()
            .enumerate()
            .filter(|&(i, p)| p.x < end && self.segment_end(i) > x)
            .map(|(_, p)| p.bottom)
            .max()
            .unwrap_or(0)
    }

    /// This profile with `row` laid over its span.
    pub fn merged(&self, row: &Row) -> Skyline {
        if row.steps.is_empty() {
            return self.clone();
        }

        let mut points: Vec<Breakpoint> = self
            .points
            .iter()
            .filter(|p| p.x < row.start)
            .copied()
            .collect();
        points.extend_from_slice(&row.steps);

        // Past the row's tail the old profile still applies.
        if row.cursor < self.width {
            points.push(Breakpoint {
                x: row.cursor,
                bottom: self.bottom_at(row.cursor),
            });
            points.extend(self.points.iter().filter(|p| p.x > row.cursor).copied());
        }

        points.dedup_by(|later, earlier| later.bottom == earlier.bottom);

        Skyline {
            points,
            width: self.width,
        }
    }

    /// Where a new row for a `width` x `height` entry should begin.
    ///
    /// Takes the first breakpoint whose floor keeps the entry under `limit`
    /// (the image height reached so far). Otherwise takes the lowest floor,
    /// growing the image, as long as it stays under `max_height`.
    pub fn row_start(
        &self,
        width: u32,
        height: u32,
        limit: u32,
        max_height: u32,
    ) -> Option<(u32, u32)> {
        let mut lowest: Option<(u32, u32)> = None;
        for p in &self.points {
            if p.x + width > self.width {
                break;
            }
            let y = self.floor(p.x, width);
            if y + height <= limit {
                return Some((p.x, y));
            }
            if lowest.map_or(true, |(_, best)| y < best) {
                lowest = Some((p.x, y));
            }
        }
        lowest.filter(|&(_, y)| y + height <= max_height)
    }
}

/// The row currently being filled, left to right from `start`.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    start: u32,
    cursor: u32,
    steps: Vec<Breakpoint>,
}

impl Row {
    pub fn new(start: u32) -> Self {
        Self {
            start,
            cursor: start,
            steps: Vec::new(),
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Record an entry of `width` placed at the cursor, reaching down to `bottom`.
    pub fn push(&mut self, width: u32, bottom: u32) {
        self.steps.push(Breakpoint {
            x: self.cursor,
            bottom,
        });
        self.cursor += width;
    }
}
