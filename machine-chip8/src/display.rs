//! Bit-plane display compositor.
//!
//! The framebuffer is two 128x64 one-bit planes. Classic CHIP-8 uses a
//! 64x32 logical grid on plane 0, pixel-doubled at presentation; SUPER-CHIP
//! switches to the full 128x64 grid; XO-CHIP additionally addresses the
//! second plane through a selected-planes mask. Presentation composes both
//! planes into a 4-entry palette index per pixel.

/// Native plane width in pixels.
pub const PLANE_WIDTH: usize = 128;

/// Native plane height in pixels.
pub const PLANE_HEIGHT: usize = 64;

/// Scroll direction for `00CN`/`00DN`/`00FB`/`00FC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Two-plane XOR framebuffer with collision reporting and scrolling.
pub struct Display {
    planes: [Vec<u8>; 2],
    hires: bool,
    selected: u8,
}

impl Display {
    pub fn new() -> Self {
        Self {
            planes: [vec![0; PLANE_WIDTH * PLANE_HEIGHT], vec![0; PLANE_WIDTH * PLANE_HEIGHT]],
            hires: false,
            selected: 0b01,
        }
    }

    /// Logical grid width under the current resolution.
    pub fn width(&self) -> usize {
        if self.hires { PLANE_WIDTH } else { PLANE_WIDTH / 2 }
    }

    /// Logical grid height under the current resolution.
    pub fn height(&self) -> usize {
        if self.hires { PLANE_HEIGHT } else { PLANE_HEIGHT / 2 }
    }

    pub fn hires(&self) -> bool {
        self.hires
    }

    /// Switch between the 64x32 and 128x64 logical grids.
    pub fn set_hires(&mut self, hires: bool) {
        self.hires = hires;
    }

    /// Gate subsequent draw/clear/scroll operations to a plane mask (0..=3).
    pub fn select_planes(&mut self, mask: u8) {
        self.selected = mask & 0b11;
    }

    pub fn selected_planes(&self) -> u8 {
        self.selected
    }

    /// Number of planes the current mask addresses.
    pub fn selected_plane_count(&self) -> usize {
        usize::from(self.selected & 1) + usize::from(self.selected >> 1)
    }

    fn selected_indices(&self) -> impl Iterator<Item = usize> {
        let mask = self.selected;
        (0..2).filter(move |p| mask & (1 << p) != 0)
    }

    /// Zero the selected plane(s).
    pub fn clear(&mut self) {
        for p in self.selected_indices().collect::<Vec<_>>() {
            self.planes[p].fill(0);
        }
    }

    /// Full power-on reset: both planes cleared, lo-res, plane 0 selected.
    pub fn reset(&mut self) {
        self.planes[0].fill(0);
        self.planes[1].fill(0);
        self.hires = false;
        self.selected = 0b01;
    }

    /// XOR a sprite into the selected plane(s).
    ///
    /// `data` holds the rows for each selected plane consecutively
    /// (plane 0 first). Rows are one byte wide, or two for 16x16 big
    /// sprites (`wide`). Start coordinates wrap; rows and columns past the
    /// edge wrap or clip per the active quirk. Returns the composite
    /// collision flag: true if any drawn bit landed on a set pixel.
    pub fn draw_sprite(&mut self, x: u8, y: u8, data: &[u8], wide: bool, clip: bool) -> bool {
        let plane_count = self.selected_plane_count();
        if plane_count == 0 || data.is_empty() {
            return false;
        }

        let w = self.width();
        let h = self.height();
        let x0 = x as usize % w;
        let y0 = y as usize % h;
        let bytes_per_row = if wide { 2 } else { 1 };
        let per_plane = data.len() / plane_count;
        let rows = per_plane / bytes_per_row;

        let mut collision = false;
        for (slot, p) in self.selected_indices().collect::<Vec<_>>().into_iter().enumerate() {
            let sprite = &data[slot * per_plane..(slot + 1) * per_plane];
            for row in 0..rows {
                let py = y0 + row;
                let py = if py >= h {
                    if clip {
                        continue;
                    }
                    py % h
                } else {
                    py
                };
                for byte_idx in 0..bytes_per_row {
                    let byte = sprite[row * bytes_per_row + byte_idx];
                    for bit in 0..8 {
                        if byte & (0x80 >> bit) == 0 {
                            continue;
                        }
                        let px = x0 + byte_idx * 8 + bit;
                        let px = if px >= w {
                            if clip {
                                continue;
                            }
                            px % w
                        } else {
                            px
                        };
                        let idx = py * PLANE_WIDTH + px;
                        if self.planes[p][idx] == 1 {
                            collision = true;
                        }
                        self.planes[p][idx] ^= 1;
                    }
                }
            }
        }

        collision
    }

    /// Shift the selected plane(s) by `pixels` in `direction`.
    ///
    /// Vacated cells become zero; content scrolled past an edge is
    /// discarded.
    pub fn scroll(&mut self, direction: ScrollDirection, pixels: usize) {
        if pixels == 0 {
            return;
        }
        let w = self.width();
        let h = self.height();
        for p in self.selected_indices().collect::<Vec<_>>() {
            let mut next = vec![0u8; PLANE_WIDTH * PLANE_HEIGHT];
            for y in 0..h {
                for x in 0..w {
                    if self.planes[p][y * PLANE_WIDTH + x] == 0 {
                        continue;
                    }
                    let (nx, ny) = match direction {
                        ScrollDirection::Up => {
                            if y < pixels {
                                continue;
                            }
                            (x, y - pixels)
                        }
                        ScrollDirection::Down => {
                            if y + pixels >= h {
                                continue;
                            }
                            (x, y + pixels)
                        }
                        ScrollDirection::Left => {
                            if x < pixels {
                                continue;
                            }
                            (x - pixels, y)
                        }
                        ScrollDirection::Right => {
                            if x + pixels >= w {
                                continue;
                            }
                            (x + pixels, y)
                        }
                    };
                    next[ny * PLANE_WIDTH + nx] = 1;
                }
            }
            self.planes[p] = next;
        }
    }

    /// Compose both planes into palette indices `(plane1 << 1) | plane0`.
    ///
    /// `out` is the native 128x64 grid; in lo-res each logical pixel fills
    /// a 2x2 block.
    pub fn composite(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), PLANE_WIDTH * PLANE_HEIGHT);
        if self.hires {
            for (i, cell) in out.iter_mut().enumerate() {
                *cell = self.planes[1][i] << 1 | self.planes[0][i];
            }
        } else {
            for y in 0..self.height() {
                for x in 0..self.width() {
                    let idx = y * PLANE_WIDTH + x;
                    let value = self.planes[1][idx] << 1 | self.planes[0][idx];
                    for dy in 0..2 {
                        for dx in 0..2 {
                            out[(y * 2 + dy) * PLANE_WIDTH + x * 2 + dx] = value;
                        }
                    }
                }
            }
        }
    }

    /// Pixel value on one plane at native coordinates (for tests).
    pub fn pixel(&self, plane: usize, x: usize, y: usize) -> u8 {
        self.planes[plane][y * PLANE_WIDTH + x]
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
