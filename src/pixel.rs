//! The pixel view: a tearing-tolerant RGBA byte buffer mirroring the lattice.
//!
//! Single writer (the simulation worker), single reader (an external renderer); no lock is
//! required, only the acquire/release fence already provided by the `done` flag in
//! [`crate::simulation`]. Grounded in the lock-free-shared-buffer pattern used by
//! `TanTanDev-3d_celluar_automata`'s atomics-based chunked cell buffer rather than introducing a
//! mutex this concurrency model doesn't need.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::supercell::Colour;

/// Declared once: the byte order written per pixel. A different renderer contract (e.g. SDL's
/// ARGB8888) is the renderer's concern to reorder, not this crate's.
pub const CHANNEL_ORDER: [&str; 4] = ["R", "G", "B", "A"];

/// RGBA pixel buffer of length `4 * boundary_width * boundary_height`, shared via `Arc` with
/// whatever external renderer polls it.
#[derive(Clone)]
pub struct PixelView {
    buffer: Arc<[AtomicU8]>,
}

impl PixelView {
    pub fn new(boundary_width: usize, boundary_height: usize) -> Self {
        let len = boundary_width * boundary_height * 4;
        let buffer: Vec<AtomicU8> = (0..len).map(|_| AtomicU8::new(0)).collect();
        Self {
            buffer: buffer.into(),
        }
    }

    /// Write the four bytes for the pixel at `(x, y)`.
    pub fn write(&self, x: usize, y: usize, boundary_width: usize, colour: Colour) {
        let offset = (y * boundary_width + x) * 4;
        self.buffer[offset].store(colour.r, Ordering::Relaxed);
        self.buffer[offset + 1].store(colour.g, Ordering::Relaxed);
        self.buffer[offset + 2].store(colour.b, Ordering::Relaxed);
        self.buffer[offset + 3].store(colour.a, Ordering::Relaxed);
    }

    /// Copy the entire buffer out as a plain `Vec<u8>`, e.g. for handing to a renderer. Tearing
    /// is tolerated: this may observe a mix of two consecutive generations.
    pub fn snapshot(&self) -> Vec<u8> {
        self.buffer.iter().map(|b| b.load(Ordering::Relaxed)).collect()
    }

    /// Length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clone the `Arc` handle so a renderer thread can read the same underlying storage.
    pub fn handle(&self) -> Arc<[AtomicU8]> {
        Arc::clone(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_snapshot_round_trips() {
        let view = PixelView::new(3, 3);
        view.write(1, 1, 3, Colour::rgb(10, 20, 30));
        let snap = view.snapshot();
        let offset = (1 * 3 + 1) * 4;
        assert_eq!(&snap[offset..offset + 4], &[10, 20, 30, 255]);
    }

    #[test]
    fn fresh_buffer_is_zeroed() {
        let view = PixelView::new(2, 2);
        assert_eq!(view.len(), 2 * 2 * 4);
        assert!(view.snapshot().iter().all(|&b| b == 0));
    }
}
