use crate::bitmap::{FrameBitmap, FrameState};
use core::ptr::NonNull;
use kernel_addresses::{FRAME_SIZE, FrameNumber, PhysMapper};
use log::{debug, trace};

/// Largest pool one bitmap frame can describe: two bits per frame.
pub const MAX_FRAMES_PER_POOL: u32 = FRAME_SIZE * 8 / 2;

/// A pool of physically contiguous frames with run allocation.
///
/// See the crate docs for the state encoding. Per-frame transitions:
///
/// ```text
/// Free ──(get_frames / mark_inaccessible, first frame)──→ HeadOfSequence
/// Free ──(……, interior frame)──→ Used
/// HeadOfSequence ──(release_frames)──→ Free
/// Used ──(release_frames sweep)──→ Free
/// ```
///
/// Nothing else is legal; in particular an allocated frame never changes
/// state except by being freed.
pub struct ContiguousFramePool {
    base_frame: FrameNumber,
    n_frames: u32,
    free_frames: u32,
    bitmap: FrameBitmap,
}

impl ContiguousFramePool {
    /// Create a pool managing frames `[base_frame, base_frame + n_frames)`.
    ///
    /// With `info_frame == None` the bitmap occupies the pool's own first
    /// frame, which is marked `Used` and never handed out. Otherwise the
    /// bitmap lives in the given external frame and every pool frame
    /// starts `Free`.
    ///
    /// Panics if `n_frames` exceeds [`MAX_FRAMES_PER_POOL`].
    pub fn new<M: PhysMapper>(
        mapper: &M,
        base_frame: FrameNumber,
        n_frames: u32,
        info_frame: Option<FrameNumber>,
    ) -> Self {
        assert!(
            n_frames <= MAX_FRAMES_PER_POOL,
            "pool of {n_frames} frames does not fit one bitmap frame"
        );
        assert!(n_frames > 0);

        let bitmap_frame = info_frame.unwrap_or(base_frame);
        let storage: &mut [u8; FRAME_SIZE as usize] =
            unsafe { mapper.phys_to_mut(bitmap_frame.base()) };
        let mut bitmap = unsafe { FrameBitmap::new(NonNull::from(storage).cast(), n_frames) };

        for index in 0..n_frames {
            bitmap.set_state(index, FrameState::Free);
        }

        let mut free_frames = n_frames;
        if info_frame.is_none() {
            // The bitmap eats the first frame of the pool itself.
            bitmap.set_state(0, FrameState::Used);
            free_frames -= 1;
        }

        debug!(
            "frame pool [{base_frame}..{}) ready, {free_frames} free",
            base_frame + n_frames
        );
        Self {
            base_frame,
            n_frames,
            free_frames,
            bitmap,
        }
    }

    /// Allocate a run of exactly `n` contiguous frames, first-fit from the
    /// lowest frame upward, and return its first frame.
    ///
    /// Returns `None` when no free run of length `n` exists. Panics when
    /// `n` exceeds the pool's free count — asking for more than exists is
    /// a caller bug, not exhaustion.
    pub fn get_frames(&mut self, n: u32) -> Option<FrameNumber> {
        assert!(n > 0);
        assert!(
            n <= self.free_frames,
            "request for {n} frames exceeds {} free",
            self.free_frames
        );

        let mut run_len = 0;
        for index in 0..self.n_frames {
            if self.bitmap.state(index) == FrameState::Free {
                run_len += 1;
                if run_len == n {
                    let start = index + 1 - n;
                    self.mark_run(start, n);
                    self.free_frames -= n;
                    let first = self.base_frame + start;
                    trace!("allocated {n} frame(s) at {first}");
                    return Some(first);
                }
            } else {
                run_len = 0;
            }
        }

        debug!("no free run of {n} frame(s) in pool [{}..)", self.base_frame);
        None
    }

    /// Force-mark the run `[base, base + n)` as allocated without
    /// searching, e.g. to carve out memory holes or pre-reserved regions.
    ///
    /// Panics if the run leaves the pool range.
    pub fn mark_inaccessible(&mut self, base: FrameNumber, n: u32) {
        let start = self.index_of(base);
        assert!(
            start + n <= self.n_frames,
            "run [{base}, +{n}) leaves the pool"
        );

        // Keep free_frames equal to the number of Free cells even when a
        // caller re-marks frames that were already taken.
        let newly_taken = (start..start + n)
            .filter(|&i| self.bitmap.state(i) == FrameState::Free)
            .count() as u32;
        self.mark_run(start, n);
        self.free_frames -= newly_taken;
    }

    /// Release the run whose first frame is `first`: the head plus every
    /// `Used` frame behind it, stopping at the next `Free` frame, the next
    /// head, or the end of the pool.
    ///
    /// Panics if `first` is outside the pool or not a head-of-sequence.
    pub fn release_frames(&mut self, first: FrameNumber) {
        let mut index = self.index_of(first);
        assert_eq!(
            self.bitmap.state(index),
            FrameState::HeadOfSequence,
            "release of {first} which is not a head-of-sequence frame"
        );

        self.bitmap.set_state(index, FrameState::Free);
        self.free_frames += 1;
        index += 1;
        while index < self.n_frames && self.bitmap.state(index) == FrameState::Used {
            self.bitmap.set_state(index, FrameState::Free);
            self.free_frames += 1;
            index += 1;
        }
        trace!("released run at {first}, {} free", self.free_frames);
    }

    /// Whether `frame` lies in this pool's range.
    #[must_use]
    pub fn contains(&self, frame: FrameNumber) -> bool {
        frame >= self.base_frame && frame.as_u32() < self.base_frame.as_u32() + self.n_frames
    }

    /// Current state of one frame.
    #[must_use]
    pub fn frame_state(&self, frame: FrameNumber) -> FrameState {
        self.bitmap.state(self.index_of(frame))
    }

    #[must_use]
    pub const fn free_count(&self) -> u32 {
        self.free_frames
    }

    #[must_use]
    pub const fn base_frame(&self) -> FrameNumber {
        self.base_frame
    }

    #[must_use]
    pub const fn n_frames(&self) -> u32 {
        self.n_frames
    }

    /// Number of external info frames needed to manage `n_frames`, at two
    /// bits per frame.
    #[must_use]
    pub const fn needed_info_frames(n_frames: u32) -> u32 {
        (n_frames as u64 * 2).div_ceil(FRAME_SIZE as u64 * 8) as u32
    }

    fn index_of(&self, frame: FrameNumber) -> u32 {
        assert!(self.contains(frame), "frame {frame} outside pool");
        frame - self.base_frame
    }

    fn mark_run(&mut self, start: u32, n: u32) {
        self.bitmap.set_state(start, FrameState::HeadOfSequence);
        for index in start + 1..start + n {
            self.bitmap.set_state(index, FrameState::Used);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_addresses::PhysicalAddress;

    /// Frame-indexed arena standing in for physical memory; frames below
    /// `first_frame` do not exist.
    struct TestPhys {
        first_frame: u32,
        frames: Vec<Frame4K>,
    }

    #[repr(align(4096))]
    struct Frame4K([u8; FRAME_SIZE as usize]);

    impl TestPhys {
        fn new(first_frame: u32, count: u32) -> Self {
            let mut frames = Vec::with_capacity(count as usize);
            for _ in 0..count {
                frames.push(Frame4K([0; FRAME_SIZE as usize]));
            }
            Self {
                first_frame,
                frames,
            }
        }
    }

    impl PhysMapper for TestPhys {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            let index = (pa.frame().as_u32() - self.first_frame) as usize;
            let ptr = unsafe { self.frames.as_ptr().add(index) } as *mut T;
            unsafe { &mut *ptr }
        }
    }

    fn free_cells(pool: &ContiguousFramePool) -> u32 {
        (0..pool.n_frames())
            .filter(|&i| pool.frame_state(pool.base_frame() + i) == FrameState::Free)
            .count() as u32
    }

    #[test]
    fn internal_bitmap_consumes_first_frame() {
        let phys = TestPhys::new(512, 1);
        let pool = ContiguousFramePool::new(&phys, FrameNumber::new(512), 1024, None);

        assert_eq!(pool.free_count(), 1023);
        assert_eq!(pool.frame_state(FrameNumber::new(512)), FrameState::Used);
    }

    #[test]
    fn scenario_fixed_frame_numbers() {
        // Pool at frame 512, 1024 frames, bitmap internal.
        let phys = TestPhys::new(512, 1);
        let mut pool = ContiguousFramePool::new(&phys, FrameNumber::new(512), 1024, None);

        assert_eq!(pool.get_frames(1), Some(FrameNumber::new(513)));
        assert_eq!(pool.get_frames(4), Some(FrameNumber::new(514)));

        pool.release_frames(FrameNumber::new(514));
        assert_eq!(pool.free_count(), 1022);

        pool.release_frames(FrameNumber::new(513));
        assert_eq!(pool.free_count(), 1023);
    }

    #[test]
    fn run_is_head_then_used() {
        let phys = TestPhys::new(100, 1);
        let mut pool = ContiguousFramePool::new(&phys, FrameNumber::new(100), 64, None);

        let first = pool.get_frames(3).unwrap();
        assert_eq!(first, FrameNumber::new(101));
        assert_eq!(pool.frame_state(first), FrameState::HeadOfSequence);
        assert_eq!(pool.frame_state(first + 1), FrameState::Used);
        assert_eq!(pool.frame_state(first + 2), FrameState::Used);
        assert_eq!(pool.frame_state(first + 3), FrameState::Free);
    }

    #[test]
    fn free_count_tracks_free_cells() {
        let phys = TestPhys::new(0, 1);
        let mut pool = ContiguousFramePool::new(&phys, FrameNumber::new(0), 256, None);

        let a = pool.get_frames(5).unwrap();
        assert_eq!(pool.free_count(), free_cells(&pool));
        let b = pool.get_frames(1).unwrap();
        assert_eq!(pool.free_count(), free_cells(&pool));

        pool.release_frames(a);
        assert_eq!(pool.free_count(), free_cells(&pool));
        pool.release_frames(b);
        assert_eq!(pool.free_count(), free_cells(&pool));
        assert_eq!(pool.free_count(), 255);
    }

    #[test]
    fn release_restores_the_bitmap() {
        // Bitmap in an external frame right behind the pool range.
        let phys = TestPhys::new(0, 129);
        let mut pool =
            ContiguousFramePool::new(&phys, FrameNumber::new(0), 128, Some(FrameNumber::new(128)));

        let before: Vec<_> = (0..128)
            .map(|i| pool.frame_state(FrameNumber::new(i)))
            .collect();

        let run = pool.get_frames(7).unwrap();
        pool.release_frames(run);

        let after: Vec<_> = (0..128)
            .map(|i| pool.frame_state(FrameNumber::new(i)))
            .collect();
        assert_eq!(before, after);
        assert_eq!(pool.free_count(), 128);
    }

    #[test]
    fn first_fit_reuses_the_lowest_gap() {
        let phys = TestPhys::new(0, 1);
        let mut pool = ContiguousFramePool::new(&phys, FrameNumber::new(0), 64, None);

        let a = pool.get_frames(2).unwrap();
        let b = pool.get_frames(2).unwrap();
        let _c = pool.get_frames(2).unwrap();
        assert_eq!(a, FrameNumber::new(1));
        assert_eq!(b, FrameNumber::new(3));

        pool.release_frames(a);
        pool.release_frames(b);

        // The 4-frame hole at [1..5) is the lowest fit.
        assert_eq!(pool.get_frames(3), Some(FrameNumber::new(1)));
    }

    #[test]
    fn no_run_returns_none_without_marking() {
        let phys = TestPhys::new(0, 1);
        let mut pool = ContiguousFramePool::new(&phys, FrameNumber::new(0), 8, None);

        // Fragment: keep frames 2 and 5 allocated, free the rest.
        let a = pool.get_frames(1).unwrap(); // 1
        let b = pool.get_frames(1).unwrap(); // 2
        let c = pool.get_frames(1).unwrap(); // 3
        let d = pool.get_frames(1).unwrap(); // 4
        let e = pool.get_frames(1).unwrap(); // 5
        pool.release_frames(a);
        pool.release_frames(c);
        pool.release_frames(d);
        let free_before = pool.free_count();

        // 5 free frames total but the longest run is 2.
        assert_eq!(pool.get_frames(3), None);
        assert_eq!(pool.free_count(), free_before);

        pool.release_frames(b);
        pool.release_frames(e);
    }

    #[test]
    fn mark_inaccessible_reserves_a_run() {
        let phys = TestPhys::new(0, 33);
        let mut pool =
            ContiguousFramePool::new(&phys, FrameNumber::new(0), 32, Some(FrameNumber::new(32)));

        pool.mark_inaccessible(FrameNumber::new(8), 4);
        assert_eq!(pool.free_count(), 28);
        assert_eq!(
            pool.frame_state(FrameNumber::new(8)),
            FrameState::HeadOfSequence
        );
        assert_eq!(pool.frame_state(FrameNumber::new(11)), FrameState::Used);

        // The hole splits the pool; an 8-run must come from after it.
        assert_eq!(pool.get_frames(9), Some(FrameNumber::new(12)));
    }

    #[test]
    fn info_frame_sizing() {
        assert_eq!(ContiguousFramePool::needed_info_frames(16384), 1);
        assert_eq!(ContiguousFramePool::needed_info_frames(16385), 2);
        assert_eq!(ContiguousFramePool::needed_info_frames(1), 1);
    }

    #[test]
    #[should_panic(expected = "not a head-of-sequence")]
    fn releasing_an_interior_frame_is_fatal() {
        let phys = TestPhys::new(0, 1);
        let mut pool = ContiguousFramePool::new(&phys, FrameNumber::new(0), 16, None);

        let run = pool.get_frames(3).unwrap();
        pool.release_frames(run + 1);
    }

    #[test]
    #[should_panic(expected = "does not fit one bitmap frame")]
    fn oversized_pool_is_fatal() {
        let phys = TestPhys::new(0, 1);
        let _ = ContiguousFramePool::new(&phys, FrameNumber::new(0), 16385, None);
    }
}
