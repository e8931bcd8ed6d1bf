//! Per-frame presentation loop and swapchain repair.
//!
//! [`FrameLoop`] drives one frame at a time through a fixed sequence:
//!
//! 1. Wait on the current slot's fence (bounds GPU work in flight to F frames)
//! 2. Acquire a presentable image
//! 3. Reset the fence, now that this slot will definitely submit
//! 4. Re-record the slot's command buffer for the acquired image
//! 5. Submit, arming the fence
//! 6. Present
//! 7. Advance to the next slot
//!
//! A stale chain (out-of-date on acquire, out-of-date or suboptimal on
//! present) or a pending resize sends the loop through [`FrameLoop::repair`]
//! instead of failing. Everything else is fatal and returned as a
//! [`FrameError`].
//!
//! The loop talks to the GPU only through [`PresentBackend`] and to the
//! windowing system only through [`WindowSystem`], so the protocol can be
//! exercised without a device.

use ash::vk;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::error::{FrameError, RecordError, SurfaceError};
use crate::config::RepairSlotPolicy;

/// Result of asking the chain for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The image is usable. `suboptimal` images are drawn as normal.
    Ready { image_index: u32, suboptimal: bool },
    /// The chain no longer matches the surface; nothing was signaled
    OutOfDate,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Out-of-date or suboptimal; the chain should be rebuilt
    Stale,
}

/// Device-side operations the frame loop sequences.
///
/// Slots are indices in `0..frames_in_flight()`. Implementations own the
/// per-slot fences, semaphores and command buffers and the current chain.
pub trait PresentBackend {
    fn frames_in_flight(&self) -> usize;

    /// Block until the slot's previous submission has completed
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), vk::Result>;

    /// Acquire the next image, signaling the slot's image-available semaphore
    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome, vk::Result>;

    /// Unsignal the slot's fence ahead of submission
    fn reset_slot(&mut self, slot: usize) -> Result<(), vk::Result>;

    /// Re-record the slot's command buffer to draw into `image_index`
    fn record(&mut self, slot: usize, image_index: u32) -> Result<(), RecordError>;

    /// Submit the slot's command buffer: wait image-available, signal
    /// render-finished, arm the fence
    fn submit(&mut self, slot: usize) -> Result<(), vk::Result>;

    /// Present `image_index` once the slot's render-finished semaphore signals
    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome, vk::Result>;

    /// Device-wide barrier: returns once no GPU work is outstanding
    fn wait_idle(&mut self) -> Result<(), vk::Result>;

    /// Replace the chain and everything derived from it for a drawable of `extent`.
    /// Only called after `wait_idle`.
    fn rebuild_surface(&mut self, extent: vk::Extent2D) -> Result<(), SurfaceError>;
}

/// What the loop needs from the window
pub trait WindowSystem {
    /// Current drawable size in pixels
    fn drawable_size(&self) -> vk::Extent2D;

    /// Block until the window system has delivered more events.
    /// Returns false once the window system is shutting down.
    fn wait_events(&mut self) -> bool;
}

/// Resize-pending flag shared between the window's event handler and the loop
#[derive(Debug, Clone, Default)]
pub struct ResizeSignal(Arc<AtomicBool>);

impl ResizeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Where the loop is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    WaitingOnFence,
    ImageAcquired,
    Recording,
    Submitted,
    Presented,
    Repairing,
}

/// How a call to `render_frame` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was drawn and presented
    Presented,
    /// The chain was rebuilt; the frame may or may not have been drawn
    Repaired,
    /// The window system shut down while a repair was waiting on it.
    /// Nothing was rebuilt; the caller should `finish` and tear down.
    Exiting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub repairs: u64,
}

pub struct FrameLoop<B: PresentBackend> {
    backend: B,
    resize: ResizeSignal,
    policy: RepairSlotPolicy,
    frames_in_flight: usize,
    slot: usize,
    phase: FramePhase,
    stats: FrameStats,
}

impl<B: PresentBackend> FrameLoop<B> {
    pub fn new(backend: B, resize: ResizeSignal, policy: RepairSlotPolicy) -> Self {
        let frames_in_flight = backend.frames_in_flight().max(1);
        log::info!(
            "Frame loop ready: {} frames in flight, {:?} slot policy on repair",
            frames_in_flight,
            policy
        );
        Self {
            backend,
            resize,
            policy,
            frames_in_flight,
            slot: 0,
            phase: FramePhase::Idle,
            stats: FrameStats::default(),
        }
    }

    /// Run one pass of the frame protocol.
    ///
    /// Returns `Repaired` when the frame was cut short (or followed) by a
    /// chain rebuild, and `Exiting` when the window system shut down while
    /// that rebuild was waiting on it. Errors are fatal; the loop makes no
    /// attempt to retry.
    pub fn render_frame<W: WindowSystem>(&mut self, window: &mut W) -> Result<FrameStatus, FrameError> {
        let slot = self.slot;

        // ─── Throttle ───
        self.phase = FramePhase::WaitingOnFence;
        self.backend
            .wait_for_slot(slot)
            .map_err(FrameError::FenceWait)?;

        // ─── Acquire ───
        // Checked before acquiring so an abandoned frame never leaves a semaphore signaled
        if self.resize.is_pending() {
            log::debug!("Resize pending, rebuilding before acquire");
            return self.abort_frame(window);
        }

        let image_index = match self
            .backend
            .acquire_image(slot)
            .map_err(FrameError::Acquire)?
        {
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => {
                if suboptimal {
                    log::trace!("Acquired suboptimal image {}", image_index);
                }
                image_index
            }
            AcquireOutcome::OutOfDate => {
                log::debug!("Swapchain out of date on acquire");
                return self.abort_frame(window);
            }
        };
        self.phase = FramePhase::ImageAcquired;

        // Only now is a submit guaranteed to re-arm the fence
        self.backend
            .reset_slot(slot)
            .map_err(FrameError::FenceReset)?;

        // ─── Record + submit ───
        self.phase = FramePhase::Recording;
        self.backend.record(slot, image_index)?;
        self.backend.submit(slot).map_err(FrameError::Submit)?;
        self.phase = FramePhase::Submitted;

        // ─── Present ───
        let outcome = self
            .backend
            .present(slot, image_index)
            .map_err(FrameError::Present)?;
        self.phase = FramePhase::Presented;
        self.advance_slot();

        match outcome {
            PresentOutcome::Presented => {
                self.stats.frames_presented += 1;
                self.phase = FramePhase::Idle;
                Ok(FrameStatus::Presented)
            }
            PresentOutcome::Stale => {
                log::debug!("Swapchain stale on present");
                self.repair(window)
            }
        }
    }

    /// Abandon the current frame before anything was submitted, then repair
    fn abort_frame<W: WindowSystem>(&mut self, window: &mut W) -> Result<FrameStatus, FrameError> {
        if self.policy == RepairSlotPolicy::Advance {
            self.advance_slot();
        }
        self.repair(window)
    }

    /// Rebuild the chain for the current drawable size.
    ///
    /// Blocks while the window has a zero-sized drawable (minimized), then
    /// drains the device before the backend replaces anything. Returns
    /// `Exiting` without touching the device if the window system shuts
    /// down during the wait.
    pub fn repair<W: WindowSystem>(&mut self, window: &mut W) -> Result<FrameStatus, FrameError> {
        self.phase = FramePhase::Repairing;

        // Clear before each query so a resize that lands afterwards is not lost
        let extent = loop {
            self.resize.take();
            let size = window.drawable_size();
            if size.width > 0 && size.height > 0 {
                break size;
            }
            log::debug!("Drawable is {}x{}, waiting for events", size.width, size.height);
            if !window.wait_events() {
                log::info!("Window system closed during repair");
                self.phase = FramePhase::Idle;
                return Ok(FrameStatus::Exiting);
            }
        };

        self.backend.wait_idle().map_err(FrameError::DeviceIdle)?;
        self.backend.rebuild_surface(extent)?;

        self.stats.repairs += 1;
        self.phase = FramePhase::Idle;
        log::info!(
            "Swapchain repaired at {}x{} (repair #{})",
            extent.width,
            extent.height,
            self.stats.repairs
        );
        Ok(FrameStatus::Repaired)
    }

    /// Drain the device so the backend can be torn down
    pub fn finish(&mut self) -> Result<(), FrameError> {
        self.backend.wait_idle().map_err(FrameError::DeviceIdle)?;
        self.phase = FramePhase::Idle;
        log::info!(
            "Frame loop finished after {} frames, {} repairs",
            self.stats.frames_presented,
            self.stats.repairs
        );
        Ok(())
    }

    fn advance_slot(&mut self) {
        self.slot = (self.slot + 1) % self.frames_in_flight;
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn resize_signal(&self) -> ResizeSignal {
        self.resize.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        WaitFence(usize),
        Acquire(usize),
        Reset(usize),
        Record(usize, u32),
        Submit(usize),
        Present(usize, u32),
        WaitIdle,
        Rebuild(u32, u32),
    }

    /// Scripted backend: rotates through `chain_len` images unless told otherwise
    struct MockBackend {
        frames: usize,
        chain_len: u32,
        next_image: u32,
        extent: vk::Extent2D,
        acquire_script: VecDeque<Result<AcquireOutcome, vk::Result>>,
        present_script: VecDeque<Result<PresentOutcome, vk::Result>>,
        submit_error: Option<vk::Result>,
        calls: Vec<Call>,
    }

    impl MockBackend {
        fn new(chain_len: u32, frames: usize) -> Self {
            Self {
                frames,
                chain_len,
                next_image: 0,
                extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                submit_error: None,
                calls: Vec::new(),
            }
        }

        fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| matches(c)).count()
        }
    }

    impl PresentBackend for MockBackend {
        fn frames_in_flight(&self) -> usize {
            self.frames
        }

        fn wait_for_slot(&mut self, slot: usize) -> Result<(), vk::Result> {
            self.calls.push(Call::WaitFence(slot));
            Ok(())
        }

        fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome, vk::Result> {
            self.calls.push(Call::Acquire(slot));
            if let Some(scripted) = self.acquire_script.pop_front() {
                return scripted;
            }
            let image_index = self.next_image;
            self.next_image = (self.next_image + 1) % self.chain_len;
            Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal: false,
            })
        }

        fn reset_slot(&mut self, slot: usize) -> Result<(), vk::Result> {
            self.calls.push(Call::Reset(slot));
            Ok(())
        }

        fn record(&mut self, slot: usize, image_index: u32) -> Result<(), RecordError> {
            self.calls.push(Call::Record(slot, image_index));
            Ok(())
        }

        fn submit(&mut self, slot: usize) -> Result<(), vk::Result> {
            self.calls.push(Call::Submit(slot));
            self.submit_error.map_or(Ok(()), Err)
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome, vk::Result> {
            self.calls.push(Call::Present(slot, image_index));
            self.present_script
                .pop_front()
                .unwrap_or(Ok(PresentOutcome::Presented))
        }

        fn wait_idle(&mut self) -> Result<(), vk::Result> {
            self.calls.push(Call::WaitIdle);
            Ok(())
        }

        fn rebuild_surface(&mut self, extent: vk::Extent2D) -> Result<(), SurfaceError> {
            self.calls.push(Call::Rebuild(extent.width, extent.height));
            self.extent = extent;
            self.next_image = 0;
            Ok(())
        }
    }

    /// Window that replays a list of sizes, repeating the last one
    struct MockWindow {
        sizes: VecDeque<(u32, u32)>,
        waits: usize,
        // wait_events reports shutdown from this call onwards
        closes_after: Option<usize>,
    }

    impl MockWindow {
        fn sized(width: u32, height: u32) -> Self {
            Self::scripted(&[(width, height)])
        }

        fn scripted(sizes: &[(u32, u32)]) -> Self {
            Self {
                sizes: sizes.iter().copied().collect(),
                waits: 0,
                closes_after: None,
            }
        }

        fn closing_after(mut self, waits: usize) -> Self {
            self.closes_after = Some(waits);
            self
        }
    }

    impl WindowSystem for MockWindow {
        fn drawable_size(&self) -> vk::Extent2D {
            let (width, height) = self.sizes.front().copied().unwrap_or((0, 0));
            vk::Extent2D { width, height }
        }

        fn wait_events(&mut self) -> bool {
            self.waits += 1;
            if self.closes_after.is_some_and(|n| self.waits >= n) {
                return false;
            }
            if self.sizes.len() > 1 {
                self.sizes.pop_front();
            }
            true
        }
    }

    fn frame_loop(chain_len: u32, frames: usize) -> FrameLoop<MockBackend> {
        FrameLoop::new(
            MockBackend::new(chain_len, frames),
            ResizeSignal::new(),
            RepairSlotPolicy::Advance,
        )
    }

    #[test]
    fn successful_frame_runs_steps_in_order() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);

        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Presented);
        assert_eq!(
            frames.backend().calls,
            vec![
                Call::WaitFence(0),
                Call::Acquire(0),
                Call::Reset(0),
                Call::Record(0, 0),
                Call::Submit(0),
                Call::Present(0, 0),
            ]
        );
        assert_eq!(frames.phase(), FramePhase::Idle);
        assert_eq!(frames.stats().frames_presented, 1);
    }

    #[test]
    fn slot_wraps_independently_of_chain_length() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);

        frames.render_frame(&mut window).unwrap();
        assert_eq!(frames.slot(), 1);
        frames.render_frame(&mut window).unwrap();
        assert_eq!(frames.slot(), 0);

        // Third frame reuses slot 0 but draws into the third image
        frames.render_frame(&mut window).unwrap();
        assert!(frames.backend().calls.ends_with(&[
            Call::Record(0, 2),
            Call::Submit(0),
            Call::Present(0, 2)
        ]));
    }

    #[test]
    fn out_of_date_acquire_repairs_once_without_drawing() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);

        frames.render_frame(&mut window).unwrap();
        frames.render_frame(&mut window).unwrap();
        assert_eq!(frames.slot(), 0);

        frames
            .backend_mut()
            .acquire_script
            .push_back(Ok(AcquireOutcome::OutOfDate));
        let before = frames.backend().calls.len();
        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Repaired);

        let frame3 = frames.backend().calls[before..].to_vec();
        assert_eq!(
            frame3,
            vec![
                Call::WaitFence(0),
                Call::Acquire(0),
                Call::WaitIdle,
                Call::Rebuild(800, 600),
            ]
        );
        assert_eq!(frames.stats().repairs, 1);

        // Frame 4 proceeds normally on the rebuilt chain
        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Presented);
        assert_eq!(
            frames.backend().count(|c| matches!(c, Call::Rebuild(..))),
            1
        );
    }

    #[test]
    fn fence_is_waited_before_every_record_of_its_slot() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames.backend_mut().acquire_script.extend([
            Ok(AcquireOutcome::Ready {
                image_index: 0,
                suboptimal: false,
            }),
            Ok(AcquireOutcome::OutOfDate),
        ]);
        frames
            .backend_mut()
            .present_script
            .push_back(Ok(PresentOutcome::Stale));

        for _ in 0..8 {
            frames.render_frame(&mut window).unwrap();
        }

        // Since the last submit on a slot, that slot's fence must have been waited
        let mut waited = vec![true; 2];
        for call in &frames.backend().calls {
            match *call {
                Call::WaitFence(slot) => waited[slot] = true,
                Call::Record(slot, _) => assert!(waited[slot], "slot {} recorded while in flight", slot),
                Call::Submit(slot) => waited[slot] = false,
                _ => {}
            }
        }
    }

    #[test]
    fn repair_path_never_resets_the_fence() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames
            .backend_mut()
            .acquire_script
            .push_back(Ok(AcquireOutcome::OutOfDate));

        frames.render_frame(&mut window).unwrap();
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Reset(_))), 0);

        frames.resize_signal().notify();
        frames.render_frame(&mut window).unwrap();
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Reset(_))), 0);
        assert_eq!(frames.stats().repairs, 2);
    }

    #[test]
    fn pending_resize_repairs_before_acquiring() {
        let mut frames = frame_loop(2, 2);
        let mut window = MockWindow::sized(1024, 768);
        let resize = frames.resize_signal();

        resize.notify();
        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Repaired);
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Acquire(_))), 0);
        assert_eq!(frames.backend().extent.width, 1024);
        assert!(!resize.is_pending());

        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Presented);
    }

    #[test]
    fn zero_sized_drawable_blocks_repair_until_restored() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::scripted(&[(0, 0), (0, 0), (640, 0), (640, 480)]);

        assert_eq!(frames.repair(&mut window).unwrap(), FrameStatus::Repaired);

        assert_eq!(window.waits, 3);
        assert_eq!(
            frames.backend().calls,
            vec![Call::WaitIdle, Call::Rebuild(640, 480)]
        );
    }

    #[test]
    fn close_while_minimized_exits_repair_without_rebuilding() {
        let mut frames = frame_loop(3, 2);
        // Stays minimized; the window system shuts down on the second wait
        let mut window = MockWindow::sized(0, 0).closing_after(2);
        frames
            .backend_mut()
            .acquire_script
            .push_back(Ok(AcquireOutcome::OutOfDate));

        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Exiting);
        assert_eq!(window.waits, 2);
        assert_eq!(frames.backend().count(|c| matches!(c, Call::WaitIdle)), 0);
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Rebuild(..))), 0);
        assert_eq!(frames.stats().repairs, 0);
        assert_eq!(frames.phase(), FramePhase::Idle);

        // Shutdown still drains the device
        frames.finish().unwrap();
        assert_eq!(frames.backend().calls.last(), Some(&Call::WaitIdle));
    }

    #[test]
    fn closed_window_system_ends_repair_on_first_wait() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(0, 0).closing_after(1);
        frames.resize_signal().notify();

        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Exiting);
        assert_eq!(window.waits, 1);
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Acquire(_))), 0);
        assert_eq!(frames.backend().count(|c| matches!(c, Call::WaitIdle)), 0);
    }

    #[test]
    fn repeated_repair_yields_equivalent_chain() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(1920, 1080);

        frames.repair(&mut window).unwrap();
        let first = frames.backend().extent;
        frames.repair(&mut window).unwrap();
        let second = frames.backend().extent;

        assert_eq!((first.width, first.height), (second.width, second.height));
        assert_eq!((second.width, second.height), (1920, 1080));
        assert_eq!(frames.stats().repairs, 2);
        assert_eq!(frames.phase(), FramePhase::Idle);
    }

    #[test]
    fn advance_policy_moves_past_aborted_slot() {
        let mut frames = frame_loop(3, 3);
        let mut window = MockWindow::sized(800, 600);
        frames
            .backend_mut()
            .acquire_script
            .push_back(Ok(AcquireOutcome::OutOfDate));

        frames.render_frame(&mut window).unwrap();
        assert_eq!(frames.slot(), 1);
    }

    #[test]
    fn hold_policy_retries_aborted_slot() {
        let mut frames = FrameLoop::new(
            MockBackend::new(3, 3),
            ResizeSignal::new(),
            RepairSlotPolicy::Hold,
        );
        let mut window = MockWindow::sized(800, 600);
        frames
            .backend_mut()
            .acquire_script
            .push_back(Ok(AcquireOutcome::OutOfDate));

        frames.render_frame(&mut window).unwrap();
        assert_eq!(frames.slot(), 0);

        frames.render_frame(&mut window).unwrap();
        assert!(frames.backend().calls.contains(&Call::Submit(0)));
        assert_eq!(frames.slot(), 1);
    }

    #[test]
    fn stale_present_advances_then_repairs() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames
            .backend_mut()
            .present_script
            .push_back(Ok(PresentOutcome::Stale));

        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Repaired);
        assert!(frames.backend().calls.ends_with(&[
            Call::Submit(0),
            Call::Present(0, 0),
            Call::WaitIdle,
            Call::Rebuild(800, 600)
        ]));
        assert_eq!(frames.slot(), 1);
        assert_eq!(frames.stats().frames_presented, 0);
    }

    #[test]
    fn suboptimal_acquire_still_draws() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames.backend_mut().acquire_script.push_back(Ok(AcquireOutcome::Ready {
            image_index: 2,
            suboptimal: true,
        }));

        assert_eq!(frames.render_frame(&mut window).unwrap(), FrameStatus::Presented);
        assert!(frames.backend().calls.contains(&Call::Present(0, 2)));
        assert_eq!(frames.stats().repairs, 0);
    }

    #[test]
    fn acquire_failure_is_fatal() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames
            .backend_mut()
            .acquire_script
            .push_back(Err(vk::Result::ERROR_SURFACE_LOST_KHR));

        let err = frames.render_frame(&mut window).unwrap_err();
        assert!(matches!(err, FrameError::Acquire(vk::Result::ERROR_SURFACE_LOST_KHR)));
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Rebuild(..))), 0);
        assert_eq!(frames.phase(), FramePhase::WaitingOnFence);
    }

    #[test]
    fn submit_failure_is_fatal_and_not_retried() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames.backend_mut().submit_error = Some(vk::Result::ERROR_DEVICE_LOST);

        let err = frames.render_frame(&mut window).unwrap_err();
        assert!(matches!(err, FrameError::Submit(vk::Result::ERROR_DEVICE_LOST)));
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Submit(_))), 1);
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Present(..))), 0);
        assert_eq!(frames.phase(), FramePhase::Recording);
        assert_eq!(frames.slot(), 0);
    }

    #[test]
    fn present_failure_is_fatal() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames
            .backend_mut()
            .present_script
            .push_back(Err(vk::Result::ERROR_DEVICE_LOST));

        let err = frames.render_frame(&mut window).unwrap_err();
        assert!(matches!(err, FrameError::Present(_)));
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Rebuild(..))), 0);
    }

    #[test]
    fn finish_drains_the_device() {
        let mut frames = frame_loop(3, 2);
        let mut window = MockWindow::sized(800, 600);
        frames.render_frame(&mut window).unwrap();
        frames.finish().unwrap();
        assert_eq!(frames.backend().calls.last(), Some(&Call::WaitIdle));
    }

    #[test]
    fn resize_signal_clones_share_one_flag() {
        let signal = ResizeSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_pending());

        handle.notify();
        assert!(signal.is_pending());
        assert!(signal.take());
        assert!(!handle.is_pending());
        assert!(!signal.take());
    }
}
