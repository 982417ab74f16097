//! FIFO-fair async mutex used to serialize credential refreshes.
//!
//! Unlike a general-purpose async lock, [`FifoMutex`] hands ownership directly from the releasing
//! holder to the oldest waiter, so the lock is never observably free while anyone is queued and
//! waiters are resumed strictly in arrival order.

// crates.io
use tokio::sync::oneshot;
// self
use crate::_prelude::*;

#[derive(Default)]
struct LockState {
	locked: bool,
	waiters: VecDeque<oneshot::Sender<()>>,
}

/// Cooperative exclusive lock that grants waiters in arrival order.
///
/// Acquisition never fails; it only suspends while another holder exists. Re-entrant acquisition
/// deadlocks and is not supported.
#[derive(Default)]
pub struct FifoMutex {
	state: Mutex<LockState>,
}
impl FifoMutex {
	/// Creates an unlocked mutex.
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits for exclusive access and returns a guard that releases it on drop.
	///
	/// Completes without suspending when the lock is free.
	pub async fn acquire(&self) -> FifoMutexGuard<'_> {
		self.enter().await;

		FifoMutexGuard { mutex: self }
	}

	/// Same as [`acquire`](Self::acquire) but returns a guard that owns a handle to the mutex, so
	/// it can move into a spawned task.
	pub async fn acquire_arc(self: &Arc<Self>) -> OwnedFifoMutexGuard {
		self.enter().await;

		OwnedFifoMutexGuard { mutex: self.clone() }
	}

	/// Returns `true` while a holder exists.
	pub fn is_locked(&self) -> bool {
		self.state.lock().locked
	}

	/// Number of queued waiters, including abandoned ones not yet skipped by a release.
	pub fn waiters(&self) -> usize {
		self.state.lock().waiters.len()
	}

	async fn enter(&self) {
		let receiver = {
			let mut state = self.state.lock();

			if !state.locked {
				state.locked = true;

				return;
			}

			let (sender, receiver) = oneshot::channel();

			state.waiters.push_back(sender);

			receiver
		};

		Turn { mutex: self, receiver: Some(receiver) }.wait().await;
	}

	fn release(&self) {
		let mut state = self.state.lock();

		// Waiters whose acquire future was dropped have closed receivers; skip them.
		while let Some(next) = state.waiters.pop_front() {
			if next.send(()).is_ok() {
				return;
			}
		}

		state.locked = false;
	}
}
impl Debug for FifoMutex {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("FifoMutex")
			.field("locked", &state.locked)
			.field("waiters", &state.waiters.len())
			.finish()
	}
}

/// Queue position of a suspended acquirer.
struct Turn<'a> {
	mutex: &'a FifoMutex,
	receiver: Option<oneshot::Receiver<()>>,
}
impl Turn<'_> {
	async fn wait(mut self) {
		if let Some(receiver) = self.receiver.as_mut() {
			// The sender lives in the queue until `release` consumes it, and the mutex outlives
			// this borrow, so the only completion is a grant.
			let _ = receiver.await;
		}

		self.receiver = None;
	}
}
impl Drop for Turn<'_> {
	fn drop(&mut self) {
		let Some(mut receiver) = self.receiver.take() else {
			return;
		};

		receiver.close();

		// Ownership was handed over before the close; pass it on.
		if receiver.try_recv().is_ok() {
			self.mutex.release();
		}
	}
}

/// Release capability returned by [`FifoMutex::acquire`].
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct FifoMutexGuard<'a> {
	mutex: &'a FifoMutex,
}
impl FifoMutexGuard<'_> {
	/// Releases the lock, handing it to the next waiter if there is one.
	pub fn release(self) {
		drop(self);
	}
}
impl Debug for FifoMutexGuard<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FifoMutexGuard(..)")
	}
}
impl Drop for FifoMutexGuard<'_> {
	fn drop(&mut self) {
		self.mutex.release();
	}
}

/// Owned release capability returned by [`FifoMutex::acquire_arc`].
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct OwnedFifoMutexGuard {
	mutex: Arc<FifoMutex>,
}
impl OwnedFifoMutexGuard {
	/// Releases the lock, handing it to the next waiter if there is one.
	pub fn release(self) {
		drop(self);
	}
}
impl Debug for OwnedFifoMutexGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OwnedFifoMutexGuard(..)")
	}
}
impl Drop for OwnedFifoMutexGuard {
	fn drop(&mut self) {
		self.mutex.release();
	}
}
