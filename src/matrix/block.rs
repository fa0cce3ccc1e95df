//! Tracked, move-only storage for matrix arrays
//!
//! Every array owned by a [`Matrix`](crate::Matrix), and every workspace the
//! engine allocates, is charged against an [`Allocator`] handed in through
//! the configuration. The charge is held by a [`Lease`] that is released when
//! the owning [`Block`] or [`ValueArray`] is dropped, so moving an array into
//! a matrix moves the responsibility for releasing it along with it.
//!
//! [`TrackingAllocator`] counts live bytes and can refuse requests, which
//! makes it usable both as a memory budget and as a test harness for
//! failure paths.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use aligned_vec::AVec;

use crate::constants::VALUE_ALIGN;
use crate::error::{EwiseError, EwiseResult};

/// Admission control for allocations
///
/// The allocator does not hand out memory itself; it decides whether a
/// request of a given size may proceed and keeps whatever accounting it
/// needs. Real allocation failures are still reported as
/// [`EwiseError::OutOfMemory`].
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Admit a request for `bytes` bytes
    fn acquire(&self, bytes: usize) -> EwiseResult<()>;

    /// Return `bytes` bytes previously admitted
    fn release(&self, bytes: usize);
}

/// Allocator that admits every request
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn acquire(&self, _bytes: usize) -> EwiseResult<()> {
        Ok(())
    }

    fn release(&self, _bytes: usize) {}
}

/// Shared handle to the process-wide [`SystemAllocator`]
pub fn system_allocator() -> Arc<dyn Allocator> {
    static SYSTEM: OnceLock<Arc<dyn Allocator>> = OnceLock::new();
    SYSTEM.get_or_init(|| Arc::new(SystemAllocator)).clone()
}

/// Allocator that tracks live bytes and can refuse requests
///
/// Requests are numbered from zero in the order they arrive. A tracker built
/// with [`TrackingAllocator::failing_at`] refuses exactly that request; one
/// built with [`TrackingAllocator::with_budget`] refuses any request that
/// would push the live total above the budget.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    live: AtomicUsize,
    peak: AtomicUsize,
    requests: AtomicUsize,
    fail_at: Option<usize>,
    budget: Option<usize>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the `n`-th request (zero-based)
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::default()
        }
    }

    /// Refuse requests that would exceed `bytes` live bytes
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    /// Bytes currently admitted and not yet released
    pub fn live_bytes(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest live total observed
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of requests seen so far, refused ones included
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Allocator for TrackingAllocator {
    fn acquire(&self, bytes: usize) -> EwiseResult<()> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(n) {
            return Err(EwiseError::OutOfMemory { bytes });
        }
        let prev = self.live.fetch_add(bytes, Ordering::SeqCst);
        if let Some(budget) = self.budget {
            if prev + bytes > budget {
                self.live.fetch_sub(bytes, Ordering::SeqCst);
                return Err(EwiseError::OutOfMemory { bytes });
            }
        }
        self.peak.fetch_max(prev + bytes, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.live.fetch_sub(bytes, Ordering::SeqCst);
    }
}

/// An admitted allocation, released on drop
pub struct Lease {
    bytes: usize,
    allocator: Arc<dyn Allocator>,
}

impl Lease {
    pub fn acquire(allocator: &Arc<dyn Allocator>, bytes: usize) -> EwiseResult<Self> {
        allocator.acquire(bytes)?;
        Ok(Self {
            bytes,
            allocator: Arc::clone(allocator),
        })
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.allocator.release(self.bytes);
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("bytes", &self.bytes).finish()
    }
}

fn try_vec<T>(capacity: usize) -> EwiseResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| EwiseError::OutOfMemory {
            bytes: capacity.saturating_mul(std::mem::size_of::<T>()),
        })?;
    Ok(v)
}

/// A tracked array of plain values (pointers, indices, bitmap bytes)
///
/// A block never grows past the capacity it was charged for.
pub struct Block<T> {
    data: Vec<T>,
    lease: Lease,
}

impl<T: Copy> Block<T> {
    /// Allocate `len` copies of `value`
    pub fn filled(allocator: &Arc<dyn Allocator>, len: usize, value: T) -> EwiseResult<Self> {
        let mut block = Self::with_capacity(allocator, len)?;
        block.data.resize(len, value);
        Ok(block)
    }

    /// Allocate an empty block that can hold `capacity` values
    pub fn with_capacity(allocator: &Arc<dyn Allocator>, capacity: usize) -> EwiseResult<Self> {
        let bytes = capacity.saturating_mul(std::mem::size_of::<T>());
        let lease = Lease::acquire(allocator, bytes)?;
        let data = try_vec(capacity)?;
        Ok(Self { data, lease })
    }

    /// Copy a slice into a new block
    pub fn from_slice(allocator: &Arc<dyn Allocator>, values: &[T]) -> EwiseResult<Self> {
        let mut block = Self::with_capacity(allocator, values.len())?;
        block.data.extend_from_slice(values);
        Ok(block)
    }

    /// Take ownership of an existing vector, charging its capacity
    pub fn from_vec(allocator: &Arc<dyn Allocator>, data: Vec<T>) -> EwiseResult<Self> {
        let bytes = data.capacity().saturating_mul(std::mem::size_of::<T>());
        let lease = Lease::acquire(allocator, bytes)?;
        Ok(Self { data, lease })
    }

    /// Append a value; the block must have spare capacity
    pub fn push(&mut self, value: T) {
        debug_assert!(self.data.len() < self.data.capacity(), "block capacity exceeded");
        self.data.push(value);
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Copy this block, charging the same allocator
    pub fn try_clone(&self) -> EwiseResult<Self> {
        Self::from_slice(self.lease.allocator(), &self.data)
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        self.lease.allocator()
    }

    /// Bytes charged for this block
    pub fn charged_bytes(&self) -> usize {
        self.lease.bytes()
    }
}

impl<T> Deref for Block<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for Block<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: fmt::Debug> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

/// Tracked, cache-line aligned value bytes
///
/// The alignment makes typed views of built-in values possible without
/// copying.
pub struct ValueArray {
    data: AVec<u8>,
    lease: Lease,
}

impl ValueArray {
    /// Allocate `bytes` zero bytes
    pub fn zeroed(allocator: &Arc<dyn Allocator>, bytes: usize) -> EwiseResult<Self> {
        let lease = Lease::acquire(allocator, bytes)?;
        let data = AVec::from_iter(VALUE_ALIGN, std::iter::repeat(0u8).take(bytes));
        Ok(Self { data, lease })
    }

    /// Copy raw bytes into a new array
    pub fn from_bytes(allocator: &Arc<dyn Allocator>, bytes: &[u8]) -> EwiseResult<Self> {
        let lease = Lease::acquire(allocator, bytes.len())?;
        let data = AVec::from_iter(VALUE_ALIGN, bytes.iter().copied());
        Ok(Self { data, lease })
    }

    /// View the bytes as native scalars
    pub fn as_typed<T: bytemuck::Pod>(&self) -> &[T] {
        if self.data.is_empty() {
            return &[];
        }
        bytemuck::cast_slice(&self.data)
    }

    pub fn try_clone(&self) -> EwiseResult<Self> {
        Self::from_bytes(self.lease.allocator(), &self.data)
    }
}

impl Deref for ValueArray {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for ValueArray {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for ValueArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueArray")
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_released_on_drop() {
        let tracker = Arc::new(TrackingAllocator::new());
        let alloc: Arc<dyn Allocator> = tracker.clone();
        {
            let block = Block::filled(&alloc, 10, 0usize).unwrap();
            assert_eq!(block.len(), 10);
            assert_eq!(tracker.live_bytes(), 10 * std::mem::size_of::<usize>());
            let values = ValueArray::zeroed(&alloc, 24).unwrap();
            assert_eq!(values.len(), 24);
        }
        assert_eq!(tracker.live_bytes(), 0);
        assert_eq!(tracker.peak_bytes(), 10 * std::mem::size_of::<usize>() + 24);
    }

    #[test]
    fn test_failing_request() {
        let tracker = Arc::new(TrackingAllocator::failing_at(1));
        let alloc: Arc<dyn Allocator> = tracker.clone();
        let first = Block::filled(&alloc, 4, 1u8).unwrap();
        let second = Block::filled(&alloc, 4, 1u8);
        assert!(matches!(second, Err(EwiseError::OutOfMemory { bytes: 4 })));
        drop(first);
        assert_eq!(tracker.live_bytes(), 0);
        assert_eq!(tracker.requests(), 2);
    }

    #[test]
    fn test_budget() {
        let tracker = Arc::new(TrackingAllocator::with_budget(16));
        let alloc: Arc<dyn Allocator> = tracker.clone();
        let a = Block::filled(&alloc, 12, 0u8).unwrap();
        assert!(Block::filled(&alloc, 8, 0u8).is_err());
        assert_eq!(tracker.live_bytes(), 12);
        drop(a);
        assert!(Block::filled(&alloc, 16, 0u8).is_ok());
    }

    #[test]
    fn test_typed_view_is_aligned() {
        let alloc = system_allocator();
        let values: Vec<f64> = vec![1.5, -2.0, 3.25];
        let array = ValueArray::from_bytes(&alloc, bytemuck::cast_slice(&values)).unwrap();
        assert_eq!(array.as_typed::<f64>(), &values[..]);
        let empty = ValueArray::zeroed(&alloc, 0).unwrap();
        assert!(empty.as_typed::<f64>().is_empty());
    }

    #[test]
    fn test_push_within_capacity() {
        let alloc = system_allocator();
        let mut block = Block::with_capacity(&alloc, 3).unwrap();
        block.push(7usize);
        block.push(9);
        assert_eq!(&block[..], &[7, 9]);
        block.truncate(1);
        assert_eq!(&block[..], &[7]);
    }
}
