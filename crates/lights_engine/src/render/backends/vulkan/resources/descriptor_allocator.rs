//! Growable descriptor set allocation
//!
//! Sets come from a list of fixed-capacity pools. When the current pool runs
//! out, the allocator moves on to the next pool (creating one if needed) and
//! retries once, so callers never see pool exhaustion. Pools are only ever
//! appended; [`DescriptorAllocator::reset_all`] recycles them in place.

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Uniform buffer descriptors per pool
pub const UNIFORM_BUFFERS_PER_POOL: u32 = 1000;

/// Combined image sampler descriptors per pool
pub const SAMPLERS_PER_POOL: u32 = 1000;

/// Pool operations the allocator is built on
pub trait DescriptorPoolBackend {
    /// Create a pool able to hold `max_sets` sets
    fn create_pool(&self, max_sets: u32) -> Result<vk::DescriptorPool, vk::Result>;

    /// Allocate one set with `layout` from `pool`
    fn allocate_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet, vk::Result>;

    /// Return every set allocated from `pool`
    fn reset_pool(&self, pool: vk::DescriptorPool) -> Result<(), vk::Result>;

    /// Destroy `pool`
    fn destroy_pool(&self, pool: vk::DescriptorPool);
}

impl DescriptorPoolBackend for Device {
    fn create_pool(&self, max_sets: u32) -> Result<vk::DescriptorPool, vk::Result> {
        let pool_sizes = [
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(UNIFORM_BUFFERS_PER_POOL)
                .build(),
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(SAMPLERS_PER_POOL)
                .build(),
        ];

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        unsafe { self.create_descriptor_pool(&pool_info, None) }
    }

    fn allocate_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet, vk::Result> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.allocate_descriptor_sets(&alloc_info) }?;
        sets.first().copied().ok_or(vk::Result::ERROR_UNKNOWN)
    }

    fn reset_pool(&self, pool: vk::DescriptorPool) -> Result<(), vk::Result> {
        unsafe { self.reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty()) }
    }

    fn destroy_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.destroy_descriptor_pool(pool, None) }
    }
}

fn is_pool_exhausted(result: vk::Result) -> bool {
    matches!(
        result,
        vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL
    )
}

/// Descriptor set allocator over a growing list of pools
pub struct DescriptorAllocator<B: DescriptorPoolBackend = Device> {
    backend: B,
    pools: Vec<vk::DescriptorPool>,
    current: usize,
    sets_per_pool: u32,
}

impl<B: DescriptorPoolBackend> DescriptorAllocator<B> {
    /// Create the allocator and its first pool
    ///
    /// `frame_count` is the swapchain image count at creation; every image
    /// needs its own global set, so it is checked against pool capacity.
    pub fn init(backend: B, frame_count: usize, sets_per_pool: u32) -> VulkanResult<Self> {
        if sets_per_pool == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "descriptor pools need room for at least one set".to_string(),
            });
        }
        if frame_count as u32 > sets_per_pool {
            log::warn!(
                "{} swapchain images exceed a single pool of {} sets, allocations will span pools",
                frame_count,
                sets_per_pool
            );
        }

        let first = backend.create_pool(sets_per_pool).map_err(VulkanError::from)?;
        log::debug!(
            "Descriptor allocator ready: {} sets per pool, {} frames",
            sets_per_pool,
            frame_count
        );

        Ok(Self {
            backend,
            pools: vec![first],
            current: 0,
            sets_per_pool,
        })
    }

    /// Allocate one descriptor set with `layout`
    ///
    /// Only device or host out-of-memory errors reach the caller.
    pub fn allocate(&mut self, layout: vk::DescriptorSetLayout) -> VulkanResult<vk::DescriptorSet> {
        match self.backend.allocate_set(self.pools[self.current], layout) {
            Ok(set) => return Ok(set),
            Err(result) if is_pool_exhausted(result) => {}
            Err(result) => return Err(VulkanError::from(result)),
        }

        self.advance()?;
        self.backend
            .allocate_set(self.pools[self.current], layout)
            .map_err(VulkanError::from)
    }

    /// Recycle every pool and start again from the first
    ///
    /// All sets previously handed out become invalid.
    pub fn reset_all(&mut self) -> VulkanResult<()> {
        for &pool in &self.pools {
            self.backend.reset_pool(pool).map_err(VulkanError::from)?;
        }
        self.current = 0;
        log::debug!("Reset {} descriptor pools", self.pools.len());
        Ok(())
    }

    /// Number of pools created so far
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Index of the pool allocations currently come from
    pub fn current_pool(&self) -> usize {
        self.current
    }

    /// Sets per pool
    pub fn sets_per_pool(&self) -> u32 {
        self.sets_per_pool
    }

    fn advance(&mut self) -> VulkanResult<()> {
        if self.current + 1 < self.pools.len() {
            self.current += 1;
            return Ok(());
        }

        let pool = self.backend.create_pool(self.sets_per_pool).map_err(VulkanError::from)?;
        self.pools.push(pool);
        self.current = self.pools.len() - 1;
        log::debug!("Descriptor pool exhausted, grew to {} pools", self.pools.len());
        Ok(())
    }
}

impl<B: DescriptorPoolBackend> Drop for DescriptorAllocator<B> {
    fn drop(&mut self) {
        for pool in self.pools.drain(..) {
            self.backend.destroy_pool(pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct PoolState {
        // Sets allocated per pool, indexed by raw handle - 1
        used: Vec<u32>,
        destroyed: Vec<u64>,
        next_set: u64,
        fail_with: Option<vk::Result>,
    }

    /// Pools with a fixed set capacity that report exhaustion like a driver
    #[derive(Clone)]
    struct MockPools {
        capacity: u32,
        state: Rc<RefCell<PoolState>>,
    }

    impl MockPools {
        fn new(capacity: u32) -> Self {
            Self {
                capacity,
                state: Rc::new(RefCell::new(PoolState::default())),
            }
        }
    }

    impl DescriptorPoolBackend for MockPools {
        fn create_pool(&self, max_sets: u32) -> Result<vk::DescriptorPool, vk::Result> {
            assert_eq!(max_sets, self.capacity);
            let mut state = self.state.borrow_mut();
            state.used.push(0);
            Ok(vk::DescriptorPool::from_raw(state.used.len() as u64))
        }

        fn allocate_set(
            &self,
            pool: vk::DescriptorPool,
            _layout: vk::DescriptorSetLayout,
        ) -> Result<vk::DescriptorSet, vk::Result> {
            let mut state = self.state.borrow_mut();
            if let Some(result) = state.fail_with {
                return Err(result);
            }
            let index = pool.as_raw() as usize - 1;
            if state.used[index] == self.capacity {
                return Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY);
            }
            state.used[index] += 1;
            state.next_set += 1;
            Ok(vk::DescriptorSet::from_raw(state.next_set))
        }

        fn reset_pool(&self, pool: vk::DescriptorPool) -> Result<(), vk::Result> {
            self.state.borrow_mut().used[pool.as_raw() as usize - 1] = 0;
            Ok(())
        }

        fn destroy_pool(&self, pool: vk::DescriptorPool) {
            self.state.borrow_mut().destroyed.push(pool.as_raw());
        }
    }

    fn layout() -> vk::DescriptorSetLayout {
        vk::DescriptorSetLayout::from_raw(42)
    }

    /// The 1001st allocation with capacity 1000 lands in a second pool
    #[test]
    fn test_growth_on_exhaustion() {
        let pools = MockPools::new(1000);
        let mut allocator = DescriptorAllocator::init(pools.clone(), 3, 1000).unwrap();

        for _ in 0..1000 {
            let set = allocator.allocate(layout()).unwrap();
            assert_ne!(set, vk::DescriptorSet::null());
        }
        assert_eq!(allocator.pool_count(), 1);

        let set = allocator.allocate(layout()).unwrap();
        assert_ne!(set, vk::DescriptorSet::null());
        assert_eq!(allocator.pool_count(), 2);
        assert_eq!(allocator.current_pool(), 1);
        assert_eq!(pools.state.borrow().used, vec![1000, 1]);
    }

    /// After a reset existing pools are reused before any new one is created
    #[test]
    fn test_reset_reuses_pools() {
        let pools = MockPools::new(4);
        let mut allocator = DescriptorAllocator::init(pools.clone(), 2, 4).unwrap();
        for _ in 0..10 {
            allocator.allocate(layout()).unwrap();
        }
        assert_eq!(allocator.pool_count(), 3);

        allocator.reset_all().unwrap();
        assert_eq!(allocator.current_pool(), 0);
        for _ in 0..10 {
            allocator.allocate(layout()).unwrap();
        }
        assert_eq!(allocator.pool_count(), 3);
        assert_eq!(pools.state.borrow().used, vec![4, 4, 2]);
    }

    #[test]
    fn test_out_of_memory_propagates() {
        let pools = MockPools::new(4);
        let mut allocator = DescriptorAllocator::init(pools.clone(), 2, 4).unwrap();
        pools.state.borrow_mut().fail_with = Some(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);

        let result = allocator.allocate(layout());
        assert!(matches!(
            result,
            Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))
        ));
        assert_eq!(allocator.pool_count(), 1);
    }

    #[test]
    fn test_drop_destroys_every_pool() {
        let pools = MockPools::new(1);
        {
            let mut allocator = DescriptorAllocator::init(pools.clone(), 2, 1).unwrap();
            allocator.allocate(layout()).unwrap();
            allocator.allocate(layout()).unwrap();
        }
        assert_eq!(pools.state.borrow().destroyed, vec![1, 2]);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(DescriptorAllocator::init(MockPools::new(0), 2, 0).is_err());
    }
}
