use crate::PhysicalAddress;

/// Converts physical addresses to usable pointers in the current execution
/// environment.
///
/// The frame pool needs this to reach its bitmap frame, and the paging code
/// needs it to write freshly allocated directory/table frames. How a
/// physical address becomes dereferenceable is the implementor's business:
///
/// - **Kernel, paging off or identity-mapped region**: [`IdentityMapper`]
///   returns the address as a pointer.
/// - **Tests**: a simulated frame arena resolves the address into host
///   memory.
///
/// # Safety
/// - `pa` must be reachable and writable through the implementor's mapping
///   for the produced `&mut T`.
/// - `T` must match the bytes at `pa`; the lifetime `'a` is purely
///   borrow-checked.
pub trait PhysMapper {
    /// Convert a physical address to a mutable reference.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// Mapper for environments where physical addresses are dereferenceable as
/// given: before paging is enabled, or inside the identity-mapped low
/// region afterwards.
pub struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { &mut *(pa.as_u32() as usize as *mut T) }
    }
}
