/// Asserts at compile time that a GPU-facing struct has no implicit padding and
/// that its size satisfies the constant buffer rule of being a multiple of 16 bytes.
///
/// ```rust
/// use nalgebra::Matrix4;
/// use vitrail::ensure_aligned;
///
/// #[repr(C)]
/// #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
/// struct Model {
///     model: Matrix4<f32>,
/// }
///
/// ensure_aligned!(Model { model }, align <= 16 * 4 => size);
/// ```
#[macro_export]
macro_rules! ensure_aligned {
    ($ty:ident { $($field:ident),+ $(,)? }, align <= $align:expr => size) => {
        $crate::utils::align::__static_assertions::const_assert_eq!(
            ::std::mem::size_of::<$ty>() % 16,
            0
        );
        $crate::utils::align::__static_assertions::const_assert!(
            ::std::mem::size_of::<$ty>() <= $align
        );
        $(
            $crate::utils::align::__static_assertions::const_assert_eq!(
                ::std::mem::offset_of!($ty, $field) % 4,
                0
            );
        )+
    };
}

#[doc(hidden)]
pub use static_assertions as __static_assertions;
