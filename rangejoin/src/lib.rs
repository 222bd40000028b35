#[cfg(feature = "core")]
#[doc(inline)]
pub use rangejoin_core as core;

#[cfg(feature = "overlaprs")]
#[doc(inline)]
pub use rangejoin_overlaprs as overlaprs;

#[cfg(feature = "partition")]
#[doc(inline)]
pub use rangejoin_partition as partition;

#[cfg(feature = "join")]
#[doc(inline)]
pub use rangejoin_join as join;
