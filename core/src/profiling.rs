//! puffin scopes around policy resolution, planning and SQL rendering.
//!
//! The macros expand to nothing unless the expanding crate enables its
//! `profiling` feature.

/// Opens a puffin scope for the rest of the enclosing block.
#[macro_export]
macro_rules! gql_profile_scope {
    ($category:literal, $operation:literal) => {
        #[cfg(feature = "profiling")]
        puffin::profile_scope!($category, $operation);
    };
}

/// Marks the enclosing function.
#[macro_export]
macro_rules! gql_profile_function {
    () => {
        #[cfg(feature = "profiling")]
        puffin::profile_function!();
    };
}
