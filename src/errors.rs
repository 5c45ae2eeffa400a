//! Error Types
//!
//! This module defines the error types used throughout the rasterizer.
//!
//! # Overview
//!
//! The main error type [`RasterError`] covers the failure modes that can
//! actually be observed by a caller:
//! - Render target allocation and sizing failures
//! - Mesh data that references vertices which do not exist
//! - Worker pool spawn failures and panics inside a shading batch
//! - Settings parsing and I/O errors
//!
//! Numerical slop inside the rasterizer (degenerate triangles, non-finite
//! interpolation results) is *not* an error: such fragments simply fail the
//! inside test or the depth test and are discarded.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, RasterError>`.
//!
//! ```rust,ignore
//! use prism::errors::Result;
//!
//! fn resize(target: &mut RenderTarget) -> Result<()> {
//!     target.change_size(UVec2::new(640, 480), true)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the rasterizer.
#[derive(Error, Debug)]
pub enum RasterError {
    // ========================================================================
    // Render Target Errors
    // ========================================================================
    /// A render target was asked to take a size with a zero dimension.
    #[error("Invalid render target size: {width}x{height}")]
    InvalidTargetSize {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// Reserving memory for the frame buffers failed.
    #[error("Failed to allocate {bytes} bytes for {what}")]
    AllocationFailed {
        /// Which buffer could not be allocated
        what: &'static str,
        /// Number of bytes that were requested
        bytes: usize,
    },

    // ========================================================================
    // Scene Data Errors
    // ========================================================================
    /// A mesh face references a vertex index outside the vertex list.
    #[error("Face {face} references vertex {index}, but the mesh only has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        /// Index of the offending face
        face: usize,
        /// The invalid vertex index
        index: u32,
        /// Number of vertices in the mesh
        vertex_count: usize,
    },

    /// The node handed to the renderer does not exist or carries no camera.
    #[error("Node is not a camera: {0}")]
    CameraNotFound(String),

    // ========================================================================
    // Threading Errors
    // ========================================================================
    /// A shading worker thread could not be spawned.
    #[error("Failed to spawn shading worker {index}: {source}")]
    WorkerSpawnFailed {
        /// Worker index within the pool
        index: usize,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A shading worker panicked while processing its stripe.
    #[error("Shading worker {0} panicked during a deferred batch")]
    WorkerPanicked(usize),

    /// The shading pool has already been shut down.
    #[error("Shading pool has been shut down")]
    SchedulerShutDown,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, RasterError>`.
pub type Result<T> = std::result::Result<T, RasterError>;
