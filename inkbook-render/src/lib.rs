//! # Inkbook Renderer
//!
//! Rasterizes drawings and caches their thumbnails.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   render(bounds, scale)   ┌──────────────┐
//! │ DrawingBlob  │ ────────────────────────▶ │ RasterImage  │
//! └──────────────┘     DrawingRenderer       └──────┬───────┘
//!                                                   │ apply(generation)
//!                                            ┌──────▼───────┐
//!                                            │ThumbnailCache│
//!                                            └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod error;
pub mod raster;
pub mod renderer;
pub mod thumbnail;

pub use cache::{CacheStats, Generation, RenderTicket, ThumbnailCache};
pub use error::{RenderError, RenderResult};
pub use raster::RasterImage;
pub use renderer::{adapt_color, DrawingRenderer, InkRenderer};
pub use thumbnail::ThumbnailGeometry;
