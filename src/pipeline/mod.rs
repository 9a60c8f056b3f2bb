//! Pipeline stages for submission PDF generation.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ collect ──▶ postprocess ──▶ paginate ──▶ render
//! (cover)   (sources)    (cleanup)       (blocks)     (lopdf)
//!                │                           ▲
//!                └──────▶ execute ───────────┘
//!                        (toolchain)
//! ```
//!
//! 1. [`input`]: validate the folder and sniff `<folderName>.pdf`
//! 2. [`collect`]: list recognised source files, sorted by name
//! 3. [`execute`]: run each file through its toolchain via an
//!    [`Executor`](crate::executor::Executor)
//! 4. [`postprocess`]: normalise source and output text for monospaced layout
//! 5. [`paginate`]: wrap and split text into page-sized blocks
//! 6. [`render`]: append header + body pages to the cover document

pub mod collect;
pub mod execute;
pub mod input;
pub mod paginate;
pub mod postprocess;
pub mod render;
