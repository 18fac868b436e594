//! # slide-curate CLI
//!
//! Command-line front end for the slide curator.
//!
//! ## Usage
//! ```bash
//! slide-curate scan ~/captures/lecture-3
//! slide-curate curate ~/captures/lecture-3 --watermark logo.png --dedup-threshold 10
//! ```

mod cli;

use slide_curator::Result;

fn main() -> Result<()> {
    slide_curator::init_tracing();
    cli::run()
}
