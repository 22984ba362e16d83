use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{SharedMemory, ADDRESS_SPACE_BYTES};

/// Fatal errors raised while placing a program image in memory.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image does not fit in the address space.
    #[error("program image larger than {capacity} bytes; too big to fit in memory")]
    ImageTooLarge {
        /// Memory capacity in bytes.
        capacity: usize,
    },
    /// The image file could not be opened.
    #[error("could not open image file {}", path.display())]
    Open {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Reading the image stream failed.
    #[error("could not read program image")]
    Read(#[from] io::Error),
}

impl SharedMemory {
    /// Copies `image` verbatim to the low end of memory.
    ///
    /// Returns the number of bytes loaded.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::ImageTooLarge`] when the image exceeds the address
    /// space; memory is left untouched in that case.
    pub fn load_image(&self, image: &[u8]) -> Result<usize, LoadError> {
        if image.len() > ADDRESS_SPACE_BYTES {
            return Err(LoadError::ImageTooLarge {
                capacity: ADDRESS_SPACE_BYTES,
            });
        }

        for (addr, byte) in (0_u32..).zip(image.iter().copied()) {
            self.write_u8(addr, byte);
        }

        Ok(image.len())
    }

    /// Loads an image from any byte stream, stopping at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Read`] on stream failure and
    /// [`LoadError::ImageTooLarge`] if the stream yields more bytes than fit.
    pub fn load_image_from_reader(&self, reader: impl Read) -> Result<usize, LoadError> {
        let limit = u64::try_from(ADDRESS_SPACE_BYTES).unwrap_or(u64::MAX);
        let mut image = Vec::with_capacity(ADDRESS_SPACE_BYTES);
        reader.take(limit + 1).read_to_end(&mut image)?;
        self.load_image(&image)
    }

    /// Loads an image file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Open`] when the file is missing or unreadable, and
    /// the errors of [`SharedMemory::load_image_from_reader`] otherwise.
    pub fn load_image_file(&self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = self.load_image_from_reader(file)?;
        tracing::debug!(path = %path.display(), bytes = loaded, "program image loaded");
        Ok(loaded)
    }
}
