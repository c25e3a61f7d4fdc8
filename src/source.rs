//! Frame acquisition: the live-source seam plus static and test-set sources.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("frame unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load image {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Produces the frame a cycle or a single operator runs on.
pub trait ImageSource {
    fn grab(&mut self) -> Result<RgbImage, AcquisitionError>;
}

impl<S: ImageSource + ?Sized> ImageSource for Box<S> {
    fn grab(&mut self) -> Result<RgbImage, AcquisitionError> {
        (**self).grab()
    }
}

pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, AcquisitionError> {
    let path = path.as_ref();
    image::open(path)
        .map(|image| image.to_rgb8())
        .map_err(|source| AcquisitionError::Load {
            path: path.to_path_buf(),
            source,
        })
}

/// Always yields the same image.
#[derive(Debug, Clone)]
pub struct StaticImageSource {
    image: RgbImage,
}

impl StaticImageSource {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, AcquisitionError> {
        load_rgb(path).map(Self::new)
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

impl ImageSource for StaticImageSource {
    fn grab(&mut self) -> Result<RgbImage, AcquisitionError> {
        Ok(self.image.clone())
    }
}

/// An operator-stepped list of images; `grab` returns the current one.
#[derive(Debug, Clone, Default)]
pub struct TestImageSet {
    images: Vec<RgbImage>,
    current: usize,
}

impl TestImageSet {
    pub fn new(images: Vec<RgbImage>) -> Self {
        Self { images, current: 0 }
    }

    /// Loads every readable image, skipping (and reporting) the rest.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let images: Vec<RgbImage> = paths
            .iter()
            .filter_map(|path| match load_rgb(path) {
                Ok(image) => Some(image),
                Err(err) => {
                    warn!(%err, "skipping test image");
                    None
                }
            })
            .collect();
        info!(count = images.len(), "test images loaded");
        Self::new(images)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&RgbImage> {
        self.images.get(self.current)
    }

    /// Advances to the next image, wrapping around.
    pub fn advance(&mut self) -> Option<&RgbImage> {
        if self.images.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.images.len();
        self.images.get(self.current)
    }

    pub fn images(&self) -> &[RgbImage] {
        &self.images
    }
}

impl ImageSource for TestImageSet {
    fn grab(&mut self) -> Result<RgbImage, AcquisitionError> {
        self.current()
            .cloned()
            .ok_or_else(|| AcquisitionError::Unavailable("no test images loaded".to_owned()))
    }
}
